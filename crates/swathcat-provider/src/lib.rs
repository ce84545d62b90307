//! The provider contract and two concrete providers: a filesystem-backed
//! example provider and a minimal HTTP directory listing provider.

pub mod discrete;
pub mod example;
pub mod http_directory;
pub mod provider;

pub use discrete::{DiscreteProviderDay, DiscreteProviderMonth, DiscreteProviderYear};
pub use example::ExampleProvider;
pub use http_directory::HttpDirectoryProvider;
pub use provider::{LookupProvider, Provider};
