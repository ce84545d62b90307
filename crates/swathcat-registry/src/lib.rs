//! The registry hierarchy: layered catalog/provider composition, data
//! directories, and on-the-fly temporary storage.

pub mod on_the_fly;
pub mod registry;

pub use on_the_fly::OnTheFlyDataDir;
pub use registry::Registry;
