//! `swathcat account add|list <provider>`: manages credential *references*.
//!
//! Secret storage is explicitly out of scope (see `pansat.download.accounts`,
//! which this stands in for); the only implementation here is backed by
//! environment variables the process never writes, only reads.

use clap::{Args, Subcommand};

const USER_VAR_SUFFIX: &str = "_USER";
const PASS_VAR_SUFFIX: &str = "_PASS";
const ENV_PREFIX: &str = "SWATHCAT_ACCOUNT_";

/// Resolves a username/password reference for a provider. Implementations
/// never persist secrets themselves; they only locate them.
pub trait CredentialStore {
    /// The username registered for `provider`, if any is currently visible.
    fn username(&self, provider: &str) -> Option<String>;

    /// The two environment variable names a caller should set to register
    /// `provider`'s credentials.
    fn variable_names(&self, provider: &str) -> (String, String);
}

/// The only `CredentialStore` this crate implements: reads
/// `SWATHCAT_ACCOUNT_<PROVIDER>_USER`/`_PASS` from the process environment.
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn username(&self, provider: &str) -> Option<String> {
        std::env::var(self.variable_names(provider).0).ok()
    }

    fn variable_names(&self, provider: &str) -> (String, String) {
        let key = provider.to_uppercase().replace(['-', '.'], "_");
        (format!("{ENV_PREFIX}{key}{USER_VAR_SUFFIX}"), format!("{ENV_PREFIX}{key}{PASS_VAR_SUFFIX}"))
    }
}

#[derive(Args, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Show how to register credentials for a provider
    Add { provider: String },
    /// List providers with a username currently visible in the environment
    List,
}

pub fn execute(args: AccountArgs) -> anyhow::Result<()> {
    let store = EnvCredentialStore;
    match args.command {
        AccountCommand::Add { provider } => {
            let (user_var, pass_var) = store.variable_names(&provider);
            println!(
                "swathcat never stores credentials itself. Export these before running:\n  export {user_var}=<username>\n  export {pass_var}=<password>"
            );
        }
        AccountCommand::List => {
            let mut any = false;
            for provider in swathcat_product::registry::names() {
                if let Some(user) = store.username(&provider) {
                    println!("{provider}: {user}");
                    any = true;
                }
            }
            if !any {
                println!("no provider credentials found in the environment");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_names_are_upper_cased_and_sanitized() {
        let store = EnvCredentialStore;
        let (user, pass) = store.variable_names("noaa-goes.s3");
        assert_eq!(user, "SWATHCAT_ACCOUNT_NOAA_GOES_S3_USER");
        assert_eq!(pass, "SWATHCAT_ACCOUNT_NOAA_GOES_S3_PASS");
    }
}
