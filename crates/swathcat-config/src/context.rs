//! Process-wide state: the active registry chain, the shared HTTP client,
//! and an optional on-the-fly scratch data dir.

use std::env;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_provider::LookupProvider;
use swathcat_registry::{OnTheFlyDataDir, Registry};

use crate::config::Config;

const ENV_ON_THE_FLY: &str = "SWATHCAT_ON_THE_FLY";
const ENV_DISABLE_CACHE: &str = "SWATHCAT_DISABLE_CACHE";
const ENV_PASSWORD: &str = "SWATHCAT_PASSWORD";

/// Whichever data dir the process is currently targeting: a permanent
/// registry from the configuration file, or a temporary one the process
/// owns end-to-end.
enum ActiveDataDir {
    Configured,
    OnTheFly(OnTheFlyDataDir),
}

/// Ties together the parsed configuration, the built registry chain, and
/// the ambient network/session state a `Product`/`Provider` pair needs.
///
/// Registries are built bottom-up from [`Config::registries`] (file order),
/// so the rightmost declaration becomes the innermost, most-local layer.
/// `SWATHCAT_ON_THE_FLY` overrides that: an extra opaque, temporary registry
/// is layered on top and cleaned up when the `Context` is dropped.
pub struct Context {
    active: Arc<Registry>,
    active_data_dir: ActiveDataDir,
    http_client: reqwest::blocking::Client,
    disable_cache: bool,
    password: Option<String>,
}

impl Context {
    /// Builds a `Context` from a parsed configuration, constructing the
    /// registry chain and applying the `SWATHCAT_*` environment overrides.
    pub fn build(config: &Config) -> CatalogResult<Context> {
        let mut parent: Option<Arc<Registry>> = None;
        for (name, reg) in &config.registries {
            parent = Some(build_registry(name, reg, parent)?);
        }

        let disable_cache = env_flag(ENV_DISABLE_CACHE);
        let password = env::var(ENV_PASSWORD).ok();

        let http_client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?;

        let (active, active_data_dir) = if env_flag(ENV_ON_THE_FLY) {
            info!("{ENV_ON_THE_FLY} set, layering a temporary scratch registry");
            let on_the_fly = OnTheFlyDataDir::new("on-the-fly", parent)?;
            let registry = on_the_fly.registry().clone();
            (registry, ActiveDataDir::OnTheFly(on_the_fly))
        } else {
            let active = parent.ok_or_else(|| {
                CatalogError::ConfigError("configuration declares no registries".to_string())
            })?;
            (active, ActiveDataDir::Configured)
        };

        Ok(Context { active, active_data_dir, http_client, disable_cache, password })
    }

    /// Loads the configuration file starting from the current working
    /// directory, then builds a `Context` from it.
    pub fn load() -> CatalogResult<Context> {
        Context::build(&Config::load_default()?)
    }

    /// A `Context` over an isolated temporary data dir, for tests: never
    /// reads or writes the real configuration file or environment.
    pub fn for_test() -> CatalogResult<Context> {
        let on_the_fly = OnTheFlyDataDir::new("test", None)?;
        let registry = on_the_fly.registry().clone();
        let http_client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?;
        Ok(Context {
            active: registry,
            active_data_dir: ActiveDataDir::OnTheFly(on_the_fly),
            http_client,
            disable_cache: true,
            password: None,
        })
    }

    /// The active registry: the innermost layer of the chain built from
    /// the configuration file, or the on-the-fly scratch registry if
    /// `SWATHCAT_ON_THE_FLY` was set.
    pub fn active_registry(&self) -> &Arc<Registry> {
        &self.active
    }

    pub fn active_data_dir_path(&self) -> Option<std::path::PathBuf> {
        self.active.get_active_data_dir()
    }

    /// The shared blocking HTTP client providers should use for network
    /// requests. `SWATHCAT_DISABLE_CACHE` does not change the client itself;
    /// it is consulted by providers that layer a response cache on top.
    pub fn http_client(&self) -> &reqwest::blocking::Client {
        &self.http_client
    }

    pub fn cache_disabled(&self) -> bool {
        self.disable_cache
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn is_on_the_fly(&self) -> bool {
        matches!(self.active_data_dir, ActiveDataDir::OnTheFly(_))
    }

    /// Removes the on-the-fly scratch directory, if this `Context` owns
    /// one. A no-op for a `Context` built from a permanent configuration.
    /// Idempotent, and also run on `Drop`.
    pub fn cleanup(&mut self) -> CatalogResult<()> {
        if let ActiveDataDir::OnTheFly(on_the_fly) = &mut self.active_data_dir {
            on_the_fly.cleanup()?;
        }
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| !v.is_empty() && v != "0")
}

fn build_registry(
    name: &str,
    reg: &crate::config::RegistryConfig,
    parent: Option<Arc<Registry>>,
) -> CatalogResult<Arc<Registry>> {
    if reg.is_data_dir {
        ensure_dir(&reg.path)?;
        Registry::data_dir(name, &reg.path, reg.transparent, parent)
    } else {
        Registry::new(name, &reg.path, reg.transparent, parent)
    }
}

fn ensure_dir(path: &Path) -> CatalogResult<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Convenience accessor matching the shape of a `LookupProvider`, so a
/// `Context`'s active registry can stand in for a provider when resolving
/// locally-available files.
pub fn as_lookup_provider(context: &Context) -> &dyn LookupProvider {
    context.active_registry().as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_test_context_has_an_on_the_fly_data_dir() {
        let context = Context::for_test().unwrap();
        assert!(context.is_on_the_fly());
        assert!(context.active_data_dir_path().unwrap().exists());
    }

    #[test]
    fn cleanup_removes_the_scratch_directory() {
        let mut context = Context::for_test().unwrap();
        let path = context.active_data_dir_path().unwrap();
        context.cleanup().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn build_without_registries_or_override_errors() {
        let config = Config::default();
        let err = Context::build(&config);
        assert!(err.is_err());
    }

    #[test]
    fn env_on_the_fly_overrides_a_configured_registry() {
        std::env::set_var(ENV_ON_THE_FLY, "1");
        let storage = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.registries.push((
            "local".to_string(),
            crate::config::RegistryConfig {
                path: storage.path().to_path_buf(),
                is_data_dir: true,
                transparent: false,
            },
        ));
        let context = Context::build(&config).unwrap();
        assert!(context.is_on_the_fly());
        std::env::remove_var(ENV_ON_THE_FLY);
    }
}
