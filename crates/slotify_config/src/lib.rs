// --- File: crates/slotify_config/src/lib.rs ---
use config::{Config, ConfigError, Environment, File};
use std::sync::Once;

pub mod models;
pub use models::*;

static DOTENV: Once = Once::new();

/// Loads `.env` once per process so repeated config loads (tests) stay cheap.
pub fn ensure_dotenv_loaded() {
    DOTENV.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Loads the application configuration.
///
/// Sources, later ones overriding earlier ones:
/// 1. `config/default.yml`
/// 2. `config/{RUN_ENV}.yml` (RUN_ENV defaults to `development`)
/// 3. environment variables prefixed `APP`, `__` as section separator
///    (e.g. `APP_SERVER__PORT=8080`, `APP_DATABASE__URL=...`)
///
/// Dependent crates call this so they do not need to know where the
/// configuration comes from.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();
    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()
}
