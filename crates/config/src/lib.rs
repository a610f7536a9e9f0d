//! Configuration loading, validation, and env substitution.
//!
//! Config files: `chatspout.toml` or `chatspout.json`, searched in `./`
//! then `~/.config/chatspout/`. Supports `${ENV_VAR}` substitution in all
//! string values and `CHATSPOUT_BIND`/`CHATSPOUT_PORT` overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{ChatspoutConfig, ExtractConfig, RelayConfig, ServerConfig, StaleBudget, StaleConfig},
};
