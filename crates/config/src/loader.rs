use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ChatspoutConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["chatspout.toml", "chatspout.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ChatspoutConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ChatspoutConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("toml")
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" => serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("invalid JSON in {}: {e}", path.display())),
        _ => toml::from_str(raw)
            .map_err(|e| anyhow::anyhow!("invalid TOML in {}: {e}", path.display())),
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatspout.{toml,json}` (project-local)
/// 2. `~/.config/chatspout/chatspout.{toml,json}` (user-global)
///
/// Returns `ChatspoutConfig::default()` if no config file is found, then
/// applies `CHATSPOUT_BIND` / `CHATSPOUT_PORT` env overrides either way.
pub fn discover_and_load() -> ChatspoutConfig {
    let mut cfg = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ChatspoutConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        ChatspoutConfig::default()
    };
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `CHATSPOUT_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(cfg: &mut ChatspoutConfig) {
    if let Ok(bind) = std::env::var("CHATSPOUT_BIND")
        && !bind.is_empty()
    {
        cfg.server.bind = bind;
    }
    if let Ok(port) = std::env::var("CHATSPOUT_PORT")
        && let Ok(port) = port.parse()
    {
        cfg.server.port = port;
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/chatspout/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "chatspout") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/chatspout/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatspout").map(|d| d.config_dir().to_path_buf())
}
