pub mod config;
pub mod layout;
pub mod serve;

use crate::config_path::resolve_config;
use anyhow::Context;
use ferrogrid_core::config::Config;
use std::path::Path;

/// Load the resolved config file, or defaults when none is found.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = resolve_config(explicit);
    match &path {
        Some(p) => tracing::debug!(path = %p.display(), "loading config"),
        None => tracing::debug!("no config file found, using defaults"),
    }
    Config::load_or_default(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("failed to load {}", p.display()),
        None => "failed to load default config".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grid.yaml");
        std::fs::write(&path, "server:\n  port: 9191\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.timing.off_delay_ms, 400);
    }

    #[test]
    fn missing_explicit_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("absent.yaml"));
    }
}
