use ferrogrid_core::config::CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve which config file to load.
///
/// Priority:
/// 1. `--config` flag / `FERROGRID_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `ferrogrid.yaml`
/// 3. `None`: run on built-in defaults
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    find_upward(&cwd)
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Where `config init` writes when no path was given.
pub fn default_target(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}
