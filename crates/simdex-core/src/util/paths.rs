//! Path expansion helpers.
//!
//! Configured paths may contain `~` and `$VAR` / `${VAR}` references;
//! these helpers resolve them without touching the filesystem.

use std::path::{Path, PathBuf};

/// Expands `~` to the user's home directory.
///
/// If the path starts with `~`, replaces it with the user's home directory.
/// Otherwise returns the path unchanged.
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Expand environment variables and a leading `~` in a configured path.
///
/// Unknown variables are left as written rather than treated as errors.
///
/// # Example
///
/// ```
/// use simdex_core::util::paths::expand_path;
///
/// let p = expand_path("/var/lib/simdex");
/// assert_eq!(p, std::path::PathBuf::from("/var/lib/simdex"));
/// ```
pub fn expand_path(input: &str) -> PathBuf {
    let with_env = match shellexpand::env(input) {
        Ok(expanded) => expanded.into_owned(),
        Err(_) => input.to_string(),
    };
    expand_tilde(with_env)
}

/// Resolve `p` against `base` after expansion; absolute paths are kept.
pub fn resolve_with_base(base: &Path, p: &str) -> PathBuf {
    let expanded = expand_path(p);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
