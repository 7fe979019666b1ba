//! Process-wide configuration of the interop layer.
//!
//! Every field has a default; TOML files only need the values they override.
//!
//! ```toml
//! library_search_paths = ["/opt/magick/lib"]
//! cache_directory = "/var/tmp/magick"
//! warning_policy = "collect"
//! max_exception_depth = 16
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding extra native library directories, in the
/// platform's path-list syntax.
pub const LIBRARY_PATH_ENV: &str = "MAGICK_INTEROP_LIBRARY_PATH";

const DEFAULT_MAX_EXCEPTION_DEPTH: usize = 32;

/// What happens to native warnings that do not end in an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Deliver to the registered warning handler; collect when none is set
    #[default]
    Notify,
    /// Keep on the object until taken or attached to the next error
    Collect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteropConfig {
    /// Exact native library file; skips the search when set.
    pub library_path: Option<PathBuf>,
    /// Directories searched for the native library, in order.
    pub library_search_paths: Vec<PathBuf>,
    /// Temporary cache directory handed to the native library.
    pub cache_directory: Option<PathBuf>,
    pub warning_policy: WarningPolicy,
    /// Deepest related-exception nesting translated before truncation.
    #[serde(default = "default_max_exception_depth")]
    pub max_exception_depth: usize,
}

fn default_max_exception_depth() -> usize {
    DEFAULT_MAX_EXCEPTION_DEPTH
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            library_search_paths: Vec::new(),
            cache_directory: None,
            warning_policy: WarningPolicy::default(),
            max_exception_depth: default_max_exception_depth(),
        }
    }
}

impl InteropConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_exception_depth == 0 {
            return Err(Error::Config(
                "max_exception_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Directories to search for the native library: configured paths first,
    /// then the entries of [`LIBRARY_PATH_ENV`].
    pub fn search_directories(&self) -> Vec<PathBuf> {
        let mut directories = self.library_search_paths.clone();
        if let Some(value) = std::env::var_os(LIBRARY_PATH_ENV) {
            directories.extend(std::env::split_paths(&value));
        }
        directories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(InteropConfig::from_toml_str("").unwrap(), InteropConfig::default());
        assert_eq!(InteropConfig::default().max_exception_depth, 32);
    }

    #[test]
    fn test_partial_toml() {
        let config = InteropConfig::from_toml_str(
            r#"
            warning_policy = "collect"
            library_search_paths = ["/opt/magick/lib"]
            "#,
        )
        .unwrap();
        assert_eq!(config.warning_policy, WarningPolicy::Collect);
        assert_eq!(config.library_search_paths, vec![PathBuf::from("/opt/magick/lib")]);
        assert_eq!(config.max_exception_depth, 32);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = InteropConfig::from_toml_str("colour = true").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(InteropConfig::from_toml_str("max_exception_depth = 0").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interop.toml");
        fs::write(&path, "max_exception_depth = 4\n").unwrap();
        assert_eq!(InteropConfig::from_file(&path).unwrap().max_exception_depth, 4);
    }

    #[test]
    fn test_missing_file_is_io() {
        let err = InteropConfig::from_file("/definitely/missing.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
