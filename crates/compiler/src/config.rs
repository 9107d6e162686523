//! Compiler configuration
//!
//! Settings that shape the emitted module but not the dispatch semantics.
//! A configuration can be built in code or read from a TOML file:
//!
//! ```toml
//! module_id = "interpreter"
//! target_triple = "x86_64-unknown-linux-gnu"
//! ```
//!
//! ```rust,ignore
//! use korec::CompilerConfig;
//!
//! let config = CompilerConfig::new()
//!     .with_module_id("interpreter")
//!     .with_target_triple("aarch64-unknown-linux-gnu");
//! ```

use serde::Deserialize;
use std::path::Path;

/// Module id written when none is configured
pub const DEFAULT_MODULE_ID: &str = "runtime_support";

/// Configuration for the dispatch generator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Value of the `; ModuleID` header
    pub module_id: String,

    /// Target triple override; the host triple is used when unset
    pub target_triple: Option<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            module_id: DEFAULT_MODULE_ID.to_string(),
            target_triple: None,
        }
    }
}

impl CompilerConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| format!("Failed to parse compiler config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = module_id.into();
        self
    }

    pub fn with_target_triple(mut self, triple: impl Into<String>) -> Self {
        self.target_triple = Some(triple.into());
        self
    }

    /// Both values end up inside quotes in the IR header.
    pub fn validate(&self) -> Result<(), String> {
        if self.module_id.contains(['\'', '\n']) {
            return Err(format!("Invalid module id '{}'", self.module_id));
        }
        if let Some(triple) = &self.target_triple {
            if triple.is_empty()
                || !triple
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return Err(format!("Invalid target triple '{}'", triple));
            }
        }
        Ok(())
    }
}

/// Target triple of the machine running the generator
pub fn host_target_triple() -> String {
    let arch = match std::env::consts::ARCH {
        "aarch64" if cfg!(target_os = "macos") => "arm64",
        other => other,
    };
    let rest = match std::env::consts::OS {
        "macos" => "apple-darwin",
        "linux" => "unknown-linux-gnu",
        "windows" => "pc-windows-msvc",
        "freebsd" => "unknown-freebsd",
        _ => "unknown-unknown",
    };
    format!("{}-{}", arch, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.module_id, DEFAULT_MODULE_ID);
        assert!(config.target_triple.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = CompilerConfig::new()
            .with_module_id("interp")
            .with_target_triple("x86_64-unknown-linux-gnu");
        assert_eq!(config.module_id, "interp");
        assert_eq!(
            config.target_triple.as_deref(),
            Some("x86_64-unknown-linux-gnu")
        );
    }

    #[test]
    fn test_from_toml_partial() {
        let config = CompilerConfig::from_toml("module_id = \"interp\"").unwrap();
        assert_eq!(config.module_id, "interp");
        assert!(config.target_triple.is_none());
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = CompilerConfig::from_toml("optimize = true").unwrap_err();
        assert!(err.starts_with("Failed to parse compiler config"));
    }

    #[test]
    fn test_from_toml_rejects_bad_triple() {
        let err = CompilerConfig::from_toml("target_triple = \"x86\\\"64\"").unwrap_err();
        assert!(err.contains("Invalid target triple"), "{}", err);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("korec.toml");
        std::fs::write(&path, "target_triple = \"aarch64-unknown-linux-gnu\"\n").unwrap();
        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(
            config.target_triple.as_deref(),
            Some("aarch64-unknown-linux-gnu")
        );
    }

    #[test]
    fn test_host_target_triple_shape() {
        let triple = host_target_triple();
        assert!(triple.split('-').count() >= 3, "{}", triple);
    }
}
