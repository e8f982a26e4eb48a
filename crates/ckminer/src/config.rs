//! Mining configuration: the §6 configuration surface plus the ambient
//! knobs (binary names, timeouts) the CLI exposes, loadable from TOML or
//! built up in code.

use std::time::Duration;

use serde::Deserialize;

use crate::ast::{IncludeDirKind, IncludePath, Language, OptimizationLevel, ParseOptions};

/// Error parsing a `MiningConfig` from TOML.
#[derive(Debug)]
pub struct ConfigError(String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid mining config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Tunables for one mining run, shared by every function in every
/// translation unit processed during that run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub language: Option<Language>,
    pub optimization_level: OptimizationLevel,
    pub include_paths: Vec<IncludePath>,
    pub flags: Vec<String>,
    /// Minimum `for`-nest depth to keep (spec.md §4.B step 1; default 1
    /// means "at least one `for`").
    pub depth_min: u32,
    /// Binary invoked as the pretty-printer (soft dependency).
    pub indenter_binary: String,
    /// Binary invoked as `<cc> -x c -c -` to verify a kernel compiles.
    pub compiler_binary: String,
    /// Wall-clock budget for each subprocess invocation, in seconds (kept as
    /// a plain integer rather than `Duration` so the field round-trips
    /// through TOML without a custom (de)serializer).
    pub subprocess_timeout_secs: u64,
    /// Recorded verbatim into every kernel's `meta.dataset_name`.
    pub dataset_name: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            language: Some(Language::C),
            optimization_level: OptimizationLevel::default(),
            include_paths: Vec::new(),
            flags: Vec::new(),
            depth_min: 1,
            indenter_binary: "indent".to_string(),
            compiler_binary: "cc".to_string(),
            subprocess_timeout_secs: 10,
            dataset_name: String::new(),
        }
    }
}

impl MiningConfig {
    pub fn builder() -> MiningConfigBuilder {
        MiningConfigBuilder::default()
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError(e.to_string()))
    }

    pub fn subprocess_timeout(&self) -> Duration {
        Duration::from_secs(self.subprocess_timeout_secs)
    }

    /// Project the parse-relevant subset of this config into `ParseOptions`,
    /// the input the `TranslationUnitProvider` boundary consumes.
    pub fn to_parse_options(&self, filename: Option<String>) -> ParseOptions {
        ParseOptions {
            language: self.language,
            optimization_level: self.optimization_level,
            include_paths: self.include_paths.clone(),
            flags: self.flags.clone(),
            filename,
        }
    }
}

/// Builder mirroring the teacher's extensible compiler-config shape: each
/// setter takes `self` by value so calls can be chained.
#[derive(Debug, Clone, Default)]
pub struct MiningConfigBuilder {
    config: MiningConfig,
}

impl MiningConfigBuilder {
    pub fn language(mut self, language: Language) -> Self {
        self.config.language = Some(language);
        self
    }

    pub fn optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.config.optimization_level = level;
        self
    }

    pub fn include_path(mut self, path: impl Into<String>, kind: IncludeDirKind) -> Self {
        self.config.include_paths.push(IncludePath {
            path: path.into(),
            kind,
        });
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.config.flags.push(flag.into());
        self
    }

    pub fn depth_min(mut self, depth_min: u32) -> Self {
        self.config.depth_min = depth_min;
        self
    }

    pub fn indenter_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.indenter_binary = binary.into();
        self
    }

    pub fn compiler_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.compiler_binary = binary.into();
        self
    }

    pub fn subprocess_timeout(mut self, timeout: Duration) -> Self {
        self.config.subprocess_timeout_secs = timeout.as_secs();
        self
    }

    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.config.dataset_name = name.into();
        self
    }

    pub fn build(self) -> MiningConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_mines_any_nest_depth_at_least_one() {
        let config = MiningConfig::default();
        assert_eq!(config.depth_min, 1);
        assert_eq!(config.compiler_binary, "cc");
    }

    #[test]
    fn builder_overrides_only_what_is_set() {
        let config = MiningConfig::builder().depth_min(2).dataset_name("corpus-a").build();
        assert_eq!(config.depth_min, 2);
        assert_eq!(config.dataset_name, "corpus-a");
        assert_eq!(config.compiler_binary, "cc");
    }

    #[test]
    fn loads_from_toml() {
        let toml_str = r#"
            depth_min = 2
            compiler_binary = "clang"
            dataset_name = "demo"
        "#;
        let config = MiningConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.depth_min, 2);
        assert_eq!(config.compiler_binary, "clang");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(MiningConfig::from_toml("not = [valid").is_err());
    }
}
