//! Project configuration loaded from an optional `hotaru.toml`.

use serde::Deserialize;
use std::path::Path;

/// VM resource limits.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VmConfig {
    #[serde(default = "default_stack_capacity")]
    pub stack_capacity: usize,
    #[serde(default = "default_heap_capacity")]
    pub heap_capacity: usize,
}

fn default_stack_capacity() -> usize {
    hotaru_vm::DEFAULT_STACK_CAPACITY
}

fn default_heap_capacity() -> usize {
    hotaru_vm::DEFAULT_HEAP_CAPACITY
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig { stack_capacity: default_stack_capacity(), heap_capacity: default_heap_capacity() }
    }
}

/// Log verbosity, layered under `RUST_LOG` if that env var is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { level: LogLevel::default() }
    }
}

/// Top-level project configuration, as parsed from `hotaru.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotaruConfig {
    #[serde(default)]
    pub vm: VmConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl HotaruConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("failed to parse hotaru.toml: {e}"))
    }

    /// Load `hotaru.toml` from `dir` if it exists, falling back to defaults.
    pub fn load_or_default(dir: &Path) -> Result<Self, String> {
        let path = dir.join("hotaru.toml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("failed to read {}: {e}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_fields_given() {
        let cfg = HotaruConfig::from_toml("").unwrap();
        assert_eq!(cfg.vm.stack_capacity, hotaru_vm::DEFAULT_STACK_CAPACITY);
        assert_eq!(cfg.log.level, LogLevel::Info);
    }

    #[test]
    fn overrides_individual_fields() {
        let cfg = HotaruConfig::from_toml(
            "[vm]\nstack_capacity = 64\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(cfg.vm.stack_capacity, 64);
        assert_eq!(cfg.vm.heap_capacity, hotaru_vm::DEFAULT_HEAP_CAPACITY);
        assert_eq!(cfg.log.level, LogLevel::Debug);
    }

    #[test]
    fn load_or_default_falls_back_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = HotaruConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.vm.stack_capacity, hotaru_vm::DEFAULT_STACK_CAPACITY);
    }

    #[test]
    fn load_or_default_reads_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hotaru.toml"), "[vm]\nstack_capacity = 128\n").unwrap();
        let cfg = HotaruConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.vm.stack_capacity, 128);
    }
}
