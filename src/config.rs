use anyhow::{Context, Result};
use code_assistant_core::ExportFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the AI backend, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_format: default_format(),
            default_filename: default_filename(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_format() -> String {
    "markdown".to_string()
}
fn default_filename() -> String {
    "code".to_string()
}

impl ExportConfig {
    pub fn format(&self) -> Result<ExportFormat> {
        self.default_format
            .parse::<ExportFormat>()
            .map_err(|e| anyhow::anyhow!("export.default_format: {}", e))
    }
}

impl Config {
    /// Defaults for commands that never reach the backend.
    pub fn minimal() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                timeout_secs: default_timeout_secs(),
            },
            server: ServerConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate backend
    let base_url = config.backend.base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        anyhow::bail!(
            "backend.base_url must start with http:// or https://, got '{}'",
            config.backend.base_url
        );
    }
    config.backend.base_url = base_url;

    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }

    // Validate export
    config.export.format()?;
    if config.export.default_filename.trim().is_empty() {
        anyhow::bail!("export.default_filename must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let cfg = parse_config("[backend]\nbase_url = \"http://localhost:8000/\"\n").unwrap();
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.backend.timeout_secs, 60);
        assert_eq!(cfg.server.bind, "127.0.0.1:7340");
        assert_eq!(cfg.export.format().unwrap(), ExportFormat::Markdown);
        assert_eq!(cfg.export.default_filename, "code");
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = parse_config("[backend]\nbase_url = \"localhost:8000\"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = parse_config("[backend]\nbase_url = \"http://x\"\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_unknown_export_format() {
        let toml = "[backend]\nbase_url = \"http://x\"\n[export]\ndefault_format = \"html\"\n";
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("default_format"));
    }

    #[test]
    fn missing_backend_section_fails() {
        assert!(parse_config("[server]\nbind = \"0.0.0.0:1\"\n").is_err());
    }
}
