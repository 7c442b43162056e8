//! Optional config file loading. Search order: ./ytcomments.toml, then
//! $XDG_CONFIG_HOME/ytcomments/config.toml (or ~/.config/ytcomments/config.toml).
//!
//! The API key is never read from the config file; it comes from the environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory for the output files when -o is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// API root, e.g. for a local mock. Default is the public YouTube Data API v3.
    pub api_base_url: Option<String>,
    /// JSON output layout: concatenated (default) or array.
    pub json_layout: Option<String>,
}

/// Search order: (1) ./ytcomments.toml, (2) $XDG_CONFIG_HOME/ytcomments/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("ytcomments.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("ytcomments").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}

/// Read the API key from the environment. Unset or blank yields None.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Error worth reporting from loading `.env`. A missing file is not one.
pub fn dotenv_problem<T>(result: Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    result.err().filter(|e| !e.not_found())
}
