use anyhow::{Context, Result, bail};
use opentag_spool_sync::{DEFAULT_BASE_URL, SyncConfig};
use opentag_tag_codec::{DEFAULT_MAX_NULL_TLVS, EnvelopeConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "configs/spool-agent.toml";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Spoolman API root.
    #[serde(default = "Config::default_server")]
    pub server: String,
    #[serde(default = "Config::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "Config::default_max_null_tlvs")]
    pub max_null_tlvs: u8,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "Config::default_log_level")]
    pub log_level: String,
}

impl Config {
    fn default_server() -> String {
        DEFAULT_BASE_URL.to_string()
    }
    fn default_timeout_secs() -> u64 {
        10
    }
    fn default_max_null_tlvs() -> u8 {
        DEFAULT_MAX_NULL_TLVS
    }
    fn default_log_level() -> String {
        "info".to_string()
    }

    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(CONFIG_FILE);
        if path.exists() {
            let txt = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&txt).with_context(|| format!("parsing {}", path.display()))
        } else {
            Self::parse("")
        }
    }

    fn parse(txt: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(txt)?;
        if cfg.server.trim().is_empty() {
            cfg.server = Self::default_server();
        }
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = Self::default_timeout_secs();
        }
        if cfg.log_level.trim().is_empty() {
            cfg.log_level = Self::default_log_level();
        }
        if !cfg.server.starts_with("http://") && !cfg.server.starts_with("https://") {
            bail!("server must be an http(s) URL, got {:?}", cfg.server);
        }
        Ok(cfg)
    }

    pub fn sync_config(&self) -> SyncConfig {
        let mut sync = SyncConfig::new(self.server.clone());
        sync.envelope = EnvelopeConfig {
            max_null_tlvs: self.max_null_tlvs,
            ..EnvelopeConfig::default()
        };
        sync
    }
}

/// Closest ancestor of the working directory holding the config file, or the
/// working directory itself.
pub fn find_repo_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let mut dir = cwd.clone();
    loop {
        if dir.join(CONFIG_FILE).exists() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Ok(cwd);
        }
    }
}
