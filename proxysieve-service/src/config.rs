//! Service configuration
//!
//! Loaded from a JSON or YAML file (picked by extension), then overridden
//! by `PS_*` environment variables, then by command-line flags.

use anyhow::{bail, Context, Result};
use ps_core::config::{get_config_f64, get_config_opt, get_config_secs, get_config_usize};
use ps_core::{ScorePolicy, Thresholds};
use ps_engine::prober::DEFAULT_PROBE_TIMEOUT;
use ps_engine::updater::DEFAULT_PROBE_CONCURRENCY;
use ps_engine::{SchedulerConfig, UpdaterSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_PATHS: &[&str] = &[
    "/etc/proxysieve/config.yaml",
    "/etc/proxysieve/config.json",
    "proxysieve.yaml",
];

const DEFAULT_DESCRIPTOR_URLS: &[&str] = &[
    "https://raw.githubusercontent.com/whoahaow/rjsxrd/refs/heads/main/githubmirror/bypass/bypass-all.txt",
    "https://raw.githubusercontent.com/igareck/vpn-configs-for-russia/refs/heads/main/WHITE-CIDR-RU-all.txt",
    "https://raw.githubusercontent.com/FLEXIY0/matryoshka-vpn/refs/heads/main/configs/russia_whitelist.txt",
    "https://raw.githubusercontent.com/Epodonios/v2ray-configs/refs/heads/main/All_Configs_Sub.txt",
    "https://raw.githubusercontent.com/ShatakVPN/ConfigForge-V2Ray/refs/heads/main/configs/ru/vless.txt",
    "https://raw.githubusercontent.com/Argh94/V2RayAutoConfig/refs/heads/main/configs/Vless.txt",
];
const DEFAULT_PREFIXES_URL: &str =
    "https://raw.githubusercontent.com/whoahaow/rjsxrd/refs/heads/main/source/config/cidrwhitelist.txt";
const DEFAULT_NAMES_URL: &str =
    "https://raw.githubusercontent.com/whoahaow/rjsxrd/refs/heads/main/source/config/whitelist-all.txt";

/// Where descriptors and allow-lists come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: SourceMode,

    /// Remote mode
    pub descriptor_urls: Vec<String>,
    pub prefixes_url: String,
    pub names_url: String,
    pub fetch_timeout_secs: u64,

    /// Local mode
    pub descriptor_files: Vec<PathBuf>,
    pub prefixes_file: PathBuf,
    pub names_file: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        // Local checkout of the upstream list repository
        let checkout = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join("rjsxrd");

        Self {
            mode: SourceMode::Remote,
            descriptor_urls: DEFAULT_DESCRIPTOR_URLS.iter().map(|s| s.to_string()).collect(),
            prefixes_url: DEFAULT_PREFIXES_URL.to_string(),
            names_url: DEFAULT_NAMES_URL.to_string(),
            fetch_timeout_secs: ps_source::remote::DEFAULT_TIMEOUT.as_secs(),
            descriptor_files: vec![checkout.join("githubmirror/bypass/bypass-all.txt")],
            prefixes_file: checkout.join("source/config/cidrwhitelist.txt"),
            names_file: checkout.join("source/config/whitelist-all.txt"),
        }
    }
}

impl SourceConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind: String,
    pub cors: bool,
    pub compression: bool,
    pub request_timeout_secs: u64,

    pub accept_score: f64,
    pub stable_score: f64,
    pub score_policy: ScorePolicy,

    pub refresh_interval_secs: u64,
    pub retest_interval_secs: u64,
    pub probe_concurrency: usize,
    pub probe_timeout_secs: u64,
    pub shutdown_grace_secs: u64,

    pub source: SourceConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        let scheduler = SchedulerConfig::default();
        Self {
            bind: ps_http::server::DEFAULT_BIND.to_string(),
            cors: true,
            compression: true,
            request_timeout_secs: 30,
            accept_score: thresholds.accept,
            stable_score: thresholds.stable,
            score_policy: ScorePolicy::default(),
            refresh_interval_secs: scheduler.refresh_interval.as_secs(),
            retest_interval_secs: scheduler.retest_interval.as_secs(),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
            shutdown_grace_secs: 5,
            source: SourceConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from a JSON or YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).with_context(|| "Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).with_context(|| "Failed to parse JSON config")?
        };

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the first default path that exists, or use defaults
    pub fn load_default() -> Result<Self> {
        for path in CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::load(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply `PS_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        self.accept_score = get_config_f64("PS_ACCEPT_SCORE", self.accept_score);
        self.stable_score = get_config_f64("PS_STABLE_SCORE", self.stable_score);
        self.refresh_interval_secs =
            get_config_secs("PS_REFRESH_INTERVAL_SECS", self.refresh_interval()).as_secs();
        self.retest_interval_secs =
            get_config_secs("PS_RETEST_INTERVAL_SECS", self.retest_interval()).as_secs();
        self.probe_concurrency = get_config_usize("PS_PROBE_CONCURRENCY", self.probe_concurrency);
        if let Some(bind) = get_config_opt("PS_BIND") {
            self.bind = bind;
        }
        self
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        if self.retest_interval_secs == 0 {
            bail!("retest_interval_secs must be greater than zero");
        }
        if self.probe_timeout_secs == 0 {
            bail!("probe_timeout_secs must be greater than zero");
        }
        if self.source.fetch_timeout_secs == 0 {
            bail!("source.fetch_timeout_secs must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if !self.accept_score.is_finite() || !self.stable_score.is_finite() {
            bail!("score thresholds must be finite numbers");
        }
        if self.stable_score < self.accept_score {
            warn!(
                "stable_score {} is below accept_score {}; every published descriptor is stable",
                self.stable_score, self.accept_score
            );
        }
        match self.source.mode {
            SourceMode::Remote if self.source.descriptor_urls.is_empty() => {
                bail!("remote source mode needs at least one descriptor URL")
            }
            SourceMode::Local if self.source.descriptor_files.is_empty() => {
                bail!("local source mode needs at least one descriptor file")
            }
            _ => Ok(()),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.accept_score, self.stable_score)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn retest_interval(&self) -> Duration {
        Duration::from_secs(self.retest_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn updater_settings(&self) -> UpdaterSettings {
        UpdaterSettings {
            thresholds: self.thresholds(),
            probe_concurrency: self.probe_concurrency,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_interval: self.refresh_interval(),
            retest_interval: self.retest_interval(),
        }
    }
}
