use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

pub const CATALOGUE_KEY_ENV: &str = "CREDSWEEP_CATALOGUE_KEY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub engine: EngineSettings,
    pub http: HttpSettings,
    pub discovery: DiscoverySettings,
    pub wordlists: WordlistSettings,
    pub classifier: ClassifierSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Pause between web attempts; archive attempts never wait
    pub web_delay_ms: u64,
    pub progress_interval_ms: u64,
    pub progress_queue: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            web_delay_ms: 100,
            progress_interval_ms: 2500,
            progress_queue: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_s: u64,
    pub user_agent: String,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_s: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            max_redirects: 10,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Try headless Chromium before the plain fetch
    pub browser: bool,
    pub render_timeout_s: u64,
    pub settle_ms: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            browser: true,
            render_timeout_s: 30,
            settle_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WordlistSettings {
    pub local_dir: PathBuf,
    pub web_tier: String,
    pub archive_tier: String,
    pub remote: Option<RemoteSettings>,
}

impl Default for WordlistSettings {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("wordlists"),
            web_tier: "all".to_string(),
            archive_tier: "big".to_string(),
            remote: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteSettings {
    pub base_url: Url,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_remote_timeout")]
    pub timeout_s: u64,
}

fn default_remote_timeout() -> u64 {
    15
}

impl RemoteSettings {
    /// Key from the file, or from the environment when the file has none
    pub fn resolved_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(CATALOGUE_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Rule names in evaluation order
    pub rules: Vec<String>,
    pub bulk_min_bytes: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            rules: ["redirect", "positive_phrase", "bulk_response", "session_token"]
                .iter()
                .map(|r| r.to_string())
                .collect(),
            bulk_min_bytes: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts/runs"),
        }
    }
}
