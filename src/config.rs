use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Content API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Country code attached to random-content requests
    #[serde(default = "default_country")]
    pub country: String,

    /// Directory for locally persisted state (access key, cached collections)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api/v1".to_string()
}

fn default_country() -> String {
    "GB".to_string()
}

fn default_data_dir() -> String {
    ".reel-sync".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
