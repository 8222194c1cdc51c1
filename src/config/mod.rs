use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string for the shared job store
    pub redis_url: String,

    /// SerpAPI key for the research stage's web search tool.
    /// Without it the research stage reports failure and the verdict
    /// degrades to UNVERIFIED rather than crashing the job.
    #[serde(default)]
    pub serpapi_api_key: Option<String>,

    /// Path to the worker binary. Defaults to a `worker` executable
    /// living next to the current executable.
    #[serde(default)]
    pub worker_bin: Option<String>,

    /// TTL applied to per-job keys in the store, in seconds.
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,

    /// Maximum number of evidence sources scraped per job.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_job_ttl_secs() -> u64 {
    86_400
}

fn default_max_sources() -> usize {
    2
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
