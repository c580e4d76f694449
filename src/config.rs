//! Configuration.
//!
//! Loaded from an optional YAML file with environment-variable overrides
//! (priority: env var > YAML > default). `.env` files are honored through
//! `dotenvy` at the call site that constructs the config.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub neo4j: Neo4jYamlConfig,
    pub cache: CacheYamlConfig,
    pub batch: BatchYamlConfig,
    pub temporal: TemporalYamlConfig,
    pub analytics: AnalyticsYamlConfig,
    pub community: CommunityYamlConfig,
    pub viz: VizYamlConfig,
    pub llm: LlmYamlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub query_timeout_secs: u64,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "neo4j".into(),
            query_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheYamlConfig {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheYamlConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchYamlConfig {
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BatchYamlConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            max_retries: 2,
            retry_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemporalYamlConfig {
    pub version_retention: usize,
}

impl Default for TemporalYamlConfig {
    fn default() -> Self {
        Self {
            version_retention: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsYamlConfig {
    pub score_cache_ttl_secs: u64,
    pub pagerank_damping: f64,
    pub pagerank_max_iterations: usize,
    pub pagerank_tolerance: f64,
}

impl Default for AnalyticsYamlConfig {
    fn default() -> Self {
        Self {
            score_cache_ttl_secs: 600,
            pagerank_damping: 0.85,
            pagerank_max_iterations: 20,
            pagerank_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommunityYamlConfig {
    pub resolution: f64,
    pub min_community_size: usize,
}

impl Default for CommunityYamlConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            min_community_size: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VizYamlConfig {
    pub max_nodes: usize,
    pub depth: u32,
}

impl Default for VizYamlConfig {
    fn default() -> Self {
        Self {
            max_nodes: 100,
            depth: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmYamlConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for LlmYamlConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/v1/chat/completions".into(),
            model: "llama3.1".into(),
            api_key: None,
        }
    }
}

// ============================================================================
// Runtime config (what the layer actually uses)
// ============================================================================

/// Resolved configuration for the graph intelligence layer.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub query_timeout: Duration,

    pub cache_max_entries: usize,
    pub cache_ttl: Duration,

    pub batch_max_concurrency: usize,
    pub batch_max_retries: u32,
    pub batch_retry_backoff: Duration,

    pub version_retention: usize,

    pub score_cache_ttl: Duration,
    pub pagerank_damping: f64,
    pub pagerank_max_iterations: usize,
    pub pagerank_tolerance: f64,

    pub community_resolution: f64,
    pub min_community_size: usize,

    pub viz_max_nodes: usize,
    pub viz_depth: u32,

    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from_yaml(YamlConfig::default())
    }
}

impl GraphConfig {
    /// Load configuration from environment variables only.
    /// Equivalent to `from_yaml_and_env(None)`.
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with
    /// env vars. If `yaml_path` is `None`, tries `config.yaml` in CWD and
    /// falls back to pure env/defaults when absent.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // Pick up a `.env` file if one is present; real env always wins.
        dotenvy::dotenv().ok();

        let yaml = Self::load_yaml(yaml_path);
        let mut config = Self::from_yaml(yaml);

        if let Ok(uri) = std::env::var("NEO4J_URI") {
            config.neo4j_uri = uri;
        }
        if let Ok(user) = std::env::var("NEO4J_USER") {
            config.neo4j_user = user;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            config.neo4j_password = password;
        }
        if let Some(timeout) = env_u64("QUERY_TIMEOUT_SECS") {
            config.query_timeout = Duration::from_secs(timeout);
        }
        if let Some(n) = env_u64("QUERY_CACHE_MAX_ENTRIES") {
            config.cache_max_entries = n as usize;
        }
        if let Some(n) = env_u64("QUERY_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(n);
        }
        if let Some(n) = env_u64("BATCH_MAX_CONCURRENCY") {
            config.batch_max_concurrency = n as usize;
        }
        if let Some(n) = env_u64("VERSION_RETENTION") {
            config.version_retention = n as usize;
        }
        if let Some(n) = env_u64("SCORE_CACHE_TTL_SECS") {
            config.score_cache_ttl = Duration::from_secs(n);
        }
        if let Ok(url) = std::env::var("LLM_URL") {
            config.llm_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }

        Ok(config)
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        Self {
            neo4j_uri: yaml.neo4j.uri,
            neo4j_user: yaml.neo4j.user,
            neo4j_password: yaml.neo4j.password,
            query_timeout: Duration::from_secs(yaml.neo4j.query_timeout_secs),
            cache_max_entries: yaml.cache.max_entries,
            cache_ttl: Duration::from_secs(yaml.cache.ttl_secs),
            batch_max_concurrency: yaml.batch.max_concurrency,
            batch_max_retries: yaml.batch.max_retries,
            batch_retry_backoff: Duration::from_millis(yaml.batch.retry_backoff_ms),
            version_retention: yaml.temporal.version_retention,
            score_cache_ttl: Duration::from_secs(yaml.analytics.score_cache_ttl_secs),
            pagerank_damping: yaml.analytics.pagerank_damping,
            pagerank_max_iterations: yaml.analytics.pagerank_max_iterations,
            pagerank_tolerance: yaml.analytics.pagerank_tolerance,
            community_resolution: yaml.community.resolution,
            min_community_size: yaml.community.min_community_size,
            viz_max_nodes: yaml.viz.max_nodes,
            viz_depth: yaml.viz.depth,
            llm_url: yaml.llm.url,
            llm_model: yaml.llm.model,
            llm_api_key: yaml.llm.api_key,
        }
    }

    /// Try to load and parse a YAML config file. Returns defaults on any
    /// failure (missing file is the normal case, not an error).
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(yaml) => yaml,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {e}; using defaults", path.display());
                    YamlConfig::default()
                }
            },
            Err(_) => YamlConfig::default(),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
