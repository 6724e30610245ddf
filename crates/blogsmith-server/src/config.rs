// ABOUTME: Configuration loading and validation for the blogsmith server.
// ABOUTME: Reads environment variables once at startup into an explicit ServerConfig.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use blogsmith_agent::{LlmConfig, ToolSettings};
use blogsmith_agent::config::{DEFAULT_API_BASE, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL};
use blogsmith_core::{CrewDefinition, CrewError};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_NOTES_PATH: &str = "./sample_article.md";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BLOGSMITH_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("BLOGSMITH_SESSION_IDLE_SECS must be a positive number of seconds: {0}")]
    InvalidSessionIdle(String),

    #[error("OPENAI_API_KEY is not set; refusing to start without an LLM key")]
    MissingApiKey,

    #[error("failed to load crew file {path}: {source}")]
    Crew {
        path: PathBuf,
        #[source]
        source: CrewError,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub llm: LlmConfig,
    pub tools: ToolSettings,
    pub crew_file: Option<PathBuf>,
    /// How long an untouched, idle browser session is kept.
    pub session_idle: Duration,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - OPENAI_API_BASE: Chat Completions base URL (default: https://api.openai.com/v1)
    /// - OPENAI_MODEL_NAME: chat model (default: gpt-4o)
    /// - OPENAI_API_KEY: bearer key (required)
    /// - OPENAI_EMBEDDING_MODEL: embedding model (default: text-embedding-3-small)
    /// - SERPER_API_KEY: web search key (optional)
    /// - BLOGSMITH_NOTES_PATH: notes markdown file (default: ./sample_article.md)
    /// - BLOGSMITH_CREW_FILE: YAML crew definition (optional)
    /// - BLOGSMITH_BIND: socket address to bind (default: 127.0.0.1:8501)
    /// - BLOGSMITH_SESSION_IDLE_SECS: idle session lifetime (default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_str = var("BLOGSMITH_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let api_key = var("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let llm = LlmConfig {
            api_base: var("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: var("OPENAI_MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            embedding_model: var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        };

        let mut tools = ToolSettings::new(
            var("BLOGSMITH_NOTES_PATH").unwrap_or_else(|| DEFAULT_NOTES_PATH.to_string()),
        );
        tools.serper_api_key = var("SERPER_API_KEY");

        let crew_file = var("BLOGSMITH_CREW_FILE").map(PathBuf::from);

        let session_idle = match var("BLOGSMITH_SESSION_IDLE_SECS") {
            None => Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidSessionIdle(raw)),
            },
        };

        Ok(Self {
            bind,
            llm,
            tools,
            crew_file,
            session_idle,
        })
    }

    /// The crew to run: the configured YAML file, or the built-in blog crew.
    pub fn load_crew(&self) -> Result<CrewDefinition, ConfigError> {
        match &self.crew_file {
            Some(path) => CrewDefinition::from_yaml_file(path).map_err(|source| ConfigError::Crew {
                path: path.clone(),
                source,
            }),
            None => Ok(CrewDefinition::blog_crew()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn config_loads_defaults() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();

        assert_eq!(config.bind, "127.0.0.1:8501".parse::<SocketAddr>().unwrap());
        assert_eq!(config.llm.api_base, "https://api.openai.com/v1");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
        assert_eq!(config.tools.notes_path, PathBuf::from("./sample_article.md"));
        assert!(config.tools.serper_api_key.is_none());
        assert!(config.crew_file.is_none());
        assert_eq!(config.session_idle, Duration::from_secs(3600));
    }

    #[test]
    fn config_reads_overrides() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "http://localhost:11434/v1"),
            ("OPENAI_MODEL_NAME", "llama3"),
            ("SERPER_API_KEY", "serper"),
            ("BLOGSMITH_NOTES_PATH", "/tmp/notes.md"),
            ("BLOGSMITH_BIND", "0.0.0.0:9000"),
            ("BLOGSMITH_SESSION_IDLE_SECS", "120"),
        ])
        .unwrap();

        assert_eq!(config.llm.base_url(), "http://localhost:11434/v1");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.tools.serper_api_key.as_deref(), Some("serper"));
        assert_eq!(config.tools.notes_path, PathBuf::from("/tmp/notes.md"));
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.session_idle, Duration::from_secs(120));
    }

    #[test]
    fn config_rejects_missing_key() {
        let err = load(&[("OPENAI_API_KEY", "   ")]).unwrap_err();
        assert!(
            err.to_string().contains("OPENAI_API_KEY"),
            "error should mention the key: {}",
            err
        );
    }

    #[test]
    fn config_rejects_bad_bind() {
        let err = load(&[("OPENAI_API_KEY", "k"), ("BLOGSMITH_BIND", "nope")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBind(ref b) if b == "nope"));
    }

    #[test]
    fn config_rejects_bad_session_idle() {
        for raw in ["0", "soon", "-5"] {
            let err = load(&[("OPENAI_API_KEY", "k"), ("BLOGSMITH_SESSION_IDLE_SECS", raw)])
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSessionIdle(ref v) if v == raw));
        }
    }

    #[test]
    fn crew_defaults_to_builtin_and_reports_bad_files() {
        let config = load(&[("OPENAI_API_KEY", "k")]).unwrap();
        assert_eq!(config.load_crew().unwrap(), CrewDefinition::blog_crew());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crew.yaml");
        std::fs::write(&path, "agents: []\ntasks: []\n").unwrap();
        let config = load(&[
            ("OPENAI_API_KEY", "k"),
            ("BLOGSMITH_CREW_FILE", path.to_str().unwrap()),
        ])
        .unwrap();
        let err = config.load_crew().unwrap_err();
        assert!(err.to_string().contains("crew.yaml"));
    }
}
