use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for buildswarm
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildswarmConfig {
    /// Chat service settings
    pub chat: ChatConfig,
    /// Workspace / worktree settings
    pub workspace: WorkspaceConfig,
    /// Auditor invocation settings
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Chat service address (can be set via env var)
    pub url: String,
    /// Default channel joined when none is given on the command line
    pub default_channel: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Directory (relative to the repository) holding component worktrees
    pub worktree_base: String,
    /// Prefix for per-component branch names
    pub branch_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Auditor executable, relative to the repository root
    pub auditor_path: String,
    /// Substrings of auditor output that mean the audit passed
    pub pass_markers: Vec<String>,
    /// Cap on failure detail relayed over the channel, in characters
    pub detail_limit: usize,
}

impl Default for BuildswarmConfig {
    fn default() -> Self {
        Self {
            chat: ChatConfig {
                url: "wss://agentchat-server.fly.dev".to_string(),
                default_channel: "#build".to_string(),
            },
            workspace: WorkspaceConfig {
                worktree_base: ".buildswarm/worktrees".to_string(),
                branch_prefix: "build/".to_string(),
            },
            audit: AuditConfig {
                auditor_path: "auditor/auditor.js".to_string(),
                pass_markers: vec!["PASSED".to_string(), "passed".to_string()],
                detail_limit: 200,
            },
        }
    }
}

impl BuildswarmConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (buildswarm.toml)
    /// 3. Environment variables (prefixed with BUILDSWARM_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&BuildswarmConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("buildswarm.toml").exists() {
            builder = builder.add_source(File::with_name("buildswarm"));
        }

        builder = builder.add_source(
            Environment::with_prefix("BUILDSWARM")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut buildswarm_config: BuildswarmConfig = config.try_deserialize()?;

        // The chat service address is also honored from the bare env
        // var shared with the worker tooling.
        if let Ok(url) = std::env::var("AGENTCHAT_URL") {
            buildswarm_config.chat.url = url;
        }

        Ok(buildswarm_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<BuildswarmConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = BuildswarmConfig::load_env_file();
        BuildswarmConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static BuildswarmConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = BuildswarmConfig::default();
        assert_eq!(config.chat.default_channel, "#build");
        assert!(config.workspace.branch_prefix.ends_with('/'));
        assert_eq!(config.audit.detail_limit, 200);
    }
}
