use serde::{Deserialize, Serialize};

use crate::model::RepoMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pull: EngineConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub default_namespace: String,
    pub repo_mode: RepoMode,
}

/// Settings the operation engine is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds an idle pull session stays open when the client does not ask
    /// for a specific timeout.
    pub default_operation_timeout: u32,
    /// Largest timeout a client may request.
    pub max_operation_timeout: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    pub load_demo: bool,
    pub objects_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_namespace: "root/cimv2".to_string(),
            repo_mode: RepoMode::Full,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout: 30,
            max_operation_timeout: 40,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `wbem-mock` config file
    /// and `WBEM_` environment variables, in that order of precedence.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("wbem-mock").required(false));

        // Add environment variables, e.g. WBEM_SERVER__REPO_MODE=lite
        config = config.add_source(
            config::Environment::with_prefix("WBEM")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        if app_config.pull.default_operation_timeout > app_config.pull.max_operation_timeout {
            anyhow::bail!(
                "pull.default_operation_timeout ({}) exceeds pull.max_operation_timeout ({})",
                app_config.pull.default_operation_timeout,
                app_config.pull.max_operation_timeout
            );
        }

        Ok(app_config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        self.pull
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.default_namespace, "root/cimv2");
        assert_eq!(config.server.repo_mode, RepoMode::Full);
        assert_eq!(config.engine_config().default_operation_timeout, 30);
        assert_eq!(config.engine_config().max_operation_timeout, 40);
        assert!(!config.seed.load_demo);
    }

    #[test]
    fn test_config_round_trips_through_config_crate() {
        let built = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default()).unwrap())
            .set_override("server.repo_mode", "lite")
            .unwrap()
            .build()
            .unwrap();
        let config: AppConfig = built.try_deserialize().unwrap();
        assert_eq!(config.server.repo_mode, RepoMode::Lite);
        assert_eq!(config.pull, EngineConfig::default());
    }
}
