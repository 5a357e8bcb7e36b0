use crate::circuit_breaker::BreakerSettings;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub completion_api_url: Option<String>,
    pub completion_api_key: Option<String>,
    pub completion_model: String,
    pub completion_breaker_failures: u32,
    pub completion_breaker_backoff_secs: u64,
    pub completion_breaker_max_backoff_secs: u64,
    pub simulation_seed: Option<u64>,
    pub prospect_discovery_interval_secs: u64,
    pub nurture_interval_secs: u64,
    pub campaign_interval_secs: u64,
    pub ghost_discovery_interval_secs: u64,
    pub ghost_optimization_interval_secs: u64,
    pub wellness_monitor_interval_secs: u64,
    pub wellness_engagement_interval_secs: u64,
    pub report_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            completion_api_url: None,
            completion_api_key: None,
            completion_model: "gpt-4o-mini".to_string(),
            completion_breaker_failures: 5,
            completion_breaker_backoff_secs: 10,
            completion_breaker_max_backoff_secs: 60,
            simulation_seed: None,
            prospect_discovery_interval_secs: 3600,
            nurture_interval_secs: 1800,
            campaign_interval_secs: 900,
            ghost_discovery_interval_secs: 600,
            ghost_optimization_interval_secs: 300,
            wellness_monitor_interval_secs: 300,
            wellness_engagement_interval_secs: 3600,
            report_interval_secs: 86400,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            completion_api_url: std::env::var("COMPLETION_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("COMPLETION_API_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })
                .transpose()?,
            completion_api_key: std::env::var("COMPLETION_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            completion_model: std::env::var("COMPLETION_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.completion_model),
            completion_breaker_failures: u32::try_from(positive_from_env(
                "COMPLETION_BREAKER_FAILURES",
                u64::from(defaults.completion_breaker_failures),
            )?)
            .map_err(|_| anyhow::anyhow!("COMPLETION_BREAKER_FAILURES is too large"))?,
            completion_breaker_backoff_secs: positive_from_env(
                "COMPLETION_BREAKER_BACKOFF_SECS",
                defaults.completion_breaker_backoff_secs,
            )?,
            completion_breaker_max_backoff_secs: positive_from_env(
                "COMPLETION_BREAKER_MAX_BACKOFF_SECS",
                defaults.completion_breaker_max_backoff_secs,
            )?,
            simulation_seed: std::env::var("SIMULATION_SEED")
                .ok()
                .map(|seed| {
                    seed.parse::<u64>()
                        .map_err(|_| anyhow::anyhow!("SIMULATION_SEED must be an unsigned integer"))
                })
                .transpose()?,
            prospect_discovery_interval_secs: positive_from_env(
                "PROSPECT_DISCOVERY_INTERVAL_SECS",
                defaults.prospect_discovery_interval_secs,
            )?,
            nurture_interval_secs: positive_from_env(
                "NURTURE_INTERVAL_SECS",
                defaults.nurture_interval_secs,
            )?,
            campaign_interval_secs: positive_from_env(
                "CAMPAIGN_INTERVAL_SECS",
                defaults.campaign_interval_secs,
            )?,
            ghost_discovery_interval_secs: positive_from_env(
                "GHOST_DISCOVERY_INTERVAL_SECS",
                defaults.ghost_discovery_interval_secs,
            )?,
            ghost_optimization_interval_secs: positive_from_env(
                "GHOST_OPTIMIZATION_INTERVAL_SECS",
                defaults.ghost_optimization_interval_secs,
            )?,
            wellness_monitor_interval_secs: positive_from_env(
                "WELLNESS_MONITOR_INTERVAL_SECS",
                defaults.wellness_monitor_interval_secs,
            )?,
            wellness_engagement_interval_secs: positive_from_env(
                "WELLNESS_ENGAGEMENT_INTERVAL_SECS",
                defaults.wellness_engagement_interval_secs,
            )?,
            report_interval_secs: positive_from_env(
                "REPORT_INTERVAL_SECS",
                defaults.report_interval_secs,
            )?,
        };

        if config.completion_breaker_max_backoff_secs < config.completion_breaker_backoff_secs {
            anyhow::bail!(
                "COMPLETION_BREAKER_MAX_BACKOFF_SECS cannot be below COMPLETION_BREAKER_BACKOFF_SECS"
            );
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match (&config.completion_api_url, &config.completion_api_key) {
            (Some(url), Some(_)) => {
                tracing::info!("Completion API configured: {} ({})", url, config.completion_model)
            }
            (Some(_), None) | (None, Some(_)) => tracing::warn!(
                "COMPLETION_API_URL and COMPLETION_API_KEY must both be set; qualification will use fallback scores"
            ),
            (None, None) => {
                tracing::info!("No completion API configured; qualification will use fallback scores")
            }
        }
        if let Some(seed) = config.simulation_seed {
            tracing::debug!("Simulation seed: {}", seed);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Completion client settings, present only when both URL and key are set.
    pub fn completion(&self) -> Option<crate::completion_client::CompletionConfig> {
        match (&self.completion_api_url, &self.completion_api_key) {
            (Some(api_url), Some(api_key)) => Some(crate::completion_client::CompletionConfig {
                api_url: api_url.clone(),
                api_key: api_key.clone(),
                model: self.completion_model.clone(),
                breaker: self.breaker_settings(),
            }),
            _ => None,
        }
    }

    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.completion_breaker_failures,
            initial_backoff: Duration::from_secs(self.completion_breaker_backoff_secs),
            max_backoff: Duration::from_secs(self.completion_breaker_max_backoff_secs),
        }
    }

    pub fn every(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }
}

fn positive_from_env(name: &str, default: u64) -> anyhow::Result<u64> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };

    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a positive whole number", name))?;
    if secs == 0 {
        anyhow::bail!("{} cannot be zero", name);
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_requires_url_and_key() {
        let mut config = Config {
            completion_api_url: Some("https://api.example.com/v1".to_string()),
            ..Config::default()
        };
        assert!(config.completion().is_none());

        config.completion_api_key = Some("sk-test".to_string());
        let completion = config.completion().unwrap();
        assert_eq!(completion.api_url, "https://api.example.com/v1");
        assert_eq!(completion.model, "gpt-4o-mini");
        assert_eq!(completion.breaker, BreakerSettings::default());
    }

    #[test]
    fn test_breaker_settings_follow_config() {
        let config = Config {
            completion_breaker_failures: 3,
            completion_breaker_backoff_secs: 2,
            completion_breaker_max_backoff_secs: 20,
            ..Config::default()
        };
        let settings = config.breaker_settings();
        assert_eq!(settings.failure_threshold, 3);
        assert_eq!(settings.initial_backoff, Duration::from_secs(2));
        assert_eq!(settings.max_backoff, Duration::from_secs(20));
    }

    #[test]
    fn test_positive_from_env_defaults_when_unset() {
        let secs = positive_from_env("FREIGHT_AGENTS_TEST_UNSET_SETTING", 42).unwrap();
        assert_eq!(secs, 42);
    }
}
