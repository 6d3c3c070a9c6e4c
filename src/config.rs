//! Startup configuration from the environment

use reqwest::Url;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gpt-4-turbo-2024-04-09";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SURVEY_URL: &str = "https://iu.co1.qualtrics.com/jfe/form/SV_0iJ9n921PlFCxNQ";
const DEFAULT_POLL_MAX_WAIT_SECS: u64 = 120;
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Which integration style relays chat messages
#[derive(Clone, PartialEq, Eq)]
pub enum RelayBackendConfig {
    Completion {
        model: String,
    },
    Assistants {
        strategic_assistant: String,
        baseline_assistant: String,
    },
}

impl fmt::Debug for RelayBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion { model } => write!(f, "Completion({model})"),
            Self::Assistants { .. } => f.write_str("Assistants"),
        }
    }
}

#[derive(Clone)]
pub struct StudyConfig {
    pub openai_api_key: String,
    pub admin_password: String,
    pub backend: RelayBackendConfig,
    pub openai_base_url: String,
    pub survey_url: Url,
    pub poll_max_wait: Duration,
    pub port: u16,
}

// Secrets stay out of logs
impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("backend", &self.backend)
            .field("openai_base_url", &self.openai_base_url)
            .field("survey_url", &self.survey_url.as_str())
            .field("poll_max_wait", &self.poll_max_wait)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl StudyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let openai_api_key = required("OPENAI_API_KEY")?;
        let admin_password = required("STUDY_ADMIN_PASSWORD")?;

        let backend = match var("STUDY_RELAY_BACKEND").as_deref().map(str::trim) {
            None | Some("completion") => RelayBackendConfig::Completion {
                model: var("STUDY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            Some("assistants") => RelayBackendConfig::Assistants {
                strategic_assistant: required("ASSISTANT_ID_STRATEGIC")?,
                baseline_assistant: required("ASSISTANT_ID_BASELINE")?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STUDY_RELAY_BACKEND",
                    reason: format!("expected `completion` or `assistants`, got `{other}`"),
                })
            }
        };

        let openai_base_url = var("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&openai_base_url).map_err(|e| ConfigError::Invalid {
            name: "OPENAI_BASE_URL",
            reason: e.to_string(),
        })?;

        let survey_url = Url::parse(
            var("STUDY_SURVEY_URL")
                .as_deref()
                .unwrap_or(DEFAULT_SURVEY_URL),
        )
        .map_err(|e| ConfigError::Invalid {
            name: "STUDY_SURVEY_URL",
            reason: e.to_string(),
        })?;

        let poll_max_wait = Duration::from_secs(parse_number(
            &var,
            "STUDY_POLL_MAX_WAIT_SECS",
            DEFAULT_POLL_MAX_WAIT_SECS,
        )?);
        let port = parse_number(&var, "STUDY_PORT", DEFAULT_PORT)?;

        Ok(Self {
            openai_api_key,
            admin_password,
            backend,
            openai_base_url,
            survey_url,
            poll_max_wait,
            port,
        })
    }
}

fn parse_number<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<StudyConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StudyConfig::from_lookup(|name| map.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("STUDY_ADMIN_PASSWORD", "hunter2"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(
            config.backend,
            RelayBackendConfig::Completion {
                model: "gpt-4-turbo-2024-04-09".to_string()
            }
        );
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.survey_url.as_str(), DEFAULT_SURVEY_URL);
        assert_eq!(config.poll_max_wait, Duration::from_secs(120));
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn missing_secrets_are_fatal() {
        assert_eq!(
            load(&[("STUDY_ADMIN_PASSWORD", "x")]).unwrap_err(),
            ConfigError::Missing("OPENAI_API_KEY")
        );
        assert_eq!(
            load(&[("OPENAI_API_KEY", "sk"), ("STUDY_ADMIN_PASSWORD", "  ")]).unwrap_err(),
            ConfigError::Missing("STUDY_ADMIN_PASSWORD")
        );
    }

    #[test]
    fn assistants_backend_needs_both_ids() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STUDY_RELAY_BACKEND", "assistants"));
        vars.push(("ASSISTANT_ID_STRATEGIC", "asst_a"));
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("ASSISTANT_ID_BASELINE")
        );

        vars.push(("ASSISTANT_ID_BASELINE", "asst_b"));
        assert_eq!(
            load(&vars).unwrap().backend,
            RelayBackendConfig::Assistants {
                strategic_assistant: "asst_a".to_string(),
                baseline_assistant: "asst_b".to_string(),
            }
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        for (name, value) in [
            ("STUDY_RELAY_BACKEND", "carrier-pigeon"),
            ("STUDY_SURVEY_URL", "not a url"),
            ("STUDY_PORT", "eighty"),
            ("STUDY_POLL_MAX_WAIT_SECS", "-1"),
            ("OPENAI_BASE_URL", "not a url"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((name, value));
            assert!(
                matches!(load(&vars), Err(ConfigError::Invalid { name: n, .. }) if n == name),
                "{name}={value}"
            );
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", load(&REQUIRED).unwrap());
        assert!(!rendered.contains("sk-test"));
        assert!(!rendered.contains("hunter2"));
    }
}
