//! Runtime configuration for the transaction runner.
//!
//! Values come from the environment:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STOREFRONT_SYSTEM_ACTOR` | `system` | audit actor when no user is known |
//! | `STOREFRONT_MAX_PAGE_SIZE` | `100` | largest page a caller may request |

use thiserror::Error;

use crate::outcome::Fin;
use crate::query::PageRequest;

/// Environment variable naming the fallback audit actor.
pub const SYSTEM_ACTOR_VAR: &str = "STOREFRONT_SYSTEM_ACTOR";

/// Environment variable capping page sizes.
pub const MAX_PAGE_SIZE_VAR: &str = "STOREFRONT_MAX_PAGE_SIZE";

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set to an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// The variable name.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

/// Settings shared by every transaction a runner executes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Audit actor used when the actor source has no identity.
    pub system_actor: String,
    /// Largest accepted page size.
    pub max_page_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_actor: "system".to_owned(),
            max_page_size: 100,
        }
    }
}

impl PipelineConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for blank actors and for page
    /// sizes that are not positive integers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; unset keys keep defaults.
    ///
    /// # Errors
    ///
    /// As [`PipelineConfig::from_env`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use storefront::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::from_lookup(|key| match key {
    ///     "STOREFRONT_MAX_PAGE_SIZE" => Some("25".to_owned()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.max_page_size, 25);
    /// assert_eq!(config.system_actor, "system");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(actor) = lookup(SYSTEM_ACTOR_VAR) {
            let actor = actor.trim();
            if actor.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: SYSTEM_ACTOR_VAR,
                    message: "must not be blank".to_owned(),
                });
            }
            actor.clone_into(&mut config.system_actor);
        }

        if let Some(size) = lookup(MAX_PAGE_SIZE_VAR) {
            config.max_page_size = size
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: MAX_PAGE_SIZE_VAR,
                    message: format!("expected a positive integer, got {size:?}"),
                })?;
        }

        Ok(config)
    }

    /// Builds a page request capped at [`PipelineConfig::max_page_size`].
    ///
    /// # Errors
    ///
    /// Returns `Validation` for non-positive or oversized requests.
    pub fn page_request(&self, number: i64, size: i64) -> Fin<PageRequest> {
        PageRequest::bounded(number, size, self.max_page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key: &str| values.get(key).cloned()
    }

    #[rstest]
    fn unset_values_keep_defaults() {
        assert_eq!(PipelineConfig::from_lookup(lookup(&[])), Ok(PipelineConfig::default()));
    }

    #[rstest]
    fn values_are_trimmed() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (SYSTEM_ACTOR_VAR, " batch-import "),
            (MAX_PAGE_SIZE_VAR, " 50 "),
        ]))
        .unwrap();
        assert_eq!(config.system_actor, "batch-import");
        assert_eq!(config.max_page_size, 50);
    }

    #[rstest]
    #[case(SYSTEM_ACTOR_VAR, "  ")]
    #[case(MAX_PAGE_SIZE_VAR, "0")]
    #[case(MAX_PAGE_SIZE_VAR, "-3")]
    #[case(MAX_PAGE_SIZE_VAR, "lots")]
    fn invalid_values_are_rejected(#[case] key: &'static str, #[case] value: &str) {
        let error = PipelineConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key: rejected, .. } if rejected == key));
    }

    #[rstest]
    fn page_request_honours_cap() {
        let config = PipelineConfig {
            max_page_size: 10,
            ..PipelineConfig::default()
        };
        assert!(config.page_request(1, 10).is_ok());
        assert!(config.page_request(1, 11).is_err());
    }
}
