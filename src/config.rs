use std::{env, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::{decompile::LookupTablePolicy, swap::PrioritizationFee, ClientError};

pub const JUPITER_API_URL: &str = "https://quote-api.jup.ag/v6";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JupiterConfig {
    pub api_url: String,
    /// Sent as `x-api-key` when set.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Fail decompilation when a referenced lookup table cannot be found,
    /// instead of skipping it.
    pub strict_lookup_tables: bool,
    pub dynamic_compute_unit_limit: bool,
    pub prioritization_fee: PrioritizationFee,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            api_url: JUPITER_API_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_lookup_tables: false,
            dynamic_compute_unit_limit: true,
            prioritization_fee: PrioritizationFee::Auto,
        }
    }
}

impl JupiterConfig {
    /// Builds a config from `JUPITER_*` environment variables, falling back to
    /// defaults for anything unset or empty.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(api_url) = var("JUPITER_API_URL") {
            config.api_url = api_url.trim_end_matches('/').to_string();
        }
        config.api_key = var("JUPITER_API_KEY");
        if let Some(value) = var("JUPITER_TIMEOUT_SECS") {
            config.timeout_secs = parse_var("JUPITER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = var("JUPITER_STRICT_LOOKUP_TABLES") {
            config.strict_lookup_tables = parse_var("JUPITER_STRICT_LOOKUP_TABLES", &value)?;
        }
        if let Some(value) = var("JUPITER_DYNAMIC_COMPUTE_UNIT_LIMIT") {
            config.dynamic_compute_unit_limit =
                parse_var("JUPITER_DYNAMIC_COMPUTE_UNIT_LIMIT", &value)?;
        }
        if let Some(value) = var("JUPITER_PRIORITIZATION_FEE") {
            config.prioritization_fee = parse_var("JUPITER_PRIORITIZATION_FEE", &value)?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn lookup_table_policy(&self) -> LookupTablePolicy {
        if self.strict_lookup_tables {
            LookupTablePolicy::Strict
        } else {
            LookupTablePolicy::Lenient
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, value: &str) -> Result<T, ClientError> {
    value.trim().parse().map_err(|_| ClientError::InvalidConfig {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = JupiterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, JupiterConfig::default());
        assert_eq!(config.api_url, JUPITER_API_URL);
        assert_eq!(config.lookup_table_policy(), LookupTablePolicy::Lenient);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn reads_overrides() {
        let config = JupiterConfig::from_lookup(lookup(&[
            ("JUPITER_API_URL", "http://localhost:8080/"),
            ("JUPITER_API_KEY", "secret"),
            ("JUPITER_TIMEOUT_SECS", "5"),
            ("JUPITER_STRICT_LOOKUP_TABLES", "true"),
            ("JUPITER_PRIORITIZATION_FEE", "10000"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.lookup_table_policy(), LookupTablePolicy::Strict);
        assert_eq!(config.prioritization_fee, PrioritizationFee::Lamports(10_000));
        assert!(config.dynamic_compute_unit_limit);
    }

    #[test]
    fn empty_values_are_ignored() {
        let config = JupiterConfig::from_lookup(lookup(&[("JUPITER_API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = JupiterConfig::from_lookup(lookup(&[("JUPITER_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidConfig { key: "JUPITER_TIMEOUT_SECS", .. }
        ));
    }
}
