use crate::adapters::outbound::HttpListingConfig;
use crate::application::{BaselinePolicy, MergePolicy, ViewportOptions};
use crate::domain::services::DEFAULT_CHANGE_THRESHOLD;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://ciloot.lol:8080/api";

#[derive(Debug, Clone)]
pub struct Config {
    // Listing API settings
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub fetch_timeout_ms: u64,

    // Viewport coordination settings
    pub change_threshold: f64,
    pub merge_policy: MergePolicy,
    pub rollback_on_failure: bool,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            fetch_timeout_ms: 10_000,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            merge_policy: MergePolicy::ArrivalOrder,
            rollback_on_failure: false,
            debug: false,
        }
    }
}

impl Config {
    pub fn viewport_options(&self) -> ViewportOptions {
        ViewportOptions {
            change_threshold: self.change_threshold,
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            merge_policy: self.merge_policy,
            baseline_policy: if self.rollback_on_failure {
                BaselinePolicy::RollbackOnFailure
            } else {
                BaselinePolicy::AdvanceOnDispatch
            },
        }
    }

    pub fn http_listing_config(&self) -> HttpListingConfig {
        HttpListingConfig {
            base_url: self.api_base_url.clone(),
            session_token: self.api_token.clone(),
            request_timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary variable lookup. Unparsable values fall
/// back to their defaults.
pub fn load_config_from<F>(var: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let api_base_url = var("POPUP_API_BASE_URL").unwrap_or(defaults.api_base_url);

    let api_token = var("POPUP_API_TOKEN").filter(|t| !t.is_empty());

    let fetch_timeout_ms = var("POPUP_FETCH_TIMEOUT_MS")
        .and_then(|v| v.parse().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(defaults.fetch_timeout_ms);

    let change_threshold = var("POPUP_CHANGE_THRESHOLD")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
        .unwrap_or(defaults.change_threshold);

    let merge_policy = var("POPUP_MERGE_POLICY")
        .map(|v| MergePolicy::from_str(&v))
        .unwrap_or(defaults.merge_policy);

    let rollback_on_failure = var("POPUP_ROLLBACK_ON_FAILURE")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let debug = var("DEBUG").is_some();

    Ok(Config {
        api_base_url,
        api_token,
        fetch_timeout_ms,
        change_threshold,
        merge_policy,
        rollback_on_failure,
        debug,
    })
}
