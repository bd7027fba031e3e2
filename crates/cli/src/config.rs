use std::time::Duration;

use hrms_client::ApiContext;
use hrms_core::upload::{UploadPolicy, BYTES_PER_MB, SPREADSHEET_MAX_MB};
use hrms_workflow::poller::{PollerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_STALL_THRESHOLD};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Import client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Base URL of the import API, e.g. `https://hr.example.com/api/import`.
    pub api_url: String,
    pub api_token: Option<String>,
    pub tenant_id: Option<String>,
    /// Delay between job progress polls (default: `2000`).
    pub poll_interval_ms: u64,
    /// Failed polls in a row before the job is reported as stalled
    /// (default: `5`).
    pub poll_stall_threshold: u32,
    /// Upload size limit in MB (default: `20`).
    pub max_upload_mb: u64,
}

impl ImportConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default  |
    /// |------------------------|----------|
    /// | `HRMS_API_URL`         | required |
    /// | `HRMS_API_TOKEN`       | unset    |
    /// | `HRMS_TENANT_ID`       | unset    |
    /// | `POLL_INTERVAL_MS`     | `2000`   |
    /// | `POLL_STALL_THRESHOLD` | `5`      |
    /// | `MAX_UPLOAD_MB`        | `20`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = get("HRMS_API_URL").ok_or(ConfigError::Missing("HRMS_API_URL"))?;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "HRMS_API_URL",
                expected: "an http(s) URL",
                value: api_url,
            });
        }

        let max_upload_mb = parse_or(get("MAX_UPLOAD_MB"), "MAX_UPLOAD_MB", SPREADSHEET_MAX_MB)?;
        if max_upload_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(ConfigError::Invalid {
                name: "MAX_UPLOAD_MB",
                expected: "a size that fits in bytes",
                value: max_upload_mb.to_string(),
            });
        }

        Ok(Self {
            api_url,
            api_token: get("HRMS_API_TOKEN"),
            tenant_id: get("HRMS_TENANT_ID"),
            poll_interval_ms: parse_or(
                get("POLL_INTERVAL_MS"),
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )?,
            poll_stall_threshold: parse_or(
                get("POLL_STALL_THRESHOLD"),
                "POLL_STALL_THRESHOLD",
                DEFAULT_STALL_THRESHOLD,
            )?,
            max_upload_mb,
        })
    }

    pub fn api_context(&self) -> ApiContext {
        let mut context = ApiContext::new(&self.api_url);
        if let Some(token) = &self.api_token {
            context = context.with_token(token);
        }
        if let Some(tenant) = &self.tenant_id {
            context = context.with_tenant(tenant);
        }
        context
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            stall_threshold: self.poll_stall_threshold,
        }
    }

    /// The spreadsheet allow-list with the configured size limit.
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::spreadsheet().with_max_size_mb(self.max_upload_mb)
    }
}

/// Parse a positive integer, falling back to `default` when unset.
fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a positive integer",
            value,
        }),
    }
}
