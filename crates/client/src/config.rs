use std::time::Duration;

/// Default HTTP base URL of the optimization service.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default WebSocket base URL of the optimization service.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default progress stream idle timeout in seconds.
///
/// The server polls task state once per second, so two minutes of
/// silence means the stream has stalled.
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 120;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL, without a trailing slash.
    pub api_url: String,
    /// WebSocket base URL, without a trailing slash.
    pub ws_url: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// How long a progress stream may stay silent before it is failed.
    /// `None` waits indefinitely.
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream_idle_timeout: Some(Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS)),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                             | Default                 |
    /// |-------------------------------------|-------------------------|
    /// | `GEMGGARK_API_URL`                  | `http://localhost:8000` |
    /// | `GEMGGARK_WS_URL`                   | `ws://localhost:8000`   |
    /// | `GEMGGARK_REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `GEMGGARK_STREAM_IDLE_TIMEOUT_SECS` | `120` (`0` disables)    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("GEMGGARK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let ws_url = lookup("GEMGGARK_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.into());

        let request_timeout_secs = parse_secs(
            &lookup,
            "GEMGGARK_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let idle_timeout_secs = parse_secs(
            &lookup,
            "GEMGGARK_STREAM_IDLE_TIMEOUT_SECS",
            DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
        )?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ws_url: ws_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(request_timeout_secs),
            stream_idle_timeout: (idle_timeout_secs > 0)
                .then(|| Duration::from_secs(idle_timeout_secs)),
        })
    }
}

fn parse_secs<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    Invalid { var: &'static str, value: String },
}
