//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for colorbook-server.
///
/// Every field except the provider credential has a sensible default so the
/// server works out-of-the-box without any environment variables set. The
/// credential deliberately has no default: it is a secret injected by the
/// deployment environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins. Wildcard when unset.
    pub cors_allowed_origins: Option<String>,

    /// Expose the merged OpenAPI document at `/api-docs/openapi.json`
    /// (default: `true`; disable in production to hide the API structure).
    pub enable_docs: bool,

    /// Base URL of the remote image-generation provider
    /// (default: `"https://api.kie.ai/api/v1"`).
    pub provider_base_url: String,

    /// Provider credential, sent as a bearer token. Required; startup fails
    /// when empty.
    pub provider_api_key: String,

    /// Model identifier submitted with every generation task.
    pub provider_model: String,

    /// Quality setting submitted with every generation task.
    pub provider_quality: String,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("COLORBOOK_BIND", "0.0.0.0:3000"),
            log_level: env_or("COLORBOOK_LOG", "info"),
            log_json: env_flag("COLORBOOK_LOG_JSON", false),
            cors_allowed_origins: std::env::var("COLORBOOK_CORS_ORIGINS").ok(),
            enable_docs: env_flag("COLORBOOK_ENABLE_DOCS", true),
            provider_base_url: env_or("KIE_API_BASE", "https://api.kie.ai/api/v1"),
            provider_api_key: env_or("KIE_API_KEY", ""),
            provider_model: env_or("KIE_MODEL", crate::provider::DEFAULT_MODEL),
            provider_quality: env_or("KIE_QUALITY", crate::provider::DEFAULT_QUALITY),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
