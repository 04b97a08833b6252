/// Filter applied when `RUST_LOG` is unset. Storage and database clients are
/// chatty at info, so they only report warnings.
pub const DEFAULT_FILTER: &str =
    "info,gpd_uploader=debug,tower_http=info,sqlx=warn,object_store=warn,reqwest=warn";

/// Subscriber settings for the uploader.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Recorded on the startup event so aggregated logs can be told apart.
    pub service: &'static str,
    pub environment: String,
    pub json_format: bool,
    pub default_filter: String,
}

impl TracingConfig {
    /// `LOG_FORMAT=json` switches to JSON even when the settings ask for text.
    pub fn new(environment: impl Into<String>, default_filter: impl Into<String>, json: bool) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            environment: environment.into(),
            json_format: json || log_format_is_json(),
            default_filter: default_filter.into(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        Self::new(environment, DEFAULT_FILTER, false)
    }
}

fn log_format_is_json() -> bool {
    std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}
