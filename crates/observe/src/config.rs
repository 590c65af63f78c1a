use tracing::Level;

/// How log events are filtered, formatted and where they are written to.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directives in the syntax of
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    pub(crate) env_filter: String,
    /// Events at or above this verbosity go to stdout, everything else to
    /// stderr. `None` behaves like `Level::ERROR`.
    pub(crate) stderr_threshold: Option<Level>,
    pub(crate) use_json_format: bool,
}

impl Config {
    pub fn new(env_filter: &str, stderr_threshold: Option<Level>, use_json_format: bool) -> Self {
        Self {
            env_filter: env_filter.into(),
            stderr_threshold,
            use_json_format,
        }
    }

    pub fn with_env_filter(self, env_filter: &str) -> Self {
        Self {
            env_filter: env_filter.to_string(),
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("info", None, false)
    }
}
