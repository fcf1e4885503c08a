/// Errors raised while building modules or loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("module '{module}' is missing required field: {field}")]
    MissingField { module: String, field: &'static str },

    #[error("invalid gain {name} = {value}")]
    InvalidGain { name: &'static str, value: f64 },

    #[error("invalid geometry for module '{module}': {reason}")]
    InvalidGeometry { module: String, reason: String },

    #[error("configuration defines no modules")]
    NoModules,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
