use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be finite and > 0, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be finite and >= 0, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("curve {curve}: asymptote slip {asymptote} is below extremum slip {extremum}")]
    CurveOrder {
        curve: &'static str,
        extremum: f32,
        asymptote: f32,
    },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}
