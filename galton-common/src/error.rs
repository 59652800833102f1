use std::path::PathBuf;
use thiserror::Error;

/// Result alias for configuration loading and validation.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why a configuration or parameter set was rejected.
///
/// A rejected parameter set never produces a board; whatever board was active
/// before stays active.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A geometric field (radius, spacing, rate) was zero or negative.
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f32 },

    /// A material property was negative.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f32 },

    /// NaN or infinity in any field.
    #[error("{field} must be finite (got {value})")]
    NonFinite { field: &'static str, value: f32 },

    #[error("row_count must be at least 1 (got {0})")]
    RowCount(u32),

    /// The derived layout collapsed (e.g. boundaries no longer strictly ascending
    /// at f32 precision).
    #[error("degenerate board layout: {0}")]
    DegenerateLayout(String),

    /// A run setting outside the board parameters (timing, output) is unusable.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML from '{origin}': {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from the histogram deviation statistic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatisticError {
    /// A histogram with zero bins has no defined mean or spread.
    #[error("cannot score a histogram with no bins")]
    EmptyHistogram,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_field() {
        let e = ConfigError::NonPositive { field: "column_spacing", value: -80.0 };
        let msg = e.to_string();
        assert!(msg.contains("column_spacing"));
        assert!(msg.contains("-80"));
    }

    #[test]
    fn read_error_includes_path() {
        let e = ConfigError::Read {
            path: PathBuf::from("missing.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("missing.toml"));
    }
}
