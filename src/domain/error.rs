//! Domain error types.

/// Top-level error type for trendscan.
#[derive(Debug, thiserror::Error)]
pub enum TrendscanError {
    #[error("no data for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient history: have {bars} bars, need {required}")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("fetch failed for {symbol}: {reason}")]
    SourceFetchFailed { symbol: String, reason: String },

    #[error("invalid price series: {reason}")]
    InvalidSeries { reason: String },

    #[error("storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendscanError {
    /// Errors that abort a whole pipeline run rather than a single symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrendscanError::Storage { .. } | TrendscanError::Io(_))
    }

    pub(crate) fn insufficient(bars: usize, required: usize) -> Self {
        TrendscanError::InsufficientHistory { bars, required }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TrendscanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TrendscanError> for std::process::ExitCode {
    fn from(err: &TrendscanError) -> Self {
        let code: u8 = match err {
            TrendscanError::Io(_) => 1,
            TrendscanError::ConfigParse { .. }
            | TrendscanError::ConfigMissing { .. }
            | TrendscanError::ConfigInvalid { .. } => 2,
            TrendscanError::Storage { .. } => 3,
            TrendscanError::DataUnavailable { .. }
            | TrendscanError::InsufficientHistory { .. }
            | TrendscanError::SourceFetchFailed { .. }
            | TrendscanError::InvalidSeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
