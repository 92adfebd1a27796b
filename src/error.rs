//! Error type shared by every stage of the chromosome plotter.

use thiserror::Error;

/// Fatal failures raised to the caller of one chromosome's processing.
///
/// Missing-data conditions (undefined GC ratio, no overlapping feature,
/// unknown colour key) are not errors and never show up here.
#[derive(Error, Debug)]
pub enum PlotError {
    /// Bad parameters: fix the configuration and retry.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Caller or data bug, e.g. unsorted chunk lists or mixed chromosomes.
    #[error("Precondition violated: {message}")]
    Precondition { message: String },

    #[error("Parsing error in {file} at line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl PlotError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn precondition<S: Into<String>>(message: S) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn parse<F: Into<String>, M: Into<String>>(file: F, line: usize, message: M) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

impl From<toml::de::Error> for PlotError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for PlotError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let cfg = PlotError::config("dark_max must be below 1");
        let pre = PlotError::precondition("chunks are not sorted");
        assert!(cfg.is_config() && !cfg.is_precondition());
        assert!(pre.is_precondition() && !pre.is_config());
        assert_eq!(
            cfg.to_string(),
            "Configuration error: dark_max must be below 1"
        );
    }

    #[test]
    fn parse_error_names_location() {
        let err = PlotError::parse("chr1.bed.gz", 12, "start is not an integer");
        assert_eq!(
            err.to_string(),
            "Parsing error in chr1.bed.gz at line 12: start is not an integer"
        );
    }
}
