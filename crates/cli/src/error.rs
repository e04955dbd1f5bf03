//! Failure modes of the `particle-morph` binary and their exit codes.
//!
//! Clap exits with 2 on bad arguments before any of this runs. Everything
//! after parsing lands in one of four buckets:
//! - 10: the controller refused the work, e.g. an image delivered before
//!   the particle set existed or a sampled target of the wrong length
//! - 11: a file could not be read or written, the loader thread stopped,
//!   or a load exceeded its frame budget
//! - 12: the user handed over something unusable: an undecodable image, a
//!   zero output size or a `--config` that is not JSON
//! - 13: a report could not be serialized for `--json`

use particle_morph_core::MorphError;
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// Controller or buffer rejection that is not the user's input.
    Morph(MorphError),
    /// Image read, PNG write, loader shutdown or load timeout.
    Io(String),
    /// Undecodable image, unusable output size or malformed `--config`.
    Input(String),
    /// `--json` report output failed.
    Serialization(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Morph(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Morph(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<MorphError> for CliError {
    fn from(e: MorphError) -> Self {
        match e {
            MorphError::Io(msg) => CliError::Io(msg),
            MorphError::Decode(_) | MorphError::InvalidDimensions => CliError::Input(e.to_string()),
            other => CliError::Morph(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_error_exit_code_is_10() {
        let err = CliError::Morph(MorphError::NotReady);
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn io_error_exit_code_is_11() {
        let err = CliError::Io("write failed".into());
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn input_error_exit_code_is_12() {
        let err = CliError::Input("bad config".into());
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn serialization_error_exit_code_is_13() {
        let err = CliError::Serialization("json fail".into());
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn from_morph_error_io_routes_to_cli_io() {
        let cli_err = CliError::from(MorphError::Io("disk full".into()));
        assert_eq!(cli_err.exit_code(), 11);
        assert!(cli_err.to_string().contains("disk full"));
    }

    #[test]
    fn from_decode_error_routes_to_cli_input() {
        let cli_err = CliError::from(MorphError::Decode("bad header".into()));
        assert_eq!(cli_err.exit_code(), 12);
        assert!(cli_err.to_string().contains("bad header"));
    }

    #[test]
    fn unusable_output_size_is_an_input_error() {
        let cli_err = CliError::from(MorphError::InvalidDimensions);
        assert_eq!(cli_err.exit_code(), 12);
    }

    #[test]
    fn early_delivery_is_a_morph_error() {
        let cli_err = CliError::from(MorphError::NotReady);
        assert_eq!(cli_err.exit_code(), 10);
        assert!(!cli_err.to_string().is_empty());
    }

    #[test]
    fn from_other_morph_error_routes_to_cli_morph() {
        let cli_err = CliError::from(MorphError::BufferLength {
            expected: 3,
            got: 1,
        });
        assert_eq!(cli_err.exit_code(), 10);
        assert!(cli_err.to_string().contains('3'));
    }

    #[test]
    fn from_serde_json_error_routes_to_serialization() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{invalid");
        let cli_err = CliError::from(bad_json.unwrap_err());
        assert_eq!(cli_err.exit_code(), 13);
    }
}
