//! Error handling module for the patchset resolver and validation harness
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every failure is fatal to the enclosing run: there is no soft-failure path,
//! because a wrong mapping in a released plan breaks a physical machine.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for patchset resolution and validation
#[derive(Error, Debug)]
pub enum PatchsetError {
    /// Malformed catalog entry (min > max, empty tag, duplicate name).
    /// A programming error: surfaced immediately, never retried.
    #[error("Configuration defect in patch group '{group}': {reason}")]
    ConfigurationDefect { group: String, reason: String },

    /// A catalog-referenced file is absent from the payload store
    #[error("Failed to find {}", .path.display())]
    MissingPayloadFile { path: PathBuf },

    /// Mount, build or validate tool exited non-zero (output preserved verbatim)
    #[error("{tool} failed (exit code {}): {}", exit_code_label(.exit_code), .stderr.trim())]
    ExternalToolFailure {
        tool: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Payload archive could not be fetched
    #[error("Failed to download {url}: {reason}")]
    DownloadFailure { url: String, reason: String },

    /// A version-matrix cell failed; carries the offending kernel version
    #[error("Validation failed for Darwin {major}.{minor}: {source}")]
    VersionMatrix {
        major: u32,
        minor: u32,
        #[source]
        source: Box<PatchsetError>,
    },

    /// A config-matrix cell failed; carries the offending model and settings
    #[error("Validation failed for model {model} ({settings} settings): {source}")]
    ConfigMatrix {
        model: String,
        settings: String,
        #[source]
        source: Box<PatchsetError>,
    },

    /// Run stopped by SIGINT/SIGTERM/SIGHUP
    #[error("Validation interrupted by signal")]
    Interrupted,

    /// IO errors (payload reads, descriptor writes, cleanup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Result type alias for patchset operations
pub type Result<T> = std::result::Result<T, PatchsetError>;

impl From<walkdir::Error> for PatchsetError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.into())
    }
}

// Convenient error constructors
impl PatchsetError {
    /// Create a configuration defect error
    pub fn defect(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationDefect {
            group: group.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing payload file error
    pub fn missing_payload(path: impl Into<PathBuf>) -> Self {
        Self::MissingPayloadFile { path: path.into() }
    }

    /// Create a download failure error
    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error with the version-matrix cell it occurred in
    pub fn in_version_matrix(self, major: u32, minor: u32) -> Self {
        Self::VersionMatrix {
            major,
            minor,
            source: Box::new(self),
        }
    }

    /// Wrap an error with the config-matrix cell it occurred in
    pub fn in_config_matrix(self, model: impl Into<String>, settings: impl Into<String>) -> Self {
        Self::ConfigMatrix {
            model: model.into(),
            settings: settings.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, unwrapping matrix context
    pub fn root_cause(&self) -> &PatchsetError {
        match self {
            Self::VersionMatrix { source, .. } | Self::ConfigMatrix { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PatchsetError::defect("Nvidia Kepler", "minimum version exceeds maximum");
        assert_eq!(
            err.to_string(),
            "Configuration defect in patch group 'Nvidia Kepler': minimum version exceeds maximum"
        );

        let err = PatchsetError::missing_payload("/payloads/10.13.6/System/Library/Extensions/A.kext");
        assert_eq!(
            err.to_string(),
            "Failed to find /payloads/10.13.6/System/Library/Extensions/A.kext"
        );
    }

    #[test]
    fn test_tool_failure_display_uses_stderr() {
        let err = PatchsetError::ExternalToolFailure {
            tool: "hdiutil attach".to_string(),
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "resource busy\n".to_string(),
        };
        assert_eq!(err.to_string(), "hdiutil attach failed (exit code 1): resource busy");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PatchsetError = io_err.into();
        assert!(matches!(err, PatchsetError::Io(_)));
    }

    #[test]
    fn test_matrix_wrapping_keeps_root_cause() {
        let err = PatchsetError::missing_payload("/x").in_version_matrix(22, 4);
        assert!(err.to_string().starts_with("Validation failed for Darwin 22.4"));
        assert!(matches!(err.root_cause(), PatchsetError::MissingPayloadFile { .. }));
    }
}
