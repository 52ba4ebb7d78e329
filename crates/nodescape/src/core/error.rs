//! Core error types for the node map
//!
//! Lookups and id-keyed mutations never fail with an error: they return
//! `Option`/`bool`. Errors are reserved for the paths that genuinely can fail,
//! such as snapshot I/O and format-version checks.

use thiserror::Error;

/// Core error types for model, layout and rendering
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Snapshot format version {found} does not match expected version {expected}")]
    FormatVersion { expected: u32, found: u32 },

    #[error("Layout error: {message}")]
    LayoutError { message: String },

    #[error("Render error: {message}")]
    RenderError { message: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl ModelError {
    /// Create a new format version mismatch error
    pub fn format_version(expected: u32, found: u32) -> Self {
        Self::FormatVersion { expected, found }
    }

    /// Create a new layout error
    pub fn layout_error(message: String) -> Self {
        Self::LayoutError { message }
    }

    /// Create a new render error
    pub fn render_error(message: String) -> Self {
        Self::RenderError { message }
    }

    /// Returns true if the caller should re-derive the model from source
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            ModelError::FormatVersion { .. } | ModelError::SerializationError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_version_error() {
        let error = ModelError::format_version(3, 2);
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("version 2"));
        assert!(error_msg.contains("expected version 3"));
        assert!(error.requires_rebuild());
    }

    #[test]
    fn test_layout_error() {
        let error = ModelError::layout_error("Layout failed".to_string());
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Layout error"));
        assert!(error_msg.contains("Layout failed"));
        assert!(!error.requires_rebuild());
    }

    #[test]
    fn test_render_error() {
        let error = ModelError::render_error("Render failed".to_string());
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Render error"));
        assert!(error_msg.contains("Render failed"));
    }

    #[test]
    fn test_io_error_conversion() {
        use std::io;
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: ModelError = io_err.into();
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("IO error"));
        assert!(error_msg.contains("File not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: ModelError = json_err.into();
        assert!(format!("{}", error).contains("Serialization error"));
        assert!(error.requires_rebuild());
    }
}
