//! Error types for the viewer.
//!
//! Everything that can fail during setup funnels into [`Error`]; the render
//! loop itself never returns one. [`Result`] is an alias used throughout the
//! crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::abs::ShaderStage;

#[derive(Debug, Error)]
pub enum Error {
    /// Mesh construction was handed geometry that violates its preconditions.
    /// Raised before any GPU resource is allocated.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// The device refused to allocate a buffer, vertex array or texture.
    #[error("failed to create {what} on the GPU: {reason}")]
    ResourceCreation { what: &'static str, reason: String },

    /// One shader stage failed to compile.
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// The shader stages compiled but the program failed to link.
    #[error("shader program failed to link: {log}")]
    ShaderLink { log: String },

    /// A model file could not be read or parsed.
    #[error("failed to import model {}: {reason}", path.display())]
    Import { path: PathBuf, reason: String },

    /// A texture file could not be decoded.
    #[error("failed to decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// SDL or GL context setup failed.
    #[error("window setup failed: {0}")]
    Window(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_culprit() {
        let e = Error::ShaderCompile {
            stage: ShaderStage::Vertex,
            log: "0:1: syntax error".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "vertex shader failed to compile: 0:1: syntax error"
        );

        let e = Error::Import {
            path: PathBuf::from("models/bunny.obj"),
            reason: "no triangles".to_string(),
        };
        assert!(e.to_string().contains("models/bunny.obj"));
        assert!(e.to_string().contains("no triangles"));
    }
}
