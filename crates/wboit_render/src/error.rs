//! Render error types
//!
//! Every variant is fatal: they are only produced while setting up the
//! device, the surface, or the programs, never while drawing a frame.

use std::fmt;

use crate::frame::FrameGraphError;

/// Error type for renderer setup
#[derive(Debug)]
pub enum RenderError {
    /// Adapter, device or surface could not be created
    Initialization(String),
    /// A program failed to build; `log` carries the driver's diagnostic
    ShaderLink {
        program: &'static str,
        log: String,
    },
    /// The frame graph breaks one of the pass ordering rules
    InvalidFrameGraph(FrameGraphError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Initialization(msg) => write!(f, "Initialization failed: {}", msg),
            RenderError::ShaderLink { program, log } => {
                write!(f, "Failed to link shader '{}':\n{}", program, log)
            }
            RenderError::InvalidFrameGraph(err) => write!(f, "Invalid frame graph: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::InvalidFrameGraph(err) => Some(err),
            RenderError::Initialization(_) | RenderError::ShaderLink { .. } => None,
        }
    }
}

impl From<FrameGraphError> for RenderError {
    fn from(err: FrameGraphError) -> Self {
        RenderError::InvalidFrameGraph(err)
    }
}
