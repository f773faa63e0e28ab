//! Weighted-Blended OIT Rendering Library
//!
//! This crate provides the wgpu pipeline that draws an opaque glyph, accumulates
//! unsorted translucent sprites into offscreen buffers, and composites them
//! over the opaque image.
//!
//! ## Key Components
//!
//! - [`context::RenderContext`] - WGPU device, queue, and surface management
//! - [`pipeline::ProgramSet`] - the Opaque, Accumulate and Composite programs
//! - [`pipeline::OffscreenTarget`] - accumulation + revealage attachments
//! - [`frame::FrameGraph`] - ordered pass descriptors and the dispatch loop
//! - [`reference::ReferenceRenderer`] - software executor of the same frame graph
//!
//! ## Shader math
//!
//! [`oit`] mirrors the fragment-stage math on the host so the technique's
//! properties can be checked without a GPU.

pub mod context;
pub mod error;
pub mod frame;
pub mod oit;
pub mod pipeline;
pub mod reference;
pub mod scene;

pub use error::RenderError;
pub use frame::{
    ClearSpec, FrameGraph, FrameGraphError, PassDescriptor, PassExecutor, RenderTarget,
};
pub use pipeline::{BlendSpec, OffscreenTarget, ProgramKind, ProgramSet, QuadMesh};
pub use reference::ReferenceRenderer;
pub use scene::SceneParams;
