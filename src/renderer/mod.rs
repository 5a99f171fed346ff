//! Retained-mode rendering layer.
//!
//! Four components cover a frame: [`VertexBuffer`] holds geometry with a
//! layout derived from the data, [`UniformValue`] carries typed shader
//! parameters, [`ShaderProgram::invoke`] binds them into an immutable
//! [`DrawIntent`], and [`RenderTarget::execute`] draws an intent into the
//! screen or an off-screen framebuffer. Each operation names what it does;
//! nothing depends on hidden currently-bound state.

pub mod context;
pub mod loader;
pub mod shader;
pub mod target;
pub mod uniform;
pub mod vertex;

pub use context::Gpu;
pub use loader::ShaderLoader;
pub use shader::{DrawIntent, SamplerConfig, ShaderProgram};
pub use target::{ClearMask, RenderTarget, TextureAttachment};
pub use uniform::UniformValue;
pub use vertex::{VertexBuffer, VertexLayout};
