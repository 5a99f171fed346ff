//! Math utilities and types for 3D graphics.
//!
//! This module provides the matrix and vector types the renderer stores and
//! transmits as uniform payloads, plus a helper for angle conversion. All
//! types are designed to be compatible with GPU memory layouts (e.g., for
//! use with WGPU/WGSL).

pub mod mat;
pub mod vec;

/// Converts degrees to radians.
///
/// This handles angle wrapping by first normalizing the input to the range [0, 360).
pub fn deg_to_rad(degrees: f32) -> f32 {
    (degrees % 360.0) * (std::f32::consts::PI / 180.0)
}
