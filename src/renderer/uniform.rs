//! Tagged uniform values.
//!
//! This module provides [`UniformValue`], a small tagged union over the
//! payload types a shader invocation can receive. A value knows how to
//! serialize itself into the byte layout WGSL expects for the uniform
//! address space, so call sites build plain Rust values and the shader
//! invocation machinery handles the upload.

use crate::math::mat::Mat4;
use crate::math::vec::Vec3;

/// A uniform payload tagged with its type.
///
/// Exactly one payload is held at a time; constructing from a supported
/// source type sets the tag and payload together, so a stale payload from a
/// prior assignment of a different type can never leak into an upload.
///
/// Values are `Copy` and owned by the call site; a shader invocation borrows
/// them only for the duration of a single [`invoke`] call.
///
/// [`invoke`]: crate::renderer::shader::ShaderProgram::invoke
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformValue {
    /// A single 32-bit signed integer (`i32` in WGSL).
    Int(i32),
    /// A single 32-bit float (`f32` in WGSL).
    Float(f32),
    /// A 3-component float vector (`vec3<f32>` in WGSL).
    Vec3(Vec3),
    /// A column-major 4x4 float matrix (`mat4x4<f32>` in WGSL).
    Mat4(Mat4),
}

impl UniformValue {
    /// Serializes the payload into uniform-buffer bytes.
    ///
    /// Scalars take 4 bytes; a vec3 is padded to 16 bytes (WGSL aligns
    /// `vec3<f32>` to 16 in the uniform address space); a mat4 takes 64
    /// bytes column-major. The returned buffer is exactly the size the
    /// matching WGSL declaration requires.
    pub fn as_uniform_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Int(value) => bytemuck::bytes_of(value).to_vec(),
            UniformValue::Float(value) => bytemuck::bytes_of(value).to_vec(),
            UniformValue::Vec3(vector) => {
                let mut bytes = bytemuck::bytes_of(vector.as_array()).to_vec();
                bytes.resize(16, 0);
                bytes
            }
            UniformValue::Mat4(matrix) => bytemuck::bytes_of(matrix).to_vec(),
        }
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(vector: Vec3) -> Self {
        UniformValue::Vec3(vector)
    }
}

impl From<Mat4> for UniformValue {
    fn from(matrix: Mat4) -> Self {
        UniformValue::Mat4(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reassigning a uniform with a different payload type must replace both
    /// the tag and the payload; nothing of the old value survives.
    #[test]
    fn reassignment_replaces_tag_and_payload() {
        let mut value = UniformValue::from(7i32);
        assert_eq!(value, UniformValue::Int(7));

        value = UniformValue::from(2.5f32);
        assert_eq!(value, UniformValue::Float(2.5));
        assert_eq!(value.as_uniform_bytes(), 2.5f32.to_le_bytes().to_vec());
    }

    #[test]
    fn int_serializes_to_four_bytes() {
        let value = UniformValue::from(-3i32);
        assert_eq!(value.as_uniform_bytes(), (-3i32).to_le_bytes().to_vec());
    }

    #[test]
    fn vec3_is_padded_to_sixteen_bytes() {
        let value = UniformValue::from(Vec3::new(1.0, 2.0, 3.0));
        let bytes = value.as_uniform_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], 1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], 2.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], 3.0f32.to_le_bytes());
        assert_eq!(&bytes[12..16], [0u8; 4]);
    }

    #[test]
    fn mat4_serializes_column_major() {
        let matrix = Mat4::identity();
        let bytes = UniformValue::from(matrix).as_uniform_bytes();
        assert_eq!(bytes.len(), 64);
        // First column is (1, 0, 0, 0).
        assert_eq!(&bytes[0..4], 1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..16], [0u8; 12]);
    }
}
