use crate::math::vec::Vec3;

/// Column-major 4x4 matrix. Each inner array is one column, matching the
/// memory layout WGSL expects for `mat4x4<f32>` uniforms.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Mat4(pub [[f32; 4]; 4]);

impl Mat4 {
    pub fn identity() -> Mat4 {
        Mat4([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn perspective(
        field_of_view_y_in_radians: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Mat4 {
        let f = 1.0 / (field_of_view_y_in_radians * 0.5).tan();
        let range_reciprocal = 1.0 / (z_near - z_far);

        Mat4([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, z_far * range_reciprocal, -1.0], // clip z in [0, 1]
            [0.0, 0.0, z_far * z_near * range_reciprocal, 0.0],
        ])
    }

    /// View matrix for a camera at `eye` looking toward `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = target.subtract(&eye).normalize();
        let side = forward.cross(&up).normalize();
        let camera_up = side.cross(&forward);

        Mat4([
            [side.x(), camera_up.x(), -forward.x(), 0.0],
            [side.y(), camera_up.y(), -forward.y(), 0.0],
            [side.z(), camera_up.z(), -forward.z(), 0.0],
            [
                -side.dot(&eye),
                -camera_up.dot(&eye),
                forward.dot(&eye),
                1.0,
            ],
        ])
    }

    pub fn multiply(&self, b: &Mat4) -> Mat4 {
        let mut result = [[0.0; 4]; 4];
        for (i, col) in result.iter_mut().enumerate() {
            for (j, cell) in col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| b.0[i][k] * self.0[k][j]).sum();
            }
        }
        Mat4(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_multiplicative_neutral() {
        let m = Mat4::perspective(1.0, 4.0 / 3.0, 0.1, 100.0);
        assert_eq!(m.multiply(&Mat4::identity()), m);
        assert_eq!(Mat4::identity().multiply(&m), m);
    }

    #[test]
    fn look_at_maps_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 4.0);
        let view = Mat4::look_at(eye, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        // Transform eye by the view matrix: column-major, v' = M * v.
        let v = [eye.x(), eye.y(), eye.z(), 1.0];
        let mut out = [0.0f32; 4];
        for (row, value) in out.iter_mut().enumerate() {
            *value = (0..4).map(|col| view.0[col][row] * v[col]).sum();
        }
        assert!(out[0].abs() < 1e-6 && out[1].abs() < 1e-6 && out[2].abs() < 1e-6);
    }

    #[test]
    fn look_at_points_down_negative_z() {
        let view = Mat4::look_at(
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        // A point directly in front of the camera lands on -Z.
        let v = [0.0, 0.0, 0.0, 1.0];
        let mut out = [0.0f32; 4];
        for (row, value) in out.iter_mut().enumerate() {
            *value = (0..4).map(|col| view.0[col][row] * v[col]).sum();
        }
        assert!(out[2] < 0.0);
    }
}
