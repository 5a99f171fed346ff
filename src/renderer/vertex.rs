//! Vertex buffers with layouts derived from the data itself.
//!
//! A [`VertexBuffer`] is built from a nested sequence of per-vertex
//! attribute groups (vertices, then groups, then `f32` components). The
//! interleaved layout - per-attribute formats, byte offsets, and stride -
//! is derived from the shape of the first vertex and applied uniformly, so
//! call sites describe geometry as plain nested data and never spell out
//! strides or shader locations by hand.

use wgpu::util::DeviceExt;

/// Interleaved attribute layout derived from vertex data.
///
/// Attribute location `i` is assigned to the i-th group of every vertex;
/// offsets are the cumulative byte sizes of the preceding groups of vertex
/// 0, and the stride is the total byte size of one vertex. All vertices are
/// assumed to share the first vertex's group shape; a mismatched vertex
/// produces incorrect rendering, not a checked error.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexLayout {
    /// Byte distance between consecutive vertices.
    pub stride: wgpu::BufferAddress,
    /// One attribute per group, locations assigned in group order.
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    /// Derives the layout from the first vertex's group shape.
    ///
    /// Fatal if `vertices` is empty or a group has more than four
    /// components (no vertex format exists for it).
    pub fn derive(vertices: &[Vec<Vec<f32>>]) -> Self {
        let Some(first) = vertices.first() else {
            log::error!("vertex data must contain at least one vertex");
            std::process::exit(1);
        };

        let mut attributes = Vec::with_capacity(first.len());
        let mut offset: wgpu::BufferAddress = 0;
        for (location, group) in first.iter().enumerate() {
            let format = match group.len() {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                4 => wgpu::VertexFormat::Float32x4,
                n => {
                    log::error!("attribute group {location} has {n} components (1-4 supported)");
                    std::process::exit(1);
                }
            };
            attributes.push(wgpu::VertexAttribute {
                offset,
                shader_location: location as u32,
                format,
            });
            offset += (group.len() * std::mem::size_of::<f32>()) as wgpu::BufferAddress;
        }

        VertexLayout {
            stride: offset,
            attributes,
        }
    }

    /// The wgpu pipeline description of this layout.
    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Flattens nested vertex data into the interleaved component order.
fn flatten(vertices: &[Vec<Vec<f32>>]) -> Vec<f32> {
    vertices
        .iter()
        .flat_map(|vertex| vertex.iter())
        .flat_map(|group| group.iter().copied())
        .collect()
}

/// A GPU-resident interleaved vertex buffer.
///
/// Owns exactly one GPU buffer, uploaded once at construction and released
/// when the value is dropped. Immutable thereafter.
pub struct VertexBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
    layout: VertexLayout,
}

impl VertexBuffer {
    /// Uploads `vertices` and derives the interleaved layout from vertex 0.
    ///
    /// Each vertex is an ordered sequence of attribute groups, each group an
    /// ordered sequence of `f32` components. Fatal if `vertices` is empty.
    pub fn new(device: &wgpu::Device, label: &str, vertices: &[Vec<Vec<f32>>]) -> Self {
        let layout = VertexLayout::derive(vertices);
        let data = flatten(vertices);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            buffer,
            vertex_count: vertices.len() as u32,
            layout,
        }
    }

    /// Number of vertices in the buffer.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of attribute groups per vertex.
    pub fn attribute_count(&self) -> u32 {
        self.layout.attributes.len() as u32
    }

    /// The derived interleaved layout.
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub(crate) fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vec<Vec<f32>>> {
        vec![
            vec![vec![-1.0, -1.0, 0.0, 1.0], vec![1.0, 0.0, 0.0, 1.0]],
            vec![vec![-1.0, 1.0, 0.0, 1.0], vec![0.0, 1.0, 0.0, 1.0]],
            vec![vec![1.0, -1.0, 0.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]],
        ]
    }

    #[test]
    fn stride_is_sum_of_group_byte_sizes() {
        let layout = VertexLayout::derive(&triangle());
        // Two vec4 groups: 2 * 16 bytes.
        assert_eq!(layout.stride, 32);
    }

    #[test]
    fn offsets_accumulate_in_group_order() {
        let data = vec![vec![
            vec![0.0, 0.0],      // vec2 at offset 0
            vec![0.0, 0.0, 0.0], // vec3 at offset 8
            vec![0.0],           // f32 at offset 20
        ]];
        let layout = VertexLayout::derive(&data);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 20]);
        assert_eq!(layout.stride, 24);
    }

    #[test]
    fn locations_follow_group_order() {
        let layout = VertexLayout::derive(&triangle());
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1]);
        assert_eq!(
            layout.attributes[0].format,
            wgpu::VertexFormat::Float32x4
        );
        assert_eq!(
            layout.attributes[1].format,
            wgpu::VertexFormat::Float32x4
        );
    }

    #[test]
    fn flatten_interleaves_components() {
        let data = vec![
            vec![vec![1.0, 2.0], vec![3.0]],
            vec![vec![4.0, 5.0], vec![6.0]],
        ];
        assert_eq!(flatten(&data), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
