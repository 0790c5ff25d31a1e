/// Vertex layout description and the demo vertex type
///
/// The layout types are backend-agnostic; the Vulkan crate converts them
/// to `VkVertexInputBindingDescription`/`VkVertexInputAttributeDescription`
/// when building the pipeline.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};


// BasicVertex stores plain float arrays rather than glam vectors: Vec4 is
// 16-byte aligned on SIMD targets, which would introduce padding and make
// the struct unusable as a tightly packed attribute stream.

/// Per-attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum AttributeFormat {
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl AttributeFormat {
    /// Size of one attribute of this format in bytes
    pub fn size_bytes(&self) -> u32 {
        match self {
            AttributeFormat::R32G32_SFLOAT => 8,
            AttributeFormat::R32G32B32_SFLOAT => 12,
            AttributeFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// One vertex attribute within a binding
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Attribute format
    pub format: AttributeFormat,
    /// Byte offset within the vertex
    pub offset: u32,
}

/// Description of one vertex buffer binding
#[derive(Debug, Clone)]
pub struct VertexInputLayout {
    /// Binding index
    pub binding: u32,
    /// Byte stride between consecutive vertices
    pub stride: u32,
    /// Attributes read from this binding
    pub attributes: Vec<VertexAttribute>,
}

/// Vertex carrying position, color, and normal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BasicVertex {
    pub pos: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
}

impl BasicVertex {
    pub fn new(pos: Vec3, color: Vec4, normal: Vec3) -> Self {
        Self {
            pos: pos.to_array(),
            color: color.to_array(),
            normal: normal.to_array(),
        }
    }

    /// Layout matching the standard vertex shader's inputs
    /// (location 0 = position, 1 = color, 2 = normal)
    pub fn input_layout(binding: u32) -> VertexInputLayout {
        VertexInputLayout {
            binding,
            stride: std::mem::size_of::<BasicVertex>() as u32,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    format: AttributeFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(BasicVertex, pos) as u32,
                },
                VertexAttribute {
                    location: 1,
                    format: AttributeFormat::R32G32B32A32_SFLOAT,
                    offset: std::mem::offset_of!(BasicVertex, color) as u32,
                },
                VertexAttribute {
                    location: 2,
                    format: AttributeFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(BasicVertex, normal) as u32,
                },
            ],
        }
    }
}
