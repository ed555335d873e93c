#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    /// Single `vec3<f32>` at location 0, tightly packed from offset 0.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub const VERTICES: &[Vertex] = &[
    // top right
    Vertex {
        position: [0.5, 0.5, 0.0],
    },
    // bottom right
    Vertex {
        position: [0.5, -0.5, 0.0],
    },
    // bottom left
    Vertex {
        position: [-0.5, -0.5, 0.0],
    },
    // top left
    Vertex {
        position: [-0.5, 0.5, 0.0],
    },
];

pub const INDICES: &[u32] = &[
    0, 1, 3, // first triangle
    1, 2, 3, // second triangle
];

/// Vertex and index data uploaded together into one vertex-array object.
#[derive(Copy, Clone, Debug)]
pub struct Mesh<'a> {
    pub vertices: &'a [Vertex],
    pub indices: &'a [u32],
}

impl Mesh<'static> {
    pub const QUAD: Self = Mesh {
        vertices: VERTICES,
        indices: INDICES,
    };
}

impl<'a> Mesh<'a> {
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Groups the index list into triangle-list primitives.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + 'a {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }
}
