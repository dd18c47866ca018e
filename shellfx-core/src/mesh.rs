//! Base meshes for shell stacks. Shells never modify vertex data; the shell
//! shader extrudes along the normal by the shell height.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }
}

// Unit sphere scaled by radius.
// stacks: latitude segments (>= 3), slices: longitude segments (>= 3)
pub fn generate_uv_sphere(radius: f32, stacks: u32, slices: u32) -> Mesh {
    let stacks = stacks.max(3);
    let slices = slices.max(3);
    let mut mesh = Mesh::default();

    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let theta = v * std::f32::consts::PI;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            let phi = u * std::f32::consts::TAU;
            let (sin_p, cos_p) = phi.sin_cos();

            let normal = [sin_t * cos_p, cos_t, sin_t * sin_p];
            let pos = [radius * normal[0], radius * normal[1], radius * normal[2]];
            mesh.vertices.push(Vertex { pos, normal, uv: [u, v] });
        }
    }

    let stride = slices + 1;
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * stride + j;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    mesh
}

/// Flat XZ grid of `size` x `size` world units facing +Y, the usual base for
/// grass stacks. `subdivisions` is clamped to at least 1.
pub fn generate_plane(size: f32, subdivisions: u32) -> Mesh {
    let n = subdivisions.max(1);
    let mut mesh = Mesh::default();
    let half = size * 0.5;

    for z in 0..=n {
        let v = z as f32 / n as f32;
        for x in 0..=n {
            let u = x as f32 / n as f32;
            mesh.vertices.push(Vertex {
                pos: [-half + u * size, 0.0, -half + v * size],
                normal: [0.0, 1.0, 0.0],
                uv: [u, v],
            });
        }
    }

    let stride = n + 1;
    for z in 0..n {
        for x in 0..n {
            let a = z * stride + x;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    mesh
}
