//! The one material record a whole shell stack draws with.

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::params::ShellStackParameters;
use crate::host::ShaderHandle;

/// Uniform names understood by the shell shader.
pub mod uniforms {
    pub const SHELL_INDEX: &str = "_ShellIndex";
    pub const SHELL_COUNT: &str = "_ShellCount";
    pub const SHELL_LENGTH: &str = "_ShellLength";
    pub const DENSITY: &str = "_Density";
    pub const NOISE_BIAS: &str = "_NoiseBias";
    pub const THICKNESS: &str = "_Thickness";
    pub const ATTENUATION: &str = "_Attenuation";
    pub const SHELL_COLOR: &str = "_ShellColor";
    pub const SHELL_DIRECTION: &str = "_ShellDirection";
}

/// GPU layout of the shared block; `_ShellIndex` is per draw and lives outside.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShellUniforms {
    pub shell_count: u32,
    pub shell_length: f32,
    pub density: f32,
    pub noise_bias: f32,
    pub thickness: f32,
    pub attenuation: f32,
    pub _pad: [f32; 2],
    pub color: [f32; 4],
    /// xyz = displacement direction, w unused.
    pub direction: [f32; 4],
}

#[derive(Debug)]
struct Record {
    shader: ShaderHandle,
    uniforms: ShellUniforms,
    static_writes: u64,
    direction_writes: u64,
}

/// Shared, single-threaded handle to a stack's material record. Clones alias
/// the same record.
#[derive(Debug, Clone)]
pub struct SharedShellMaterial(Rc<RefCell<Record>>);

impl SharedShellMaterial {
    pub fn new(shader: ShaderHandle) -> Self {
        Self(Rc::new(RefCell::new(Record {
            shader,
            uniforms: ShellUniforms::zeroed(),
            static_writes: 0,
            direction_writes: 0,
        })))
    }

    pub fn shader(&self) -> ShaderHandle { self.0.borrow().shader.clone() }

    /// Static channel: the shape block.
    pub fn write_statics(&self, p: &ShellStackParameters) {
        let mut r = self.0.borrow_mut();
        let u = &mut r.uniforms;
        u.shell_count = p.shell_count;
        u.shell_length = p.shell_length;
        u.density = p.density;
        u.noise_bias = p.noise_bias;
        u.thickness = p.thickness;
        u.attenuation = p.occlusion_attenuation;
        u.color = p.shell_color;
        r.static_writes += 1;
    }

    /// Dynamic channel: the displacement vector.
    pub fn write_direction(&self, direction: Vec3) {
        let mut r = self.0.borrow_mut();
        r.uniforms.direction = direction.extend(0.0).to_array();
        r.direction_writes += 1;
    }

    pub fn uniforms(&self) -> ShellUniforms { self.0.borrow().uniforms }
    pub fn direction(&self) -> Vec3 { Vec3::from_slice(&self.0.borrow().uniforms.direction[..3]) }
    pub fn static_writes(&self) -> u64 { self.0.borrow().static_writes }
    pub fn direction_writes(&self) -> u64 { self.0.borrow().direction_writes }

    /// Byte image of the block for upload into a uniform buffer.
    pub fn to_bytes(&self) -> Vec<u8> { bytemuck::bytes_of(&self.0.borrow().uniforms).to_vec() }

    pub fn same_as(&self, other: &SharedShellMaterial) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<ShellUniforms>(), 64);
        let m = SharedShellMaterial::new(ShaderHandle::new("shell"));
        assert_eq!(m.to_bytes().len(), 64);
    }

    #[test]
    fn clones_share_one_record() {
        let a = SharedShellMaterial::new(ShaderHandle::new("shell"));
        let b = a.clone();
        a.write_statics(&ShellStackParameters { density: 250.0, ..Default::default() });
        assert_eq!(b.uniforms().density, 250.0);
        assert!(a.same_as(&b));
        assert_eq!(b.static_writes(), 1);
    }

    #[test]
    fn channels_are_counted_separately() {
        let m = SharedShellMaterial::new(ShaderHandle::new("shell"));
        m.write_direction(Vec3::new(0.0, -1.0, 0.0));
        m.write_direction(Vec3::X);
        assert_eq!(m.direction(), Vec3::X);
        assert_eq!(m.direction_writes(), 2);
        assert_eq!(m.static_writes(), 0);
        assert_eq!(m.uniforms().direction[3], 0.0);
    }
}
