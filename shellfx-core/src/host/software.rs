//! In-memory host: RGBA f32 textures, name-keyed material tables and a flat
//! node registry. Shader programs are CPU kernels looked up by name.
//!
//! Live resource counts are exposed so callers (and tests) can check that
//! nothing leaks across frames. Optional budgets make allocation failures
//! reproducible.

use std::collections::{BTreeMap, HashMap};

use glam::Quat;

use crate::error::{FxError, FxResult};
use crate::fxaa::kernel::{self, BlendParams};
use crate::fxaa::{uniforms, FxaaSettings, BLEND_PASS, LUMINANCE_PASS};
use crate::host::{
    MaterialId, NodeId, NodeSpawn, RenderHost, SceneHost, ShaderHandle, TextureDesc, TextureFormat, TextureId,
};
use crate::shell::SharedShellMaterial;

/// Programs the software host can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Fxaa,
    Copy,
}

impl Program {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fxaa" => Some(Program::Fxaa),
            "copy" => Some(Program::Copy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Program::Fxaa => "fxaa",
            Program::Copy => "copy",
        }
    }
}

#[derive(Debug, Clone)]
struct Texture {
    desc: TextureDesc,
    pixels: Vec<[f32; 4]>,
    temporary: bool,
}

#[derive(Debug, Clone)]
struct MaterialState {
    program: Program,
    floats: HashMap<String, f32>,
    textures: HashMap<String, TextureId>,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub shader: String,
    pub material: SharedShellMaterial,
    pub shell_index: u32,
    pub rotation: Quat,
    pub triangles: usize,
}

#[derive(Debug, Default)]
pub struct SoftwareHost {
    textures: HashMap<TextureId, Texture>,
    materials: HashMap<MaterialId, MaterialState>,
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u32,
    temporary_budget: Option<usize>,
    node_budget: Option<usize>,
    temporaries_acquired: u64,
    blits: u64,
}

impl SoftwareHost {
    pub fn new() -> Self { Self::default() }

    /// Fail `acquire_temporary` once `limit` temporaries are live.
    pub fn with_temporary_budget(mut self, limit: usize) -> Self { self.temporary_budget = Some(limit); self }

    /// Fail `spawn_node` once `limit` nodes are live.
    pub fn with_node_budget(mut self, limit: usize) -> Self { self.node_budget = Some(limit); self }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Upload a persistent RGBA texture. `pixels.len()` must be `width * height`.
    pub fn upload(&mut self, width: u32, height: u32, pixels: Vec<[f32; 4]>) -> FxResult<TextureId> {
        if pixels.len() != (width as usize) * (height as usize) {
            return Err(FxError::config(format!(
                "texture data has {} pixels, expected {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        let id = TextureId(self.next());
        let desc = TextureDesc { width, height, format: TextureFormat::Rgba16Float };
        self.textures.insert(id, Texture { desc, pixels, temporary: false });
        Ok(id)
    }

    /// Persistent render target cleared to transparent black.
    pub fn create_target(&mut self, width: u32, height: u32) -> TextureId {
        let id = TextureId(self.next());
        let desc = TextureDesc { width, height, format: TextureFormat::Rgba16Float };
        let pixels = vec![[0.0; 4]; (width as usize) * (height as usize)];
        self.textures.insert(id, Texture { desc, pixels, temporary: false });
        id
    }

    /// Drop a persistent texture. Temporaries go through `release_temporary`.
    pub fn destroy_texture(&mut self, id: TextureId) {
        if self.textures.get(&id).is_some_and(|t| !t.temporary) {
            self.textures.remove(&id);
        }
    }

    pub fn pixels(&self, id: TextureId) -> Option<&[[f32; 4]]> {
        self.textures.get(&id).map(|t| t.pixels.as_slice())
    }

    pub fn texture_desc(&self, id: TextureId) -> Option<TextureDesc> { self.textures.get(&id).map(|t| t.desc) }

    pub fn live_temporaries(&self) -> usize { self.textures.values().filter(|t| t.temporary).count() }
    pub fn live_materials(&self) -> usize { self.materials.len() }
    pub fn live_nodes(&self) -> usize { self.nodes.len() }
    pub fn temporaries_acquired(&self) -> u64 { self.temporaries_acquired }
    pub fn blit_count(&self) -> u64 { self.blits }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> { self.nodes.get(&id) }
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &SceneNode)> { self.nodes.iter() }

    pub fn material_float(&self, material: MaterialId, name: &str) -> Option<f32> {
        self.materials.get(&material).and_then(|m| m.floats.get(name).copied())
    }

    pub fn material_texture(&self, material: MaterialId, name: &str) -> Option<TextureId> {
        self.materials.get(&material).and_then(|m| m.textures.get(name).copied())
    }

    fn blend_params(state: &MaterialState) -> BlendParams {
        let d = FxaaSettings::default();
        let get = |name: &str, fallback: f32| state.floats.get(name).copied().unwrap_or(fallback);
        BlendParams {
            contrast_threshold: get(uniforms::CONTRAST_THRESHOLD, d.contrast_threshold),
            relative_threshold: get(uniforms::RELATIVE_THRESHOLD, d.relative_threshold),
            subpixel_blending: get(uniforms::SUBPIXEL_BLENDING, d.subpixel_blending),
        }
    }
}

impl RenderHost for SoftwareHost {
    fn create_material(&mut self, shader: &ShaderHandle) -> FxResult<MaterialId> {
        let program = Program::from_name(shader.name())
            .ok_or_else(|| FxError::config(format!("shader '{}' is not available", shader)))?;
        let id = MaterialId(self.next());
        self.materials.insert(id, MaterialState { program, floats: HashMap::new(), textures: HashMap::new() });
        Ok(id)
    }

    fn destroy_material(&mut self, material: MaterialId) { self.materials.remove(&material); }

    fn set_float(&mut self, material: MaterialId, name: &str, value: f32) {
        if let Some(m) = self.materials.get_mut(&material) {
            m.floats.insert(name.to_string(), value);
        }
    }

    fn set_texture(&mut self, material: MaterialId, name: &str, texture: TextureId) {
        if let Some(m) = self.materials.get_mut(&material) {
            m.textures.insert(name.to_string(), texture);
        }
    }

    fn clear_texture(&mut self, material: MaterialId, name: &str) {
        if let Some(m) = self.materials.get_mut(&material) {
            m.textures.remove(name);
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.desc.width, t.desc.height))
    }

    fn acquire_temporary(&mut self, desc: TextureDesc) -> FxResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(FxError::alloc(format!("zero-sized temporary {}x{}", desc.width, desc.height)));
        }
        if let Some(limit) = self.temporary_budget {
            if self.live_temporaries() >= limit {
                return Err(FxError::alloc(format!("temporary budget of {limit} exhausted")));
            }
        }
        let id = TextureId(self.next());
        let pixels = vec![[0.0; 4]; (desc.width as usize) * (desc.height as usize)];
        self.textures.insert(id, Texture { desc, pixels, temporary: true });
        self.temporaries_acquired += 1;
        Ok(id)
    }

    fn release_temporary(&mut self, texture: TextureId) {
        if self.textures.get(&texture).is_some_and(|t| t.temporary) {
            self.textures.remove(&texture);
        }
    }

    fn blit(&mut self, source: TextureId, dest: TextureId, material: MaterialId, pass: u32) -> FxResult<()> {
        let state = self
            .materials
            .get(&material)
            .ok_or_else(|| FxError::MissingResource(format!("material {:?}", material)))?;
        let shader_err = |reason: String| FxError::Shader { shader: state.program.name().to_string(), pass, reason };

        if source == dest {
            return Err(shader_err("source and destination are the same texture".into()));
        }
        let src = self
            .textures
            .get(&source)
            .ok_or_else(|| FxError::MissingResource(format!("source texture {:?}", source)))?;
        let dst = self
            .textures
            .get(&dest)
            .ok_or_else(|| FxError::MissingResource(format!("destination texture {:?}", dest)))?;
        let (w, h) = (src.desc.width, src.desc.height);
        if (dst.desc.width, dst.desc.height) != (w, h) {
            return Err(shader_err(format!(
                "destination is {}x{}, source is {}x{}",
                dst.desc.width, dst.desc.height, w, h
            )));
        }

        let mut out = vec![[0.0; 4]; src.pixels.len()];
        match (state.program, pass) {
            (Program::Copy, 0) => out.copy_from_slice(&src.pixels),
            (Program::Fxaa, LUMINANCE_PASS) => kernel::luminance_pass(&src.pixels, &mut out),
            (Program::Fxaa, BLEND_PASS) => {
                let bound = state.textures.get(uniforms::LUMINANCE_TEX).and_then(|id| self.textures.get(id));
                let luma: Vec<f32> = match bound {
                    Some(t) if t.pixels.len() == src.pixels.len() => t.pixels.iter().map(|p| p[0]).collect(),
                    Some(_) => return Err(shader_err("luminance texture size mismatch".into())),
                    None => src.pixels.iter().map(|c| kernel::luminance(*c)).collect(),
                };
                kernel::blend_pass(&src.pixels, &luma, w, h, &Self::blend_params(state), &mut out);
            }
            _ => return Err(shader_err("no such pass".into())),
        }

        if let Some(dst) = self.textures.get_mut(&dest) {
            if dst.desc.format == TextureFormat::R16Float {
                for p in out.iter_mut() {
                    *p = [p[0], 0.0, 0.0, 1.0];
                }
            }
            dst.pixels = out;
        }
        self.blits += 1;
        Ok(())
    }
}

impl SceneHost for SoftwareHost {
    fn spawn_node(&mut self, spawn: NodeSpawn<'_>) -> FxResult<NodeId> {
        if let Some(limit) = self.node_budget {
            if self.nodes.len() >= limit {
                return Err(FxError::alloc(format!("scene node budget of {limit} exhausted")));
            }
        }
        let id = NodeId(self.next());
        self.nodes.insert(
            id,
            SceneNode {
                name: spawn.name,
                shader: spawn.material.shader().name().to_string(),
                material: spawn.material.clone(),
                shell_index: spawn.shell_index,
                rotation: spawn.rotation,
                triangles: spawn.mesh.mesh().triangle_count(),
            },
        );
        Ok(id)
    }

    fn despawn_node(&mut self, node: NodeId) { self.nodes.remove(&node); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MeshHandle, TemporaryTexture};
    use crate::mesh::generate_plane;

    fn desc(w: u32, h: u32) -> TextureDesc { TextureDesc { width: w, height: h, format: TextureFormat::R16Float } }

    #[test]
    fn unknown_shader_is_a_configuration_error() {
        let mut host = SoftwareHost::new();
        let err = host.create_material(&ShaderHandle::new("toon")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn temporary_guard_releases_on_drop() {
        let mut host = SoftwareHost::new();
        {
            let mut tmp = TemporaryTexture::acquire(&mut host, desc(4, 4)).unwrap();
            let id = tmp.id();
            assert_eq!(tmp.host().texture_size(id), Some((4, 4)));
            assert_eq!(tmp.host().live_temporaries(), 1);
        }
        assert_eq!(host.live_temporaries(), 0);
        assert_eq!(host.temporaries_acquired(), 1);
    }

    #[test]
    fn temporary_budget_is_enforced() {
        let mut host = SoftwareHost::new().with_temporary_budget(1);
        let a = host.acquire_temporary(desc(2, 2)).unwrap();
        assert!(host.acquire_temporary(desc(2, 2)).unwrap_err().is_resource_allocation());
        host.release_temporary(a);
        assert!(host.acquire_temporary(desc(2, 2)).is_ok());
    }

    #[test]
    fn release_ignores_persistent_textures() {
        let mut host = SoftwareHost::new();
        let t = host.create_target(2, 2);
        host.release_temporary(t);
        assert!(host.pixels(t).is_some());
    }

    #[test]
    fn copy_program_copies() {
        let mut host = SoftwareHost::new();
        let src = host.upload(2, 1, vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]]).unwrap();
        let dst = host.create_target(2, 1);
        let mat = host.create_material(&ShaderHandle::new("copy")).unwrap();
        host.blit(src, dst, mat, 0).unwrap();
        assert_eq!(host.pixels(dst), host.pixels(src));
        assert!(matches!(host.blit(src, dst, mat, 3), Err(FxError::Shader { pass: 3, .. })));
    }

    #[test]
    fn blit_rejects_size_mismatch() {
        let mut host = SoftwareHost::new();
        let src = host.create_target(4, 4);
        let dst = host.create_target(2, 2);
        let mat = host.create_material(&ShaderHandle::new("copy")).unwrap();
        assert!(matches!(host.blit(src, dst, mat, 0), Err(FxError::Shader { .. })));
    }

    #[test]
    fn persistent_textures_are_destroyed_explicitly() {
        let mut host = SoftwareHost::new();
        let target = host.create_target(3, 2);
        assert_eq!(host.texture_desc(target), Some(TextureDesc { width: 3, height: 2, format: TextureFormat::Rgba16Float }));
        let tmp = host.acquire_temporary(desc(2, 2)).unwrap();
        host.destroy_texture(tmp);
        assert_eq!(host.live_temporaries(), 1);
        host.destroy_texture(target);
        assert_eq!(host.texture_desc(target), None);
        assert_eq!(host.texture_size(target), None);
    }

    #[test]
    fn upload_checks_pixel_count() {
        let mut host = SoftwareHost::new();
        assert!(host.upload(2, 2, vec![[0.0; 4]; 3]).is_err());
    }

    #[test]
    fn nodes_spawn_and_despawn() {
        let mut host = SoftwareHost::new().with_node_budget(1);
        let mesh = MeshHandle::new(generate_plane(1.0, 2));
        let material = SharedShellMaterial::new(ShaderHandle::new("shell"));
        let spawn = NodeSpawn { name: "Shell 1".into(), mesh: &mesh, material: &material, rotation: Quat::IDENTITY, shell_index: 1 };
        let id = host.spawn_node(spawn.clone()).unwrap();
        assert_eq!(host.node(id).map(|n| n.triangles), Some(8));
        assert_eq!(host.node(id).map(|n| n.shader.as_str()), Some("shell"));
        assert_eq!(host.node(id).map(|n| n.material.to_bytes().len()), Some(64));
        assert!(host.spawn_node(spawn).unwrap_err().is_resource_allocation());
        host.despawn_node(id);
        assert_eq!(host.live_nodes(), 0);
    }
}
