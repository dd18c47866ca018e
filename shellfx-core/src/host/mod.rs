//! Host collaborator contract.
//!
//! The controllers in this crate never talk to a GPU directly. Everything the
//! engine owns (materials, render textures, scene nodes, shader programs) is
//! reached through the traits below, so the same controller code runs against
//! a real engine binding or the in-memory [`software::SoftwareHost`].

pub mod software;

use std::fmt;
use std::rc::Rc;

use glam::Quat;

use crate::error::FxResult;
use crate::mesh::Mesh;
use crate::shell::SharedShellMaterial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Opaque shader program reference, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderHandle { name: String }

impl ShaderHandle {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }
    pub fn name(&self) -> &str { &self.name }
}

impl fmt::Display for ShaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

/// Read-only reference to host-owned vertex/index data.
#[derive(Debug, Clone)]
pub struct MeshHandle(Rc<Mesh>);

impl MeshHandle {
    pub fn new(mesh: Mesh) -> Self { Self(Rc::new(mesh)) }
    pub fn mesh(&self) -> &Mesh { &self.0 }
    pub fn same_as(&self, other: &MeshHandle) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba16Float,
    /// Single channel half float; the luminance target.
    R16Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Render-side services: materials, transient targets and full-screen blits.
pub trait RenderHost {
    fn create_material(&mut self, shader: &ShaderHandle) -> FxResult<MaterialId>;
    fn destroy_material(&mut self, material: MaterialId);

    fn set_float(&mut self, material: MaterialId, name: &str, value: f32);
    fn set_texture(&mut self, material: MaterialId, name: &str, texture: TextureId);
    fn clear_texture(&mut self, material: MaterialId, name: &str);

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)>;
    fn acquire_temporary(&mut self, desc: TextureDesc) -> FxResult<TextureId>;
    fn release_temporary(&mut self, texture: TextureId);

    /// Run `pass` of the material's shader reading `source`, writing `dest`.
    fn blit(&mut self, source: TextureId, dest: TextureId, material: MaterialId, pass: u32) -> FxResult<()>;
}

/// Frame-scoped temporary texture; released when dropped, on every exit path.
pub struct TemporaryTexture<'a, H: RenderHost + ?Sized> {
    host: &'a mut H,
    id: TextureId,
}

impl<'a, H: RenderHost + ?Sized> TemporaryTexture<'a, H> {
    pub fn acquire(host: &'a mut H, desc: TextureDesc) -> FxResult<Self> {
        let id = host.acquire_temporary(desc)?;
        Ok(Self { host, id })
    }

    pub fn id(&self) -> TextureId { self.id }

    /// The host stays usable while the temporary is held.
    pub fn host(&mut self) -> &mut H { &mut *self.host }
}

impl<H: RenderHost + ?Sized> Drop for TemporaryTexture<'_, H> {
    fn drop(&mut self) {
        self.host.release_temporary(self.id);
    }
}

/// Everything a host needs to create one scene node for a shell.
#[derive(Debug, Clone)]
pub struct NodeSpawn<'a> {
    pub name: String,
    pub mesh: &'a MeshHandle,
    /// The stack's shared record. Every node gets a clone of the same handle;
    /// bind its shader once and re-upload [`SharedShellMaterial::to_bytes`]
    /// each frame, after the controller's `tick`.
    pub material: &'a SharedShellMaterial,
    pub rotation: Quat,
    /// Value for the per-draw `_ShellIndex` uniform.
    pub shell_index: u32,
}

/// Scene-side services: the host owns the node, the controller owns the shell.
///
/// Uniform data never flows through this trait. A host keeps the material
/// handle from [`NodeSpawn::material`] and reads the block from it when it
/// draws.
pub trait SceneHost {
    fn spawn_node(&mut self, spawn: NodeSpawn<'_>) -> FxResult<NodeId>;
    fn despawn_node(&mut self, node: NodeId);
}

bitflags::bitflags! {
    /// Per-frame snapshot of the six logical movement axes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InputState: u8 {
        const FORWARD = 1 << 0;
        const BACK = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
    }
}

impl InputState {
    /// Parse a comma separated axis list such as `"forward,left"`.
    pub fn parse_axes(s: &str) -> Option<Self> {
        let mut out = InputState::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            out |= match part.to_ascii_lowercase().as_str() {
                "forward" | "w" => InputState::FORWARD,
                "back" | "s" => InputState::BACK,
                "left" | "a" => InputState::LEFT,
                "right" | "d" => InputState::RIGHT,
                "up" | "e" => InputState::UP,
                "down" | "q" => InputState::DOWN,
                _ => return None,
            };
        }
        Some(out)
    }
}
