//! Shell texturing controller.
//!
//! A stack is `shell_count` copies of a base mesh, each tagged with a 1-based
//! index so the shader can tell generated shells from the base surface
//! (index 0). Every shell holds the same [`SharedShellMaterial`]; parameters
//! travel on two channels:
//!
//! - static: the shape block, re-pushed each tick only when
//!   `update_statics` is set;
//! - dynamic: the displacement vector, pushed every tick.

pub mod material;
pub mod motion;
pub mod params;

use glam::{Quat, Vec3};
use log::{debug, trace, warn};

use crate::error::{FxError, FxResult};
use crate::host::{InputState, MeshHandle, NodeId, NodeSpawn, SceneHost, ShaderHandle};

pub use material::{ShellUniforms, SharedShellMaterial};
pub use motion::MotionState;
pub use params::{MotionConfig, ShellOrientation, ShellStackConfig, ShellStackParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Inactive,
    Active,
}

/// One generated shell. Holds its material handle directly.
#[derive(Debug, Clone)]
pub struct ShellInstance {
    index: u32,
    stack_size: u32,
    node: NodeId,
    mesh: MeshHandle,
    material: SharedShellMaterial,
    rotation: Quat,
}

impl ShellInstance {
    /// 1-based; 0 is the base mesh itself.
    pub fn index(&self) -> u32 { self.index }
    pub fn node(&self) -> NodeId { self.node }
    pub fn mesh(&self) -> &MeshHandle { &self.mesh }
    pub fn material(&self) -> &SharedShellMaterial { &self.material }
    pub fn rotation(&self) -> Quat { self.rotation }

    /// Normalized extrusion height in (0, 1].
    pub fn height(&self) -> f32 { self.index as f32 / self.stack_size as f32 }

    /// Snapshot of the shared block as this shell sees it.
    pub fn uniforms(&self) -> ShellUniforms { self.material.uniforms() }
}

#[derive(Debug)]
struct ActiveStack {
    material: SharedShellMaterial,
    shells: Vec<ShellInstance>,
}

#[derive(Debug)]
pub struct ShellStackController {
    config: ShellStackConfig,
    mesh: Option<MeshHandle>,
    shader: Option<ShaderHandle>,
    motion: MotionState,
    stack: Option<ActiveStack>,
}

impl ShellStackController {
    pub fn new(config: ShellStackConfig, mesh: Option<MeshHandle>, shader: Option<ShaderHandle>) -> Self {
        let config = config.sanitized();
        Self { motion: MotionState::new(config.params.displacement_direction), config, mesh, shader, stack: None }
    }

    pub fn state(&self) -> StackState {
        if self.stack.is_some() { StackState::Active } else { StackState::Inactive }
    }

    pub fn config(&self) -> &ShellStackConfig { &self.config }
    pub fn params(&self) -> &ShellStackParameters { &self.config.params }
    pub fn position(&self) -> Vec3 { self.motion.position }
    pub fn displacement(&self) -> Vec3 { self.motion.displacement }

    pub fn shells(&self) -> &[ShellInstance] {
        self.stack.as_ref().map(|s| s.shells.as_slice()).unwrap_or(&[])
    }

    pub fn material(&self) -> Option<&SharedShellMaterial> { self.stack.as_ref().map(|s| &s.material) }

    /// Bindings and stack-wide knobs apply from the next activation.
    pub fn bind_mesh(&mut self, mesh: Option<MeshHandle>) { self.mesh = mesh; }
    pub fn bind_shader(&mut self, shader: Option<ShaderHandle>) { self.shader = shader; }
    pub fn set_orientation(&mut self, orientation: ShellOrientation) { self.config.orientation = orientation; }

    pub fn set_motion(&mut self, motion: MotionConfig) {
        self.config.motion = ShellStackConfig { motion, ..self.config }.sanitized().motion;
    }

    /// The single configuration write path. Floats are clamped; an
    /// out-of-range `shell_count` rejects the whole edit, as does any count
    /// change while the stack is active (the live array is sized by it).
    pub fn edit(&mut self, f: impl FnOnce(&mut ShellStackParameters)) -> FxResult<()> {
        let mut next = self.config.params;
        f(&mut next);
        if let Err(e) = next.validate() {
            warn!("shell stack: rejected edit: {e}");
            return Err(e);
        }
        if self.stack.is_some() && next.shell_count != self.config.params.shell_count {
            warn!(
                "shell stack: rejected shell_count {} while {} shells are live",
                next.shell_count, self.config.params.shell_count
            );
            return Err(FxError::InvalidState("shell_count cannot change while the stack is active"));
        }
        let next = next.sanitized();
        if next.displacement_direction != self.config.params.displacement_direction {
            self.motion.displacement = next.displacement_direction;
        }
        self.config.params = next;
        Ok(())
    }

    pub fn activate<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> FxResult<()> {
        if self.stack.is_some() {
            return Err(FxError::InvalidState("shell stack is already active"));
        }
        self.config.params.validate()?;
        let mesh = self.mesh.clone().ok_or_else(|| FxError::config("no base mesh bound"))?;
        let shader = self.shader.clone().ok_or_else(|| FxError::config("no shell shader bound"))?;

        let material = SharedShellMaterial::new(shader);
        material.write_statics(&self.config.params);
        material.write_direction(self.motion.displacement);

        let count = self.config.params.shell_count;
        let rotation = self.config.orientation.rotation();
        let mut shells = Vec::with_capacity(count as usize);
        for i in 0..count {
            let index = i + 1;
            let spawn = NodeSpawn { name: format!("Shell {index}"), mesh: &mesh, material: &material, rotation, shell_index: index };
            match host.spawn_node(spawn) {
                Ok(node) => shells.push(ShellInstance {
                    index,
                    stack_size: count,
                    node,
                    mesh: mesh.clone(),
                    material: material.clone(),
                    rotation,
                }),
                Err(e) => {
                    warn!("shell stack: spawning shell {index}/{count} failed: {e}");
                    for shell in shells.drain(..) {
                        host.despawn_node(shell.node);
                    }
                    return Err(e);
                }
            }
        }

        debug!("shell stack: activated {} shells ({:?})", count, self.config.orientation);
        self.stack = Some(ActiveStack { material, shells });
        Ok(())
    }

    pub fn deactivate<H: SceneHost + ?Sized>(&mut self, host: &mut H) {
        let Some(stack) = self.stack.take() else { return };
        let count = stack.shells.len();
        for shell in stack.shells {
            host.despawn_node(shell.node);
        }
        debug!("shell stack: deactivated {count} shells");
    }

    /// Per-frame update. Does nothing while inactive.
    pub fn tick(&mut self, elapsed_seconds: f32, input: InputState) {
        let Some(stack) = &self.stack else { return };
        let dt = if elapsed_seconds.is_finite() { elapsed_seconds.max(0.0) } else { 0.0 };

        if self.config.params.update_statics {
            stack.material.write_statics(&self.config.params);
        }
        if self.config.motion.enabled {
            self.motion.integrate(dt, input, self.config.motion.velocity);
        }
        stack.material.write_direction(self.motion.displacement);
        trace!("shell stack: tick dt={dt:.4} displacement={:?}", self.motion.displacement);
    }
}

impl Default for ShellStackController {
    fn default() -> Self { Self::new(ShellStackConfig::default(), None, None) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::software::SoftwareHost;
    use crate::mesh::generate_plane;

    fn controller(count: u32) -> ShellStackController {
        let config = ShellStackConfig {
            params: ShellStackParameters { shell_count: count, ..Default::default() },
            ..Default::default()
        };
        ShellStackController::new(config, Some(MeshHandle::new(generate_plane(1.0, 2))), Some(ShaderHandle::new("shell")))
    }

    #[test]
    fn activate_builds_indexed_shells() {
        let mut host = SoftwareHost::new();
        let mut c = controller(4);
        c.activate(&mut host).unwrap();
        assert_eq!(c.state(), StackState::Active);
        let idx: Vec<u32> = c.shells().iter().map(|s| s.index()).collect();
        assert_eq!(idx, vec![1, 2, 3, 4]);
        assert_eq!(c.shells()[3].height(), 1.0);
        assert_eq!(host.live_nodes(), 4);
        assert_eq!(host.node(c.shells()[0].node()).map(|n| n.name.as_str()), Some("Shell 1"));
    }

    #[test]
    fn shells_share_mesh_and_material() {
        let mut host = SoftwareHost::new();
        let mut c = controller(3);
        c.activate(&mut host).unwrap();
        let first = &c.shells()[0];
        for s in c.shells() {
            assert!(s.material().same_as(first.material()));
            assert!(s.mesh().same_as(first.mesh()));
        }
    }

    #[test]
    fn missing_bindings_fail_activation() {
        let mut host = SoftwareHost::new();
        let mut c = controller(2);
        c.bind_mesh(None);
        assert!(c.activate(&mut host).unwrap_err().is_configuration());
        c.bind_mesh(Some(MeshHandle::new(generate_plane(1.0, 1))));
        c.bind_shader(None);
        assert!(c.activate(&mut host).unwrap_err().is_configuration());
        assert_eq!(c.state(), StackState::Inactive);
        assert_eq!(host.live_nodes(), 0);
    }

    #[test]
    fn activate_twice_is_refused() {
        let mut host = SoftwareHost::new();
        let mut c = controller(2);
        c.activate(&mut host).unwrap();
        assert!(matches!(c.activate(&mut host), Err(FxError::InvalidState(_))));
        assert_eq!(host.live_nodes(), 2);
    }

    #[test]
    fn failed_spawn_rolls_back() {
        let mut host = SoftwareHost::new().with_node_budget(5);
        let mut c = controller(8);
        assert!(c.activate(&mut host).unwrap_err().is_resource_allocation());
        assert_eq!(c.state(), StackState::Inactive);
        assert!(c.shells().is_empty());
        assert_eq!(host.live_nodes(), 0);
    }

    #[test]
    fn orientation_applies_to_every_shell() {
        let mut host = SoftwareHost::new();
        let mut c = controller(2);
        c.set_orientation(ShellOrientation::Tilted90);
        c.activate(&mut host).unwrap();
        let expected = ShellOrientation::Tilted90.rotation();
        assert!(c.shells().iter().all(|s| s.rotation() == expected));
        assert!(host.nodes().all(|(_, n)| n.rotation == expected));
    }

    #[test]
    fn edit_rejects_bad_count_and_keeps_previous() {
        let mut c = controller(4);
        assert!(c.edit(|p| p.shell_count = 0).is_err());
        assert_eq!(c.params().shell_count, 4);
        c.edit(|p| p.density = 5000.0).unwrap();
        assert_eq!(c.params().density, 1000.0);
    }

    #[test]
    fn count_change_while_active_is_refused() {
        let mut host = SoftwareHost::new();
        let mut c = controller(16);
        c.activate(&mut host).unwrap();
        assert!(matches!(c.edit(|p| p.shell_count = 32), Err(FxError::InvalidState(_))));
        c.tick(0.016, InputState::empty());
        assert_eq!(c.params().shell_count, 16);
        assert_eq!(c.shells().len(), 16);
        assert_eq!(c.material().unwrap().uniforms().shell_count, 16);
        // same count plus other fields is still a normal edit
        c.edit(|p| { p.shell_count = 16; p.thickness = 0.5; }).unwrap();
        assert_eq!(c.params().thickness, 0.5);
    }

    #[test]
    fn shells_receive_the_shared_material() {
        let mut host = SoftwareHost::new();
        let mut c = controller(3);
        c.activate(&mut host).unwrap();
        let material = c.material().unwrap();
        assert_eq!(material.shader().name(), "shell");
        for shell in c.shells() {
            let node = host.node(shell.node()).unwrap();
            assert!(node.material.same_as(material));
            assert_eq!(node.shader, "shell");
        }
    }

    #[test]
    fn edit_of_direction_reseeds_displacement() {
        let mut c = controller(1);
        c.edit(|p| p.displacement_direction = Vec3::new(0.0, 2.0, 0.0)).unwrap();
        assert_eq!(c.displacement(), Vec3::Y);
    }

    #[test]
    fn tick_while_inactive_is_a_no_op() {
        let mut c = controller(2);
        c.tick(0.1, InputState::empty());
        assert_eq!(c.displacement(), Vec3::ZERO);
        assert!(c.material().is_none());
    }

    #[test]
    fn disabled_motion_keeps_configured_direction() {
        let mut host = SoftwareHost::new();
        let mut c = controller(2);
        c.set_motion(MotionConfig { enabled: false, velocity: 1.0 });
        c.edit(|p| p.displacement_direction = Vec3::new(0.3, 0.0, 0.0)).unwrap();
        c.activate(&mut host).unwrap();
        c.tick(0.5, InputState::FORWARD);
        assert_eq!(c.material().unwrap().direction(), Vec3::new(0.3, 0.0, 0.0));
        assert_eq!(c.position(), Vec3::ZERO);
    }

    #[test]
    fn reactivation_starts_from_a_fresh_array() {
        let mut host = SoftwareHost::new();
        let mut c = controller(3);
        c.activate(&mut host).unwrap();
        c.deactivate(&mut host);
        c.edit(|p| p.shell_count = 5).unwrap();
        c.activate(&mut host).unwrap();
        assert_eq!(c.shells().len(), 5);
        assert_eq!(host.live_nodes(), 5);
        assert_eq!(c.shells()[4].height(), 1.0);
    }
}
