use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

pub const SHELL_COUNT_RANGE: (u32, u32) = (1, 256);
pub const SHELL_LENGTH_RANGE: (f32, f32) = (0.0, 1.0);
pub const DENSITY_RANGE: (f32, f32) = (1.0, 1000.0);
pub const NOISE_BIAS_RANGE: (f32, f32) = (-1.0, 1.0);
pub const THICKNESS_RANGE: (f32, f32) = (0.0, 10.0);
pub const ATTENUATION_RANGE: (f32, f32) = (0.0, 5.0);

/// Shape parameters shared by every shell of a stack, plus the displacement
/// seed and the static push switch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellStackParameters {
    pub shell_count: u32,
    pub shell_length: f32,
    pub density: f32,
    pub noise_bias: f32,
    pub thickness: f32,
    pub shell_color: [f32; 4],
    pub occlusion_attenuation: f32,
    pub displacement_direction: Vec3,
    /// Re-push the static block every tick (live editing).
    pub update_statics: bool,
}

impl Default for ShellStackParameters {
    fn default() -> Self {
        Self {
            shell_count: 16,
            shell_length: 0.15,
            density: 100.0,
            noise_bias: 0.0,
            thickness: 1.0,
            shell_color: [0.36, 0.62, 0.2, 1.0],
            occlusion_attenuation: 1.0,
            displacement_direction: Vec3::ZERO,
            update_statics: true,
        }
    }
}

fn clamp_range(v: f32, (lo, hi): (f32, f32)) -> f32 {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

/// Rescale to unit length when longer than 1; non-finite vectors become zero.
pub fn clamp_unit(v: Vec3) -> Vec3 {
    if !v.is_finite() {
        Vec3::ZERO
    } else if v.length_squared() > 1.0 {
        v.normalize()
    } else {
        v
    }
}

impl ShellStackParameters {
    /// Clamp every float field into range. `shell_count` is left as is;
    /// see [`ShellStackParameters::validate`].
    pub fn sanitized(self) -> Self {
        Self {
            shell_count: self.shell_count,
            shell_length: clamp_range(self.shell_length, SHELL_LENGTH_RANGE),
            density: clamp_range(self.density, DENSITY_RANGE),
            noise_bias: clamp_range(self.noise_bias, NOISE_BIAS_RANGE),
            thickness: clamp_range(self.thickness, THICKNESS_RANGE),
            shell_color: self.shell_color.map(|c| if c.is_finite() { c } else { 0.0 }),
            occlusion_attenuation: clamp_range(self.occlusion_attenuation, ATTENUATION_RANGE),
            displacement_direction: clamp_unit(self.displacement_direction),
            update_statics: self.update_statics,
        }
    }

    pub fn validate(&self) -> FxResult<()> {
        let (lo, hi) = SHELL_COUNT_RANGE;
        if !(lo..=hi).contains(&self.shell_count) {
            return Err(FxError::config(format!("shell_count {} outside [{lo}, {hi}]", self.shell_count)));
        }
        Ok(())
    }
}

/// Stack-wide shell rotation. Both conventions exist in the field; neither is
/// the default for every mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellOrientation {
    /// 90 degrees about X, for meshes authored lying in XY.
    Tilted90,
    #[default]
    Upright,
}

impl ShellOrientation {
    pub fn rotation(self) -> Quat {
        match self {
            ShellOrientation::Tilted90 => Quat::from_rotation_x(90f32.to_radians()),
            ShellOrientation::Upright => Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Input-driven displacement integration (the advanced variant).
    pub enabled: bool,
    /// World units per second.
    pub velocity: f32,
}

impl Default for MotionConfig {
    fn default() -> Self { Self { enabled: true, velocity: 1.0 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellStackConfig {
    pub params: ShellStackParameters,
    pub orientation: ShellOrientation,
    pub motion: MotionConfig,
}

impl ShellStackConfig {
    pub fn sanitized(self) -> Self {
        Self {
            params: self.params.sanitized(),
            orientation: self.orientation,
            motion: MotionConfig {
                enabled: self.motion.enabled,
                velocity: if self.motion.velocity.is_finite() { self.motion.velocity.max(0.0) } else { 0.0 },
            },
        }
    }
}
