//! FXAA post-process pass.
//!
//! Two-stage by default: pass 0 extracts luminance into a frame-scoped
//! `R16Float` temporary, pass 1 blends along detected edges reading both the
//! source and that temporary. Thresholds are pushed before every frame so
//! edits land on the next frame.

pub mod kernel;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};
use crate::host::{MaterialId, RenderHost, ShaderHandle, TemporaryTexture, TextureDesc, TextureFormat, TextureId};

pub const LUMINANCE_PASS: u32 = 0;
pub const BLEND_PASS: u32 = 1;

/// Uniform names understood by the FXAA shader.
pub mod uniforms {
    pub const CONTRAST_THRESHOLD: &str = "_ContrastThreshold";
    pub const RELATIVE_THRESHOLD: &str = "_RelativeThreshold";
    pub const SUBPIXEL_BLENDING: &str = "_SubpixelBlending";
    pub const LUMINANCE_TEX: &str = "_LuminanceTex";
}

pub const CONTRAST_THRESHOLD_RANGE: (f32, f32) = (0.0312, 0.0833);
pub const RELATIVE_THRESHOLD_RANGE: (f32, f32) = (0.063, 0.333);
pub const SUBPIXEL_BLENDING_RANGE: (f32, f32) = (0.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassProfile {
    /// Luminance pre-pass + blend, thresholds pushed every frame.
    #[default]
    Two,
    /// Blend only; the shader derives luminance itself and thresholds are
    /// pushed once, at activation or on the first frame after switching to
    /// this profile while active.
    Single,
}

impl PassProfile {
    pub fn pass_count(self) -> u32 {
        match self {
            PassProfile::Two => 2,
            PassProfile::Single => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxaaSettings {
    pub contrast_threshold: f32,
    pub relative_threshold: f32,
    pub subpixel_blending: f32,
    pub passes: PassProfile,
}

impl Default for FxaaSettings {
    fn default() -> Self {
        Self {
            contrast_threshold: 0.0312,
            relative_threshold: 0.063,
            subpixel_blending: 1.0,
            passes: PassProfile::Two,
        }
    }
}

fn clamp_finite(v: f32, (lo, hi): (f32, f32)) -> f32 {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

impl FxaaSettings {
    /// Clamp every threshold into its valid range.
    pub fn sanitized(self) -> Self {
        Self {
            contrast_threshold: clamp_finite(self.contrast_threshold, CONTRAST_THRESHOLD_RANGE),
            relative_threshold: clamp_finite(self.relative_threshold, RELATIVE_THRESHOLD_RANGE),
            subpixel_blending: clamp_finite(self.subpixel_blending, SUBPIXEL_BLENDING_RANGE),
            passes: self.passes,
        }
    }
}

/// Post-process pass owning one effect material while active.
#[derive(Debug)]
pub struct AntiAliasPass {
    shader: Option<ShaderHandle>,
    settings: FxaaSettings,
    material: Option<MaterialId>,
    /// Single profile only: thresholds still owed to the live material.
    push_pending: bool,
}

impl AntiAliasPass {
    pub fn new(shader: Option<ShaderHandle>, settings: FxaaSettings) -> Self {
        Self { shader, settings: settings.sanitized(), material: None, push_pending: false }
    }

    pub fn settings(&self) -> &FxaaSettings { &self.settings }
    pub fn is_active(&self) -> bool { self.material.is_some() }
    pub fn material(&self) -> Option<MaterialId> { self.material }

    /// Rebind the shader. Takes effect on the next activation.
    pub fn set_shader(&mut self, shader: Option<ShaderHandle>) { self.shader = shader; }

    /// Edit the settings in place; values are clamped before they are stored.
    pub fn edit(&mut self, f: impl FnOnce(&mut FxaaSettings)) {
        let mut next = self.settings;
        f(&mut next);
        let next = next.sanitized();
        if self.material.is_some() && next.passes == PassProfile::Single && self.settings.passes != PassProfile::Single {
            self.push_pending = true;
        }
        self.settings = next;
    }

    pub fn activate<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> FxResult<()> {
        if self.material.is_some() {
            return Err(FxError::InvalidState("anti-alias pass is already active"));
        }
        let shader = self.shader.as_ref().ok_or_else(|| FxError::config("no FXAA shader bound"))?;
        let material = host.create_material(shader)?;
        if self.settings.passes == PassProfile::Single {
            self.push_thresholds(host, material);
        }
        self.push_pending = false;
        debug!("fxaa: activated with shader '{}' ({} pass)", shader, self.settings.passes.pass_count());
        self.material = Some(material);
        Ok(())
    }

    pub fn deactivate<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(material) = self.material.take() {
            host.destroy_material(material);
            debug!("fxaa: deactivated");
        }
    }

    /// Anti-alias `source` into `destination`. `source` is only read.
    pub fn apply<H: RenderHost + ?Sized>(&mut self, host: &mut H, source: TextureId, destination: TextureId) -> FxResult<()> {
        let material = self.material.ok_or(FxError::InvalidState("anti-alias pass is not active"))?;
        let (width, height) = host
            .texture_size(source)
            .ok_or_else(|| FxError::MissingResource(format!("source texture {:?}", source)))?;
        trace!("fxaa: apply {}x{}", width, height);

        match self.settings.passes {
            PassProfile::Single => {
                if self.push_pending {
                    self.push_thresholds(host, material);
                    self.push_pending = false;
                }
                host.blit(source, destination, material, BLEND_PASS)
            }
            PassProfile::Two => {
                self.push_thresholds(host, material);
                let mut luma = TemporaryTexture::acquire(host, TextureDesc { width, height, format: TextureFormat::R16Float })?;
                let luma_id = luma.id();
                let host = luma.host();
                host.blit(source, luma_id, material, LUMINANCE_PASS)?;
                host.set_texture(material, uniforms::LUMINANCE_TEX, luma_id);
                let result = host.blit(source, destination, material, BLEND_PASS);
                host.clear_texture(material, uniforms::LUMINANCE_TEX);
                result
            }
        }
    }

    fn push_thresholds<H: RenderHost + ?Sized>(&self, host: &mut H, material: MaterialId) {
        host.set_float(material, uniforms::CONTRAST_THRESHOLD, self.settings.contrast_threshold);
        host.set_float(material, uniforms::RELATIVE_THRESHOLD, self.settings.relative_threshold);
        host.set_float(material, uniforms::SUBPIXEL_BLENDING, self.settings.subpixel_blending);
    }
}
