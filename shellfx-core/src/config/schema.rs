use serde::{Deserialize, Serialize};

use crate::fxaa::FxaaSettings;
use crate::shell::ShellStackConfig;

/// Top-level effects document. Every section and field is optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub fxaa: FxaaSettings,
    pub shells: ShellStackConfig,
}

impl EffectsConfig {
    pub fn sanitized(self) -> Self {
        Self { fxaa: self.fxaa.sanitized(), shells: self.shells.sanitized() }
    }
}
