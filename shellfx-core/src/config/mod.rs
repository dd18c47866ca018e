pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use schema::EffectsConfig;

/// Parse, clamp and validate a YAML effects document.
pub fn load_from_yaml_str(s: &str) -> Result<EffectsConfig> {
    let cfg: EffectsConfig = serde_yaml::from_str(s)?;
    finish(cfg)
}

pub fn load_from_json_str(s: &str) -> Result<EffectsConfig> {
    let cfg: EffectsConfig = serde_json::from_str(s)?;
    finish(cfg)
}

/// `.json` files are read as JSON, everything else as YAML.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<EffectsConfig> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let cfg = if is_json { load_from_json_str(&data) } else { load_from_yaml_str(&data) };
    cfg.with_context(|| format!("loading {}", path.display()))
}

fn finish(cfg: EffectsConfig) -> Result<EffectsConfig> {
    let cfg = cfg.sanitized();
    cfg.shells.params.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fxaa::PassProfile;
    use crate::shell::ShellOrientation;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(load_from_yaml_str("{}").unwrap(), EffectsConfig::default());
    }

    #[test]
    fn partial_yaml_is_merged_and_clamped() {
        let cfg = load_from_yaml_str(
            r#"
fxaa:
  contrast_threshold: 0.5
  passes: single
shells:
  orientation: tilted90
  params:
    shell_count: 32
    density: 250
    displacement_direction: [0.0, -3.0, 0.0]
  motion:
    velocity: 4.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.fxaa.contrast_threshold, 0.0833);
        assert_eq!(cfg.fxaa.passes, PassProfile::Single);
        assert_eq!(cfg.shells.orientation, ShellOrientation::Tilted90);
        assert_eq!(cfg.shells.params.shell_count, 32);
        assert_eq!(cfg.shells.params.density, 250.0);
        assert_eq!(cfg.shells.params.displacement_direction.y, -1.0);
        assert_eq!(cfg.shells.params.shell_length, 0.15);
        assert!(cfg.shells.motion.enabled);
        assert_eq!(cfg.shells.motion.velocity, 4.0);
    }

    #[test]
    fn out_of_range_count_is_rejected() {
        assert!(load_from_yaml_str("shells: { params: { shell_count: 300 } }").is_err());
    }

    #[test]
    fn json_round_trips_through_the_same_schema() {
        let cfg = EffectsConfig::default();
        let text = serde_json::to_string(&cfg).unwrap();
        assert_eq!(load_from_json_str(&text).unwrap(), cfg);
    }
}
