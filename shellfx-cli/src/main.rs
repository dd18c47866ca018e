use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shellfx_core::config::{self, schema::EffectsConfig};
use shellfx_core::fxaa::{AntiAliasPass, PassProfile};
use shellfx_core::host::software::SoftwareHost;
use shellfx_core::host::{InputState, MeshHandle, ShaderHandle};
use shellfx_core::mesh::{generate_plane, generate_uv_sphere, Mesh};
use shellfx_core::shell::ShellStackController;
use shellfx_core::VERSION;

#[derive(Parser, Debug)]
#[command(name = "shellfx", version = VERSION, about = "FXAA and shell texturing controllers on a software host")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BaseMesh {
    Plane,
    Sphere,
}

impl BaseMesh {
    fn build(self) -> Mesh {
        match self {
            BaseMesh::Plane => generate_plane(2.0, 16),
            BaseMesh::Sphere => generate_uv_sphere(1.0, 24, 32),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load an effects config (YAML or JSON) and print the effective values
    Inspect { path: String },
    /// Anti-alias a PNG through the software FXAA program
    Fxaa {
        #[arg(long)]
        input: String,
        #[arg(long, default_value = "fxaa.png")]
        output: String,
        #[arg(long)]
        config: Option<String>,
        /// Blend pass only, no luminance pre-pass
        #[arg(long)]
        single_pass: bool,
        #[arg(long)]
        contrast_threshold: Option<f32>,
        #[arg(long)]
        relative_threshold: Option<f32>,
        #[arg(long)]
        subpixel_blending: Option<f32>,
    },
    /// Activate a shell stack and list the generated shells
    Stack {
        #[arg(long)]
        config: Option<String>,
        #[arg(long, value_enum, default_value_t = BaseMesh::Plane)]
        mesh: BaseMesh,
    },
    /// Tick a shell stack with scripted input and print the displacement
    Simulate {
        #[arg(long)]
        config: Option<String>,
        #[arg(long, default_value_t = 20)]
        frames: u32,
        #[arg(long, default_value_t = 0.1)]
        dt: f32,
        /// Axes held at the start, e.g. "forward,left"
        #[arg(long, default_value = "")]
        hold: String,
        /// How many frames the axes stay held
        #[arg(long, default_value_t = 0)]
        hold_frames: u32,
        /// One JSON object per frame instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&str>) -> Result<EffectsConfig> {
    let cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None => EffectsConfig::default(),
    };
    log::debug!("effective config: {:?}", cfg);
    Ok(cfg)
}

fn stack_controller(cfg: &EffectsConfig, mesh: BaseMesh) -> ShellStackController {
    ShellStackController::new(cfg.shells, Some(MeshHandle::new(mesh.build())), Some(ShaderHandle::new("shell")))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect { path } => {
            let cfg = config::load_from_path(&path)?;
            let f = &cfg.fxaa;
            let s = &cfg.shells;
            let p = &s.params;
            println!("Loaded config: {}", path);
            println!("  fxaa: {} pass", f.passes.pass_count());
            println!("    contrast={:.4}, relative={:.4}, subpixel={:.2}", f.contrast_threshold, f.relative_threshold, f.subpixel_blending);
            println!("  shells: {} (orientation={:?})", p.shell_count, s.orientation);
            println!("    length={:.3}, density={:.1}, noise_bias={:.2}, thickness={:.2}", p.shell_length, p.density, p.noise_bias, p.thickness);
            println!("    color={:?}, attenuation={:.2}", p.shell_color, p.occlusion_attenuation);
            println!("    direction={:?}, update_statics={}", p.displacement_direction.to_array(), p.update_statics);
            println!("  motion: enabled={}, velocity={:.2}", s.motion.enabled, s.motion.velocity);
        }
        Command::Fxaa { input, output, config, single_pass, contrast_threshold, relative_threshold, subpixel_blending } => {
            let cfg = load_config(config.as_deref())?;
            let img = image::open(&input).with_context(|| format!("opening {}", input))?.to_rgba8();
            let (width, height) = img.dimensions();
            let pixels = img
                .pixels()
                .map(|p| [p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0, p[3] as f32 / 255.0])
                .collect();

            let mut host = SoftwareHost::new();
            let source = host.upload(width, height, pixels)?;
            let destination = host.create_target(width, height);

            let mut pass = AntiAliasPass::new(Some(ShaderHandle::new("fxaa")), cfg.fxaa);
            pass.edit(|s| {
                if single_pass { s.passes = PassProfile::Single; }
                if let Some(v) = contrast_threshold { s.contrast_threshold = v; }
                if let Some(v) = relative_threshold { s.relative_threshold = v; }
                if let Some(v) = subpixel_blending { s.subpixel_blending = v; }
            });
            pass.activate(&mut host)?;
            pass.apply(&mut host, source, destination)?;
            pass.deactivate(&mut host);

            let out_px = host.pixels(destination).ok_or_else(|| anyhow!("destination texture vanished"))?;
            let raw: Vec<u8> = out_px.iter().flat_map(|c| c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)).collect();
            let out = image::RgbaImage::from_raw(width, height, raw)
                .ok_or_else(|| anyhow!("Failed to create image from raw"))?;
            out.save(&output)?;
            println!("Wrote {}x{} image to {} ({} pass)", width, height, output, pass.settings().passes.pass_count());
        }
        Command::Stack { config, mesh } => {
            let cfg = load_config(config.as_deref())?;
            let mut host = SoftwareHost::new();
            let mut stack = stack_controller(&cfg, mesh);
            stack.activate(&mut host)?;
            let material = stack.material().ok_or_else(|| anyhow!("stack did not activate"))?;
            println!(
                "Activated {} shells on {:?} mesh ({} triangles each), uniform block {} bytes",
                stack.shells().len(),
                mesh,
                stack.shells().first().map(|s| s.mesh().mesh().triangle_count()).unwrap_or(0),
                material.to_bytes().len()
            );
            for shell in stack.shells() {
                let node = host.node(shell.node());
                println!(
                    "  [{:>3}] height={:.4} offset={:.4} node={}",
                    shell.index(),
                    shell.height(),
                    shell.height() * cfg.shells.params.shell_length,
                    node.map(|n| n.name.as_str()).unwrap_or("?")
                );
            }
            stack.deactivate(&mut host);
        }
        Command::Simulate { config, frames, dt, hold, hold_frames, json } => {
            let cfg = load_config(config.as_deref())?;
            let held = InputState::parse_axes(&hold).ok_or_else(|| anyhow!("unknown axis in '{}'", hold))?;
            let mut host = SoftwareHost::new();
            let mut stack = stack_controller(&cfg, BaseMesh::Plane);
            stack.activate(&mut host)?;
            for frame in 0..frames {
                let input = if frame < hold_frames { held } else { InputState::empty() };
                stack.tick(dt, input);
                let pos = stack.position();
                let dir = stack.displacement();
                if json {
                    let line = serde_json::json!({
                        "frame": frame,
                        "input": format!("{:?}", input),
                        "position": pos.to_array(),
                        "displacement": dir.to_array(),
                        "magnitude": dir.length(),
                    });
                    println!("{}", line);
                } else {
                    println!(
                        "{:>4}  pos=({:+.3}, {:+.3}, {:+.3})  disp=({:+.3}, {:+.3}, {:+.3})  |d|={:.3}",
                        frame, pos.x, pos.y, pos.z, dir.x, dir.y, dir.z, dir.length()
                    );
                }
            }
            stack.deactivate(&mut host);
        }
    }
    Ok(())
}
