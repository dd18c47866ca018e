pub mod config;
pub mod error;
pub mod fxaa;
pub mod host;
pub mod mesh;
pub mod shell;

pub use error::{FxError, FxResult};
pub use fxaa::{AntiAliasPass, FxaaSettings, PassProfile};
pub use shell::{ShellStackController, ShellStackParameters, StackState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
