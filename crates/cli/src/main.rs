#![deny(unsafe_code)]
//! CLI for the vidgl frame pipeline.
//!
//! Subcommands:
//! - `trace`: run drawer setup, N frames and release against the recording
//!   driver and print the GL call sequence
//! - `shaders`: print the blur shader sources

mod error;

use clap::{Parser, Subcommand, ValueEnum};
use error::CliError;
use std::process;
use tracing_subscriber::EnvFilter;
use vidgl_core::blur::{blur_fragment_shader, BLUR_VERTEX_SHADER};
use vidgl_core::{
    DrawerConfig, FrameDrawer, GlCall, RecordingDriver, RenderError, ShaderStage, TextureTarget,
};

#[derive(Parser)]
#[command(name = "vidgl", about = "GL call tracer for the vidgl video pipeline")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Stage {
    Vertex,
    Fragment,
}

impl From<Stage> for ShaderStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Vertex => ShaderStage::Vertex,
            Stage::Fragment => ShaderStage::Fragment,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Trace the GL calls of drawer setup, N frames and release.
    Trace {
        /// Number of frames to draw.
        #[arg(short, long, default_value_t = 1)]
        frames: usize,

        /// Surface width in pixels (overrides the config's draw_size).
        #[arg(short = 'W', long)]
        width: Option<u32>,

        /// Surface height in pixels (overrides the config's draw_size).
        #[arg(short = 'H', long)]
        height: Option<u32>,

        /// Drawer configuration as a JSON string.
        #[arg(long, default_value = "{}")]
        config: String,

        /// Make every shader of this stage fail to compile.
        #[arg(long, value_enum)]
        fail_compile: Option<Stage>,
    },
    /// Print the blur shader sources.
    Shaders {
        /// Print the sampler2D variant instead of samplerExternalOES.
        #[arg(long)]
        planar: bool,
    },
}

fn run_frames(
    gl: &RecordingDriver,
    config: DrawerConfig,
    size: (Option<u32>, Option<u32>),
    frames: usize,
) -> Result<(), RenderError> {
    let mut drawer = FrameDrawer::new(gl, config)?;
    let (width, height) = drawer.draw_size();
    if let Err(e) = drawer.set_draw_size(size.0.unwrap_or(width), size.1.unwrap_or(height)) {
        drawer.release(gl);
        return Err(e);
    }

    let drawn = (0..frames).try_for_each(|_| drawer.draw_frame(gl, None));
    drawer.release(gl);
    drawn
}

fn print_trace(calls: &[GlCall], live: usize, frames: usize, json: bool) -> Result<(), CliError> {
    if json {
        let info = serde_json::json!({
            "frames": frames,
            "calls": calls,
            "live_objects": live,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        for (i, call) in calls.iter().enumerate() {
            println!("{:>4}  {call}", i + 1);
        }
        eprintln!(
            "{} calls over {frames} frame(s), {live} live object(s) after release",
            calls.len()
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Trace {
            frames,
            width,
            height,
            config,
            fail_compile,
        } => {
            let config = DrawerConfig::from_json(&config)?;

            let mut gl = RecordingDriver::new();
            if let Some(stage) = fail_compile {
                gl = gl.with_compile_failure(stage.into());
            }

            let outcome = run_frames(&gl, config, (width, height), frames);
            print_trace(&gl.take_calls(), gl.live_objects(), frames, cli.json)?;
            outcome?;
        }
        Command::Shaders { planar } => {
            let target = if planar {
                TextureTarget::Planar2D
            } else {
                TextureTarget::External
            };
            let fragment = blur_fragment_shader(target);
            if cli.json {
                let info = serde_json::json!({
                    "target": target,
                    "vertex": BLUR_VERTEX_SHADER,
                    "fragment": fragment,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("// vertex\n{BLUR_VERTEX_SHADER}\n// fragment\n{fragment}");
            }
        }
    }

    Ok(())
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    initialise_tracing();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trace_defaults_parse() {
        let cli = Cli::try_parse_from(["vidgl", "trace"]).unwrap();
        match cli.command {
            Command::Trace {
                frames,
                width,
                config,
                fail_compile,
                ..
            } => {
                assert_eq!(frames, 1);
                assert_eq!(width, None);
                assert_eq!(config, "{}");
                assert!(fail_compile.is_none());
            }
            Command::Shaders { .. } => panic!("expected trace"),
        }
    }

    #[test]
    fn fail_compile_accepts_stage_names() {
        let cli = Cli::try_parse_from(["vidgl", "trace", "--fail-compile", "fragment"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Trace {
                fail_compile: Some(Stage::Fragment),
                ..
            }
        ));
    }

    #[test]
    fn run_frames_releases_everything() {
        let gl = RecordingDriver::new();
        run_frames(&gl, DrawerConfig::default(), (Some(64), None), 3).unwrap();
        assert_eq!(gl.live_objects(), 0);
        assert!(gl.calls().contains(&GlCall::Viewport {
            x: 0,
            y: 0,
            width: 64,
            height: 1280
        }));
    }

    #[test]
    fn run_frames_reports_compile_failure() {
        let gl = RecordingDriver::new().with_compile_failure(ShaderStage::Vertex);
        let err = run_frames(&gl, DrawerConfig::default(), (None, None), 1).unwrap_err();
        assert_eq!(CliError::from(err).exit_code(), 10);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn oversized_width_override_is_an_input_error() {
        let gl = RecordingDriver::new();
        let err = run_frames(&gl, DrawerConfig::default(), (Some(3_000_000_000), None), 1)
            .unwrap_err();
        assert_eq!(CliError::from(err).exit_code(), 12);
        assert_eq!(gl.live_objects(), 0);
        assert!(!gl
            .calls()
            .iter()
            .any(|c| matches!(c, GlCall::Viewport { .. })));
    }
}
