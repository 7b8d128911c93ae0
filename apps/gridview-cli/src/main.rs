use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use gridview_common::{MAX_TERRAIN_RESOLUTION, ViewerConfig};
use gridview_procgen::{AppearanceUpdate, AvatarAppearance, HeightField, PartKind, TerrainParams};
use gridview_scene::{DebugTextSurface, FrameLoop, LoopControl, ManualClock};
use gridview_session::{
    AvatarSink, ScriptedGrid, StateReconciler, WireMessage, decode_line,
};
use gridview_viewer::Viewer;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridview-cli", about = "Headless tools for the gridview viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Viewer configuration file
    #[arg(long, default_value = "gridview.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and configuration summary
    Info,
    /// Generate an avatar and print its parts
    Avatar {
        #[arg(long, default_value = "1.0")]
        height: f32,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        hair: Option<String>,
        #[arg(long)]
        outfit: Option<String>,
    },
    /// Generate a height field and print its statistics
    Terrain {
        #[arg(short, long, default_value = "0")]
        seed: u64,
        #[arg(long, default_value = "256")]
        size: f32,
        #[arg(
            short,
            long,
            default_value = "128",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TERRAIN_RESOLUTION))
        )]
        resolution: u32,
        #[arg(long, default_value = "20")]
        max_height: f32,
    },
    /// Run the scripted grid session headless
    Demo {
        /// Simulated frames per second
        #[arg(long, default_value = "30")]
        fps: u32,
        /// Give up after this many simulated seconds
        #[arg(long, default_value = "15")]
        max_seconds: u32,
        /// Print the last rendered frame
        #[arg(long)]
        dump_frame: bool,
    },
    /// Feed a JSON-lines transcript through the state reconciler
    Replay {
        /// Transcript file, one wire message per line
        file: PathBuf,
    },
}

/// Records avatar placements instead of moving a scene node.
#[derive(Default)]
struct Placements(Vec<Vec3>);

impl AvatarSink for Placements {
    fn place_avatar(&mut self, position: Vec3) {
        self.0.push(position);
    }
}

fn run_demo(config: &ViewerConfig, fps: u32, max_seconds: u32, dump_frame: bool) {
    let (width, height) = (config.window.width, config.window.height);
    let mut viewer = Viewer::new(config, DebugTextSurface::new(width, height), ScriptedGrid::new());
    viewer
        .session_mut()
        .reconciler_mut()
        .on_status(|status| println!("status: {status}"));
    viewer
        .session_mut()
        .reconciler_mut()
        .on_log(|entry| println!("[{}] {}", entry.level.as_str(), entry.message));

    if !viewer.session_mut().start() {
        println!("session failed to start");
        return;
    }

    let step = Duration::from_secs(1) / fps.max(1);
    let limit = u64::from(max_seconds) * u64::from(fps.max(1));
    let mut frames = FrameLoop::new(ManualClock::fixed_step(step));
    frames.run_until(|tick| {
        viewer.frame(tick.dt);
        if !viewer.session().is_polling() || tick.frame >= limit {
            LoopControl::Exit
        } else {
            LoopControl::Continue
        }
    });

    let view = viewer.session().reconciler().view();
    let p = viewer.avatar().position();
    println!(
        "Finished after {} frames: status={} region={} avatar=({:.1}, {:.1}, {:.1}) chat={}",
        frames.frames(),
        viewer.session().reconciler().status_label(),
        view.region.as_deref().unwrap_or("-"),
        p.x,
        p.y,
        p.z,
        view.chat.len()
    );
    if dump_frame {
        print!("{}", viewer.scene().surface().last_frame());
    }
}

fn run_replay(config: &ViewerConfig, file: &PathBuf) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut reconciler =
        StateReconciler::new(config.session.region_span, config.session.chat_history);
    reconciler.on_log(|entry| println!("[{}] {}", entry.level.as_str(), entry.message));
    let mut placements = Placements::default();
    let mut skipped = 0usize;

    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(WireMessage::Push(event)) => reconciler.apply_push(event, &mut placements),
            Ok(WireMessage::Snapshot(snapshot)) => {
                reconciler.apply_snapshot(snapshot, &mut placements)
            }
            Ok(WireMessage::Events(events)) => reconciler.apply_events(events),
            Err(e) => {
                tracing::warn!(line = n + 1, "skipping line: {e}");
                skipped += 1;
            }
        }
    }

    let view = reconciler.view();
    println!("Status: {}", reconciler.status_label());
    println!(
        "User: {}",
        view.user.as_ref().map_or("-", |u| u.name.as_str())
    );
    println!("Region: {}", view.region.as_deref().unwrap_or("-"));
    if let Some(m) = view.minimap {
        println!("Minimap: ({:.1}%, {:.1}%)", m.x, m.y);
    }
    println!("Avatar placements: {}", placements.0.len());
    println!("Chat lines: {}  Skipped lines: {skipped}", view.chat.len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = ViewerConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Info => {
            println!("gridview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("grid: {} ({})", config.grid.name, config.grid.login_uri);
            println!(
                "terrain: size={} resolution={} seed={}",
                config.terrain.size, config.terrain.resolution, config.terrain.seed
            );
            println!(
                "session: poll={}ms region_span={}",
                config.session.poll_interval_ms, config.session.region_span
            );
        }
        Commands::Avatar {
            height,
            body,
            hair,
            outfit,
        } => {
            let mut appearance = AvatarAppearance::default();
            appearance.merge(&AppearanceUpdate {
                height: Some(height),
                body_shape: body,
                hair_style: hair,
                outfit_style: outfit,
                ..AppearanceUpdate::default()
            });
            let model = gridview_procgen::build_avatar(&appearance);
            println!(
                "Avatar: body={} hair={} outfit={} height={:.2}",
                appearance.body_shape.as_str(),
                appearance.hair_style.as_str(),
                appearance.outfit_style.as_str(),
                model.height()
            );
            for kind in [
                PartKind::Head,
                PartKind::Hair,
                PartKind::Eye,
                PartKind::Mouth,
                PartKind::Torso,
                PartKind::Arm,
                PartKind::Hand,
                PartKind::Leg,
                PartKind::Shoe,
            ] {
                println!("  {kind:?}: {}", model.count(kind));
            }
            let triangles: usize = model.parts.iter().map(|p| p.mesh.triangle_count()).sum();
            println!("Parts: {} Triangles: {triangles}", model.parts.len());
        }
        Commands::Terrain {
            seed,
            size,
            resolution,
            max_height,
        } => {
            let field = HeightField::generate(TerrainParams {
                size,
                resolution,
                max_height,
                seed,
            });
            let (lo, hi) = field.range();
            let water = config.terrain.water_level;
            let flooded = field.heights.iter().filter(|h| **h < water).count();
            println!(
                "Terrain: seed={seed} samples={}x{} height=[{lo:.2}, {hi:.2}]",
                field.samples_per_side(),
                field.samples_per_side()
            );
            println!(
                "Below water level {water}: {:.1}%",
                flooded as f32 / field.heights.len().max(1) as f32 * 100.0
            );
            println!("Triangles: {}", field.to_mesh().triangle_count());
        }
        Commands::Demo {
            fps,
            max_seconds,
            dump_frame,
        } => run_demo(&config, fps, max_seconds, dump_frame),
        Commands::Replay { file } => run_replay(&config, &file)?,
    }

    Ok(())
}
