use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use ped_scene::{DisplayList, Notice, ProjectionMode, Scene, SceneConfig, Viewport};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Headless driver for the pedestrian scene.
#[derive(Parser, Debug)]
#[command(name = "ped-scene", version, about)]
struct Cli {
    /// Scene configuration as JSON; defaults are used for anything missing.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replays a recorded message stream through the scene.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// JSON lines of `{"event", "data", "at"?}`; `at` is the arrival time
    /// in wall-clock seconds and defaults to that of the previous line.
    input: PathBuf,
    /// Frames per second of the render loop.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    #[arg(long, default_value_t = 1200.0)]
    width: f64,
    #[arg(long, default_value_t = 800.0)]
    height: f64,
    /// Use the top-down projection instead of the isometric one.
    #[arg(long)]
    planar: bool,
    /// Writes every frame's display list here, one JSON object per line.
    #[arg(long)]
    frames: Option<PathBuf>,
    /// Writes only the last frame's display list here.
    #[arg(long)]
    last_frame: Option<PathBuf>,
    /// Records the run and writes the playback file here.
    #[arg(long)]
    playback: Option<PathBuf>,
}

/// One line of a replay stream.
#[derive(Deserialize)]
struct Record {
    event: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    at: Option<f64>,
}

fn read_records(path: &Path) -> anyhow::Result<Vec<(f64, Record)>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut records = vec![];
    let mut at = 0.0;
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("cannot read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: not a message record", path.display(), n + 1))?;
        if let Some(t) = record.at {
            if !(t >= at) {
                bail!("{}:{}: arrival time {} goes backwards", path.display(), n + 1, t);
            }
            at = t;
        }
        records.push((at, record));
    }
    Ok(records)
}

fn report(notices: Vec<Notice>) {
    for notice in notices {
        match notice {
            Notice::Info(text) => println!("{}", text),
            Notice::Error(text) => eprintln!("error: {}", text),
        }
    }
}

fn replay(config: SceneConfig, args: ReplayArgs) -> anyhow::Result<()> {
    let ReplayArgs {
        input,
        fps,
        width,
        height,
        planar,
        frames,
        last_frame,
        playback,
    } = args;
    if !(fps > 0.0 && fps.is_finite()) {
        bail!("frame rate must be positive, got {}", fps);
    }
    let records = read_records(&input)?;
    let end = records.last().map_or(0.0, |(at, _)| *at);
    log::info!(
        "replaying {} messages over {:.2}s at {} fps",
        records.len(),
        end,
        fps
    );

    let mut scene = Scene::new(config, Viewport::new(width, height));
    if planar {
        scene.set_mode(ProjectionMode::Planar);
    }
    if playback.is_some() {
        scene.start_recording();
    }
    let mut frames_out = match &frames {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => None,
    };

    let mut list = DisplayList::new();
    let mut pending = records.into_iter().peekable();
    let mut rejected = 0;
    let mut frame = 0u64;
    loop {
        let now = frame as f64 / fps;
        while let Some((_, record)) = pending.next_if(|(at, _)| *at <= now) {
            if scene.enqueue_raw(&record.event, record.data).is_err() {
                rejected += 1;
            }
        }
        scene.tick(now, &mut list);
        report(scene.take_notices());

        if let Some(out) = &mut frames_out {
            let line = json!({ "frame": frame, "time": now, "items": list.to_json() });
            serde_json::to_writer(&mut *out, &line).context("cannot write frame")?;
            out.write_all(b"\n").context("cannot write frame")?;
        }
        frame += 1;
        if pending.peek().is_none() {
            break;
        }
    }
    if let Some(mut out) = frames_out {
        out.flush().context("cannot write frames")?;
    }

    if let Some(path) = last_frame {
        let file =
            File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &list.to_json())
            .with_context(|| format!("cannot write {}", path.display()))?;
    }
    if let (Some(path), Some(file)) = (playback, scene.finish_recording()) {
        file.save(&path)
            .with_context(|| format!("cannot write playback file {}", path.display()))?;
        log::info!("wrote {} frames to {}", file.frames.len(), path.display());
    }

    let hud = scene.hud();
    log::info!(
        "rendered {} frames; t={:.1}s, {} active, {} exited, {} rejected messages",
        frame,
        hud.time,
        hud.stats.active,
        hud.stats.exited,
        rejected
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SceneConfig::from_json_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    match cli.command {
        Command::Replay(args) => replay(config, args),
    }
}
