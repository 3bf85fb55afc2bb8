use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};
use tokio::io::BufReader;

use binderview::input::{InputEvent, InputSource, LineInput};
use binderview::panic_handler::{flush_output, initialize_panic_handler};
use binderview::settings::default_settings_path;
use binderview::{ManifestEngine, Viewer, ViewerSettings};

/// Headless viewer: opens a document manifest and replays commands against it
#[derive(Debug, Parser)]
#[command(name = "binderview", version)]
struct Args {
    /// JSON document manifest
    manifest: PathBuf,

    /// Settings file (YAML)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 1000.0)]
    height: f64,

    #[arg(long, default_value = "binderview.log")]
    log_file: PathBuf,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "debug")]
    log_level: String,
}

fn load_settings(args: &Args) -> Result<ViewerSettings> {
    let settings = match &args.settings {
        Some(path) => ViewerSettings::load(path)?,
        None => match default_settings_path() {
            Some(path) => ViewerSettings::load_or_default(&path)?,
            None => ViewerSettings::default(),
        },
    };
    Ok(ViewerSettings {
        source: Some(args.manifest.display().to_string()),
        ..settings
    })
}

fn describe(viewer: &Viewer) -> String {
    let state = viewer.state();
    let layout = state.layout();
    let mut out = format!(
        "phase={} page={} total={} displayed={} zoom={:.2} scale={:.3} left={:.1}",
        state.phase(),
        state.current_page(),
        state.total_pages(),
        state.displayed_page(),
        state.zoom().factor,
        layout.scale,
        layout.left,
    );
    if let Some(toolbar) = state.toolbar() {
        out.push_str(&format!(" title=\"{}\" label=\"{}\"", toolbar.title, toolbar.label));
    }
    if let Some(message) = state.loading_message() {
        out.push_str(&format!(" placeholder=\"{message}\""));
    }
    for (index, link) in state.overlay().iter().enumerate() {
        let [x0, y0, x1, y1] = link.screen_rect();
        out.push_str(&format!(
            "\n  link {index}: [{x0:.0}, {y0:.0}, {x1:.0}, {y1:.0}] {:?}",
            link.target
        ));
    }
    for rank in state.tab_ranks() {
        out.push_str(&format!(
            "\n  tab {}: page {} z={}{}",
            rank.index,
            rank.page,
            rank.z_index,
            if rank.right { " right" } else { "" }
        ));
    }
    out
}

async fn run(args: Args) -> Result<()> {
    let settings = load_settings(&args)?;
    let engine = ManifestEngine::load(&args.manifest)
        .with_context(|| format!("loading {}", args.manifest.display()))?;

    let mut viewer = Viewer::builder(Arc::new(engine), settings)
        .container(args.width, args.height)
        .on_loaded(|| println!("loaded"))
        .on_changed(|page| println!("changed {page}"))
        .on_failed(|fault| println!("failed: {fault}"))
        .on_external_link(|url| println!("open {url}"))
        .build()
        .context("invalid settings")?;
    viewer.settle().await;
    println!("{}", describe(&viewer));

    let mut input: Box<dyn InputSource> = match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening script {}", path.display()))?;
            Box::new(LineInput::new(BufReader::new(file)))
        }
        None => Box::new(LineInput::new(BufReader::new(tokio::io::stdin()))),
    };

    while let Some(event) = input.next_event().await? {
        match event {
            InputEvent::Quit => break,
            InputEvent::State => {}
            other => {
                other.apply_to(&mut viewer);
                viewer.settle().await;
            }
        }
        println!("{}", describe(&viewer));
    }

    viewer.destroy();
    Ok(())
}

fn main() -> Result<()> {
    initialize_panic_handler();
    let args = Args::parse();

    let level: LevelFilter = args
        .log_level
        .parse()
        .map_err(|e| anyhow!("invalid log level {:?}: {e}", args.log_level))?;
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("creating {}", args.log_file.display()))?,
    )?;
    info!("Starting binderview on {}", args.manifest.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let res = runtime.block_on(run(args));

    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }
    info!("Shutting down binderview");
    flush_output();
    res
}
