use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use linuxzones::actor::persister::Persister;
use linuxzones::actor::preset_switcher::{PresetSwitcher, SwitchOutcome};
use linuxzones::actor::preset_watcher::PresetWatcher;
use linuxzones::actor::reactor::{self, Backend, Event, Reactor};
use linuxzones::common::config::{Config, config_file};
use linuxzones::common::error::ZoneError;
use linuxzones::common::log;
use linuxzones::layout_engine::{boundaries, move_boundary, resolve};
use linuxzones::model::geometry::{Point, Rect};
use linuxzones::model::layout::Axis;
use linuxzones::model::store::{self, LayoutStore};
use linuxzones::sys::headless::{HeadlessHotkeys, HeadlessOverlay, HeadlessWindowSystem};
use linuxzones::sys::window_system::WindowId;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "linuxzones")]
#[command(about = "Snap windows into predefined zones")]
struct Cli {
    /// Read settings and key bindings from this file instead of the default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Work area used to scale zones, as WIDTHxHEIGHT.
    #[arg(long, global = true, default_value = "1920x1080", value_parser = parse_work_area)]
    work_area: Rect,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List presets and the zones of each
    List,
    /// Make a preset active, by name or by 1-based position
    Select { preset: String },
    /// Activate the next preset
    Next,
    /// Activate the previous preset
    Prev,
    /// Show which zone a drop at the given point would snap to
    Resolve {
        x: f64,
        y: f64,
        /// Overrides the configured merge tolerance.
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Split a zone of the active preset
    Divide {
        zone: usize,
        axis: AxisArg,
        /// Normalized position of the new divider inside the zone.
        #[arg(default_value_t = 0.5)]
        position: f64,
    },
    /// Copy the active preset under a new name and make the copy active.
    /// An existing preset with that name is replaced.
    SaveAs { name: String },
    /// List the dividers between zones of the active preset
    Boundaries,
    /// Move a divider of the active preset to a normalized position
    MoveBoundary { boundary: usize, position: f64 },
    /// Check the config and preset files without changing anything
    Validate,
    /// Replay a recorded session and print how each drag ended
    Replay { file: PathBuf },
    /// Run the reactor against an in-memory desktop, reading events as JSON
    /// lines from stdin
    Run {
        /// Record handled events to this file. Overwrites the file if it exists.
        #[arg(long)]
        record: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AxisArg {
    Vertical,
    Horizontal,
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Vertical => Axis::Vertical,
            AxisArg::Horizontal => Axis::Horizontal,
        }
    }
}

fn parse_work_area(s: &str) -> Result<Rect, String> {
    let (w, h) = s.split_once('x').ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("work area must be positive".to_string());
    }
    Ok(Rect::new(0.0, 0.0, width, height))
}

fn main() -> anyhow::Result<()> {
    let opt: Cli = Parser::parse();

    log::init_logging();
    install_panic_hook();

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let mut config = Config::read_or_default(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let fixes = config.auto_fix_values();
    if fixes > 0 {
        warn!(fixes, "adjusted out-of-range settings");
    }
    let presets_path = config.settings.presets_path();

    match opt.command {
        Commands::List => list(&LayoutStore::open(&presets_path), opt.work_area),
        Commands::Select { preset } => {
            let mut switcher = PresetSwitcher::new(LayoutStore::open(&presets_path));
            let outcome = match preset.parse::<usize>() {
                Ok(n) if n > 0 => switcher.select_by_shortcut_index(n - 1),
                _ => switcher.select_by_name(&preset),
            };
            report(outcome, &switcher);
        }
        Commands::Next => {
            let mut switcher = PresetSwitcher::new(LayoutStore::open(&presets_path));
            let outcome = switcher.cycle_next();
            report(outcome, &switcher);
        }
        Commands::Prev => {
            let mut switcher = PresetSwitcher::new(LayoutStore::open(&presets_path));
            let outcome = switcher.cycle_previous();
            report(outcome, &switcher);
        }
        Commands::Resolve { x, y, tolerance } => {
            let store = LayoutStore::open(&presets_path);
            let zones = store.active_layout().zone_rects(&opt.work_area);
            let tolerance = tolerance.unwrap_or(config.settings.merge_tolerance);
            let target = resolve(&zones, Point::new(x, y), tolerance);
            println!("{}", serde_json::to_string_pretty(&target)?);
        }
        Commands::Divide { zone, axis, position } => {
            let mut store = LayoutStore::open(&presets_path);
            store.edit_active(|layout| layout.divide(zone, axis.into(), position))?;
            list_active(&store, opt.work_area);
        }
        Commands::SaveAs { name } => {
            let mut store = LayoutStore::open(&presets_path);
            let mut layout = (*store.active_layout()).clone();
            layout.name = name;
            let index = store.upsert(layout)?;
            store.set_active(index)?;
            list_active(&store, opt.work_area);
        }
        Commands::Boundaries => {
            let store = LayoutStore::open(&presets_path);
            let layout = store.active_layout();
            let buffer = config.settings.boundary_buffer;
            for (n, b) in boundaries(&layout.zones).iter().enumerate() {
                let range = b.range(&layout.zones, buffer);
                println!(
                    "{n}: {:?} at {:.3} span {:.3}..{:.3} range {range:?} ({:?} | {:?})",
                    b.axis, b.position, b.span.0, b.span.1, b.before, b.after
                );
            }
        }
        Commands::MoveBoundary { boundary, position } => {
            let mut store = LayoutStore::open(&presets_path);
            let buffer = config.settings.boundary_buffer;
            store.edit_active(|layout| {
                let found = boundaries(&layout.zones);
                let b = found.get(boundary).ok_or(ZoneError::IndexOutOfRange {
                    index: boundary,
                    len: found.len(),
                })?;
                move_boundary(&mut layout.zones, b, position, buffer)
            })?;
            list_active(&store, opt.work_area);
        }
        Commands::Validate => validate(&config, &presets_path)?,
        Commands::Replay { file } => {
            for outcome in reactor::replay(&file)? {
                println!("{outcome:?}");
            }
        }
        Commands::Run { record } => run(config, presets_path, opt.work_area, record.as_deref())?,
    }
    Ok(())
}

fn list(store: &LayoutStore, work_area: Rect) {
    let presets = store.presets();
    for (n, layout) in presets.iter().enumerate() {
        let marker = if n == presets.active_index() { "*" } else { " " };
        println!("{marker} {}: {} ({} zones)", n + 1, layout.name, layout.zones.len());
        for (i, rect) in layout.zone_rects(&work_area).iter().enumerate() {
            println!("    {i}: {:?}", rect.round());
        }
    }
}

fn list_active(store: &LayoutStore, work_area: Rect) {
    let layout = store.active_layout();
    println!("{}", layout.name);
    for (i, rect) in layout.zone_rects(&work_area).iter().enumerate() {
        println!("    {i}: {:?}", rect.round());
    }
}

fn report(outcome: SwitchOutcome, switcher: &PresetSwitcher) {
    match outcome {
        SwitchOutcome::Switched { index, name } => println!("{}: {name}", index + 1),
        SwitchOutcome::NoOp => println!("unchanged: {}", switcher.active_layout().name),
    }
}

fn validate(config: &Config, presets_path: &Path) -> anyhow::Result<()> {
    let mut issues = config.validate();
    if presets_path.exists()
        && let Err(e) = store::load(presets_path)
    {
        issues.push(e.to_string());
    }
    if issues.is_empty() {
        println!("ok");
        return Ok(());
    }
    for issue in &issues {
        println!("{issue}");
    }
    bail!("{} problem(s) found", issues.len());
}

fn run(
    config: Config,
    presets_path: PathBuf,
    work_area: Rect,
    record: Option<&Path>,
) -> anyhow::Result<()> {
    let mut store = LayoutStore::open(&presets_path);
    let debounce = Duration::from_millis(config.settings.persist_debounce_ms);
    store.attach_persister(Persister::spawn(presets_path.clone(), debounce)?);

    let ws = HeadlessWindowSystem::new(work_area);
    ws.add_window(WindowId(1), "headless", Rect::new(0.0, 0.0, 800.0, 600.0));
    let backend = Backend {
        window_system: Box::new(ws.clone()),
        overlay: Box::new(HeadlessOverlay::new()),
        hotkeys: Box::new(HeadlessHotkeys::new()),
    };
    let watch = config.settings.watch_presets;
    let (events_tx, handle) = Reactor::spawn(config, store, backend, reactor::Record::new(record)?)?;

    let _watcher = if watch {
        match PresetWatcher::spawn(presets_path, events_tx.clone(), Duration::from_secs(1)) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("not watching presets: {e}");
                None
            }
        }
    } else {
        None
    };

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&line) {
            Ok(event) => events_tx.send(event),
            Err(e) => warn!("skipping unreadable event: {e}"),
        }
    }
    events_tx.send(Event::Shutdown);
    if handle.join().is_err() {
        bail!("reactor thread panicked");
    }
    for (window, frame) in ws.geometry_calls() {
        info!(%window, ?frame, "placed");
    }
    Ok(())
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of propagating panics to the main thread.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
