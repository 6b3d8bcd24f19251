use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Context;
use crossbeam_channel::{select, tick};
use photometry_data::{Luminaire, compute_grid, parse_ies, positions};

use crate::luminaire::Library;
use crate::recalc::{RecalcCommand, RecalcResult, spawn_recalc};
use crate::recalc_stats::RecalcStats;
use crate::report::{Report, describe_ies, render_grid};
use crate::scenario::Scenario;

/// How often `watch` checks the scenario file for changes.
const WATCH_INTERVAL: Duration = Duration::from_millis(250);

pub fn inspect(path: &Path) -> anyhow::Result<()> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file = parse_ies(&text).with_context(|| format!("parsing {}", path.display()))?;
    println!("{}", path.display());
    print!("{}", describe_ies(&file));
    Ok(())
}

pub fn library(lib: &Library) {
    for l in lib.sorted_by_name() {
        println!(
            "{:<20} {:<28} {:>7.0} lm  {}",
            l.id, l.name, l.lumens, l.description
        );
    }
}

/// Where a report goes besides the terminal summary.
pub struct Output {
    /// Write JSON here; `-` means stdout in place of the text summary.
    pub json: Option<PathBuf>,
    /// Print the grid values under the summary.
    pub grid: bool,
}

fn emit(report: &Report, output: &Output) -> anyhow::Result<()> {
    match output.json.as_deref() {
        Some(path) if path == Path::new("-") => {
            println!("{}", report.to_json()?);
            return Ok(());
        }
        Some(path) => {
            std::fs::write(path, report.to_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => {}
    }

    print!("{}", report.summary());
    if output.grid {
        println!();
        print!("{}", render_grid(&report.grid));
    }
    Ok(())
}

fn select_luminaire(lib: &mut Library, scenario: &Scenario) -> anyhow::Result<Arc<Luminaire>> {
    match scenario.luminaire.as_deref() {
        Some(reference) => lib.resolve(reference),
        None => lib
            .first()
            .ok_or_else(|| anyhow::anyhow!("the luminaire library is empty")),
    }
}

/// Compute one scenario to completion on the calling thread.
pub fn evaluate(luminaire: &Luminaire, scenario: &Scenario) -> Report {
    let _span = tracing::info_span!("calc", luminaire = %luminaire.id).entered();
    let settings = scenario.grid.clamped();
    let layout = scenario.layout_spec();
    let start = Instant::now();
    let grid = compute_grid(
        &scenario.room,
        &layout,
        &luminaire.photometry,
        settings.resolution,
        settings.samples,
    );
    tracing::info!(
        average = grid.average,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "grid computed"
    );
    let positions = positions(&scenario.room, &layout);
    Report::new(luminaire, scenario.room, layout, settings, &positions, grid)
}

/// Command-line overrides applied on top of a scenario file.
#[derive(Default)]
pub struct Overrides {
    pub luminaire: Option<String>,
    pub resolution: Option<usize>,
    pub samples: Option<usize>,
}

pub fn calc(
    lib: &mut Library,
    scenario_path: Option<&Path>,
    overrides: Overrides,
    output: &Output,
) -> anyhow::Result<()> {
    let mut scenario = match scenario_path {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    if overrides.luminaire.is_some() {
        scenario.luminaire = overrides.luminaire;
    }
    if let Some(resolution) = overrides.resolution {
        scenario.grid.resolution = resolution;
    }
    if let Some(samples) = overrides.samples {
        scenario.grid.samples = samples;
    }

    let luminaire = select_luminaire(lib, &scenario)?;
    emit(&evaluate(&luminaire, &scenario), output)
}

/// The default room under every library luminaire in turn.
pub fn demo(lib: &Library, json: bool) -> anyhow::Result<()> {
    let scenario = Scenario::default();
    let reports: Vec<Report> = lib
        .entries()
        .iter()
        .map(|l| evaluate(l, &scenario))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", report.summary());
    }
    Ok(())
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn send_scenario(
    tx: &crossbeam_channel::Sender<RecalcCommand>,
    lib: &mut Library,
    scenario: &Scenario,
) -> anyhow::Result<()> {
    let luminaire = select_luminaire(lib, scenario)?;
    let commands = [
        RecalcCommand::SetLuminaire(luminaire),
        RecalcCommand::SetRoom(scenario.room),
        RecalcCommand::SetLayout(scenario.layout_spec()),
        RecalcCommand::SetGrid(scenario.grid),
    ];
    for cmd in commands {
        tx.send(cmd).context("recompute thread stopped")?;
    }
    Ok(())
}

fn print_result(lib: &Library, result: &RecalcResult, grid: bool) {
    let Some(luminaire) = lib.get(&result.luminaire_id) else {
        return;
    };
    let report = Report::new(
        &luminaire,
        result.room,
        result.layout,
        result.settings,
        &result.positions,
        result.grid.clone(),
    );
    println!(
        "--- generation {} ({:.1} ms) ---",
        result.generation,
        result.elapsed.as_secs_f64() * 1000.0
    );
    print!("{}", report.summary());
    if grid {
        println!();
        print!("{}", render_grid(&report.grid));
    }
}

fn reload(tx: &crossbeam_channel::Sender<RecalcCommand>, lib: &mut Library, path: &Path) {
    tracing::info!(path = %path.display(), "scenario changed");
    match Scenario::load(path) {
        Ok(scenario) => {
            if let Err(e) = send_scenario(tx, lib, &scenario) {
                tracing::error!("{e:#}");
            }
        }
        // Keep the last good scenario while the file is mid-edit.
        Err(e) => tracing::warn!("{e:#}"),
    }
}

/// Recompute whenever the scenario file changes, until `exit_after` elapses
/// (or forever).
pub fn watch(
    lib: &mut Library,
    scenario_path: &Path,
    exit_after: Option<Duration>,
    grid: bool,
) -> anyhow::Result<()> {
    let stats = RecalcStats::new();
    let (handle, tx, results) =
        spawn_recalc(stats.clone()).context("spawning recompute thread")?;

    let scenario = Scenario::load(scenario_path)?;
    send_scenario(&tx, lib, &scenario)?;
    let mut last_modified = modified(scenario_path);
    tracing::info!(path = %scenario_path.display(), "watching scenario");

    let deadline = exit_after.map(|d| Instant::now() + d);
    let ticker = tick(WATCH_INTERVAL);

    loop {
        select! {
            recv(results) -> msg => match msg {
                Ok(result) => print_result(lib, &result, grid),
                Err(_) => break,
            },
            recv(ticker) -> _ => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
                let current = modified(scenario_path);
                if current != last_modified {
                    last_modified = current;
                    reload(&tx, lib, scenario_path);
                }
            },
        }
    }

    let _ = tx.send(RecalcCommand::Shutdown);
    if handle.join().is_err() {
        anyhow::bail!("recompute thread panicked");
    }
    tracing::info!(
        recomputes = stats.recomputes.load(Ordering::Relaxed),
        coalesced = stats.commands_coalesced.load(Ordering::Relaxed),
        last_compute_ms = stats.last_compute_ms.load(Ordering::Relaxed),
        "watch finished"
    );
    Ok(())
}
