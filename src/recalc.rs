use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use photometry_data::{
    IlluminanceGrid, LayoutSpec, Luminaire, LuminairePosition, RoomSpec, compute_grid, positions,
};

use crate::recalc_stats::RecalcStats;
use crate::scenario::{GridSettings, default_layout};

/// Quiet period after the last change before a grid is recomputed.
pub const DEBOUNCE: Duration = Duration::from_millis(120);

/// Upper bound on a single sleep while waiting out the debounce.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Parameter changes sent to the recompute thread.
pub enum RecalcCommand {
    SetRoom(RoomSpec),
    SetLayout(LayoutSpec),
    SetLuminaire(Arc<Luminaire>),
    SetGrid(GridSettings),
    Shutdown,
}

/// One finished calculation. Never mutated after it is sent.
#[derive(Debug, Clone)]
pub struct RecalcResult {
    /// Increments by one per published result.
    pub generation: u32,
    pub luminaire_id: String,
    pub room: RoomSpec,
    pub layout: LayoutSpec,
    /// Grid settings after clamping.
    pub settings: GridSettings,
    pub positions: Vec<LuminairePosition>,
    pub grid: IlluminanceGrid,
    pub elapsed: Duration,
}

struct RecalcState {
    room: RoomSpec,
    layout: LayoutSpec,
    grid: GridSettings,
    luminaire: Option<Arc<Luminaire>>,
    generation: u32,
}

impl RecalcState {
    fn new() -> Self {
        let room = RoomSpec::default();
        Self {
            layout: default_layout(&room),
            room,
            grid: GridSettings::default(),
            luminaire: None,
            generation: 0,
        }
    }

    fn apply_command(&mut self, cmd: RecalcCommand) {
        match cmd {
            RecalcCommand::SetRoom(room) => self.room = room,
            RecalcCommand::SetLayout(layout) => self.layout = layout,
            RecalcCommand::SetLuminaire(luminaire) => self.luminaire = Some(luminaire),
            RecalcCommand::SetGrid(grid) => self.grid = grid.clamped(),
            RecalcCommand::Shutdown => {} // handled by caller
        }
    }

    fn compute(&mut self, stats: &RecalcStats) -> Option<RecalcResult> {
        let Some(luminaire) = self.luminaire.clone() else {
            tracing::warn!("no luminaire selected, skipping recompute");
            return None;
        };

        let start = Instant::now();
        let grid = compute_grid(
            &self.room,
            &self.layout,
            &luminaire.photometry,
            self.grid.resolution,
            self.grid.samples,
        );
        let elapsed = start.elapsed();

        self.generation += 1;
        stats
            .last_compute_ms
            .store(elapsed.as_secs_f32() * 1000.0, Ordering::Relaxed);
        stats.recomputes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            generation = self.generation,
            luminaire = %luminaire.id,
            average = grid.average,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "grid recomputed"
        );

        Some(RecalcResult {
            generation: self.generation,
            luminaire_id: luminaire.id.clone(),
            room: self.room,
            layout: self.layout,
            settings: self.grid,
            positions: positions(&self.room, &self.layout),
            grid,
            elapsed,
        })
    }
}

/// Run the recompute loop on the current thread. Blocks until Shutdown is
/// received, either channel is disconnected, or the results receiver is gone.
pub fn run_recalc(
    commands: Receiver<RecalcCommand>,
    results: Sender<RecalcResult>,
    stats: Arc<RecalcStats>,
) {
    let _span = tracing::info_span!("recalc").entered();
    let mut state = RecalcState::new();
    tracing::info!("thread started");

    loop {
        // Idle: nothing pending, so block for the next change.
        let cmd = match commands.recv() {
            Ok(cmd) => cmd,
            Err(_) => break,
        };
        if matches!(cmd, RecalcCommand::Shutdown) {
            break;
        }
        state.apply_command(cmd);
        let mut last_change = Instant::now();

        // Pending: fold further changes in until the debounce window is quiet.
        loop {
            match commands.try_recv() {
                Ok(RecalcCommand::Shutdown) => {
                    tracing::info!("thread shutting down");
                    return;
                }
                Ok(cmd) => {
                    state.apply_command(cmd);
                    stats.commands_coalesced.fetch_add(1, Ordering::Relaxed);
                    last_change = Instant::now();
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    tracing::info!("command channel closed");
                    return;
                }
                Err(TryRecvError::Empty) => {}
            }

            let quiet = last_change.elapsed();
            if quiet >= DEBOUNCE {
                break;
            }
            spin_sleep::sleep((DEBOUNCE - quiet).min(POLL_INTERVAL));
        }

        let Some(result) = state.compute(&stats) else {
            continue;
        };
        if results.send(result).is_err() {
            break;
        }
    }

    tracing::info!("thread shutting down");
}

/// Spawn the recompute thread. Returns its join handle, the command sender
/// and the result receiver.
pub fn spawn_recalc(
    stats: Arc<RecalcStats>,
) -> std::io::Result<(
    thread::JoinHandle<()>,
    Sender<RecalcCommand>,
    Receiver<RecalcResult>,
)> {
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    let handle = thread::Builder::new()
        .name("luxlab-recalc".into())
        .spawn(move || run_recalc(cmd_rx, result_tx, stats))?;
    Ok((handle, cmd_tx, result_rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use photometry_data::PhotometricDistribution;

    fn next_result(results: &Receiver<RecalcResult>, timeout: Duration) -> Option<RecalcResult> {
        results.recv_timeout(timeout).ok()
    }

    fn flat_luminaire() -> Arc<Luminaire> {
        Arc::new(Luminaire {
            id: "flat".into(),
            name: "Flat".into(),
            description: String::new(),
            lumens: 1000.0,
            photometry: PhotometricDistribution::new(
                vec![0.0, 90.0],
                vec![0.0],
                vec![vec![500.0, 500.0]],
            ),
        })
    }

    fn grid(resolution: usize) -> GridSettings {
        GridSettings {
            resolution,
            samples: 1,
        }
    }

    #[test]
    fn burst_of_changes_gives_one_result() {
        let stats = RecalcStats::new();
        let (handle, tx, rx) = spawn_recalc(stats.clone()).unwrap();

        tx.send(RecalcCommand::SetLuminaire(flat_luminaire())).unwrap();
        for resolution in [10, 12, 14, 16] {
            tx.send(RecalcCommand::SetGrid(grid(resolution))).unwrap();
        }

        let result = next_result(&rx, Duration::from_secs(5)).expect("no result");
        assert_eq!(result.generation, 1);
        assert_eq!(result.luminaire_id, "flat");
        assert_eq!(result.grid.resolution(), 16);
        assert_eq!(result.positions.len(), 6);
        assert!(next_result(&rx, DEBOUNCE * 3).is_none());

        assert_eq!(stats.recomputes.load(Ordering::Relaxed), 1);
        assert_eq!(stats.commands_coalesced.load(Ordering::Relaxed), 4);

        tx.send(RecalcCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn separated_changes_each_recompute() {
        let stats = RecalcStats::new();
        let (handle, tx, rx) = spawn_recalc(stats.clone()).unwrap();

        tx.send(RecalcCommand::SetLuminaire(flat_luminaire())).unwrap();
        let first = next_result(&rx, Duration::from_secs(5)).expect("no first result");

        let room = RoomSpec {
            length: 10.0,
            ..RoomSpec::default()
        };
        tx.send(RecalcCommand::SetRoom(room)).unwrap();
        let second = next_result(&rx, Duration::from_secs(5)).expect("no second result");

        assert_eq!((first.generation, second.generation), (1, 2));
        assert_eq!(second.room.length, 10.0);
        assert!(stats.last_compute_ms.load(Ordering::Relaxed) >= 0.0);

        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn nothing_is_published_without_a_luminaire() {
        let (handle, tx, rx) = spawn_recalc(RecalcStats::new()).unwrap();
        tx.send(RecalcCommand::SetRoom(RoomSpec::default())).unwrap();
        assert!(next_result(&rx, DEBOUNCE * 3).is_none());
        tx.send(RecalcCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn grid_settings_are_clamped() {
        let (handle, tx, rx) = spawn_recalc(RecalcStats::new()).unwrap();
        tx.send(RecalcCommand::SetLuminaire(flat_luminaire())).unwrap();
        tx.send(RecalcCommand::SetGrid(grid(500))).unwrap();
        let result = next_result(&rx, Duration::from_secs(5)).expect("no result");
        assert_eq!(result.grid.resolution(), 80);
        tx.send(RecalcCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
