//! Driver spawns and manages the strip worker task

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::connection::{ControlRequests, CycleOutcome, StripMachine};
use crate::types::{ScalingExponent, StripSnapshot};

/// Requests posted by the consumer, picked up at the start of each cycle.
///
/// Requests are level-triggered: setting one twice before the worker sees
/// it has the same effect as setting it once. Exit is not a flag, it goes
/// through the driver's cancellation token so it can interrupt a read.
#[derive(Debug)]
pub struct ControlFlags {
    connect: Mutex<Option<String>>,
    disconnect: AtomicBool,
    scaling: AtomicU32,
}

impl ControlFlags {
    pub fn new(scaling: ScalingExponent) -> Self {
        Self {
            connect: Mutex::new(None),
            disconnect: AtomicBool::new(false),
            scaling: AtomicU32::new(scaling.get().to_bits()),
        }
    }

    /// Ask for a connection to `port`. A later request replaces an unseen one.
    pub fn request_connect(&self, port: impl Into<String>) {
        *self.connect.lock().unwrap_or_else(PoisonError::into_inner) = Some(port.into());
    }

    pub fn request_disconnect(&self) {
        self.disconnect.store(true, Ordering::Release);
    }

    pub fn set_scaling(&self, scaling: ScalingExponent) {
        self.scaling.store(scaling.get().to_bits(), Ordering::Relaxed);
    }

    pub fn scaling(&self) -> ScalingExponent {
        ScalingExponent::new(f32::from_bits(self.scaling.load(Ordering::Relaxed)))
            .unwrap_or_default()
    }

    /// Consume every pending request.
    pub fn take(&self) -> ControlRequests {
        ControlRequests {
            connect: self.connect.lock().unwrap_or_else(PoisonError::into_inner).take(),
            disconnect: self.disconnect.swap(false, Ordering::AcqRel),
        }
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new(ScalingExponent::default())
    }
}

/// Result of spawning the worker
pub struct DriverChannels {
    /// Latest published snapshot
    pub snapshots: watch::Receiver<Arc<StripSnapshot>>,
    /// Worker task, finishes after cancellation
    pub task: JoinHandle<()>,
}

/// Driver spawns the worker that owns the state machine.
///
/// The worker runs one machine cycle per iteration and publishes a fresh
/// snapshot whenever the cycle changed something visible. It pauses for
/// the cycle interval only while idle or retrying a connect; while
/// connected the transport's read timeout paces the loop.
pub struct Driver;

impl Driver {
    /// Spawn the worker for `machine`.
    ///
    /// Cancelling `cancel` moves the machine to `Exiting`, closes the port
    /// and ends the task, even while a read is blocked.
    pub fn spawn(
        machine: StripMachine,
        controls: Arc<ControlFlags>,
        cancel: CancellationToken,
        cycle_interval: Duration,
    ) -> DriverChannels {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(machine.snapshot()));

        let task = tokio::spawn(async move {
            Self::worker_task(machine, controls, snapshot_tx, cancel, cycle_interval).await;
        });

        DriverChannels { snapshots: snapshot_rx, task }
    }

    async fn worker_task(
        mut machine: StripMachine,
        controls: Arc<ControlFlags>,
        snapshot_tx: watch::Sender<Arc<StripSnapshot>>,
        cancel: CancellationToken,
        cycle_interval: Duration,
    ) {
        info!("Strip worker started");
        let mut frame_count = 0u64;
        let mut forced_disconnects = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!("Strip worker cancelled");
                break;
            }

            let requests = controls.take();
            if !requests.is_empty() {
                debug!(?requests, "Applying control requests");
                machine.apply(requests);
            }

            let scaling = controls.scaling();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Strip worker cancelled during {}", machine.state());
                    break;
                }
                outcome = machine.step(scaling) => outcome,
            };

            match outcome {
                CycleOutcome::Frame => frame_count += 1,
                CycleOutcome::ForcedDisconnect => forced_disconnects += 1,
                _ => {}
            }

            if machine.take_changed() {
                let snapshot = Arc::new(machine.snapshot());
                trace!(state = %snapshot.state, sequence = snapshot.sequence, "Publishing snapshot");
                snapshot_tx.send_replace(snapshot);
            }

            if outcome == CycleOutcome::Finished {
                break;
            }

            if snapshot_tx.is_closed() {
                debug!("Snapshot receivers dropped, shutting down");
                break;
            }

            if outcome.should_wait() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(cycle_interval) => {}
                }
            }
        }

        machine.exit();
        snapshot_tx.send_replace(Arc::new(machine.snapshot()));

        info!(frames = frame_count, forced_disconnects, "Strip worker ended");
    }
}
