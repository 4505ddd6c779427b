//! Single owner of the actuator grid.
//!
//! ```text
//! handlers ──CommandChannel──► mpsc ─┐
//!                                    ├─► Controller (owns Grid) ──watch──► GridSnapshot readers
//! interval (tick_period) ────────────┘
//! ```
//!
//! The controller task is the only writer. Toggles and ticks are applied
//! synchronously between suspension points, so neither can observe the other
//! half-done. Readers get published [`GridSnapshot`]s and never lock anything.

use ferrogrid_core::command::Command;
use ferrogrid_core::grid::{Grid, GridSnapshot};
use ferrogrid_core::types::{ActuatorStatus, Millis};
use ferrogrid_core::FerroError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Pending commands buffered ahead of the controller.
const COMMAND_BUFFER_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic millisecond clock anchored at controller start.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> Millis {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

// ---------------------------------------------------------------------------
// Command channel
// ---------------------------------------------------------------------------

/// Result of a command the controller applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub applied: usize,
    pub state: ActuatorStatus,
    pub now_ms: Millis,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Rejected(#[from] FerroError),

    #[error("controller halted; actuators are in safe-off state")]
    Halted,
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<Applied, FerroError>>,
}

/// Sending side of the controller's command queue.
///
/// Commands are applied in the order they are queued, each exactly once, and
/// `submit` resolves only after the grid has been updated.
#[derive(Clone, Debug)]
pub struct CommandChannel {
    tx: mpsc::Sender<Request>,
}

impl CommandChannel {
    pub async fn submit(&self, command: Command) -> Result<Applied, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { command, reply })
            .await
            .map_err(|_| ControlError::Halted)?;
        let result = rx.await.map_err(|_| ControlError::Halted)?;
        Ok(result?)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("command", &self.command)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Cloneable view of a running controller, shared with request handlers.
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    pub commands: CommandChannel,
    pub snapshots: watch::Receiver<GridSnapshot>,
    /// `Some(reason)` once a drive fault has halted the controller.
    pub halted: watch::Receiver<Option<String>>,
}

impl ControllerHandle {
    pub fn snapshot(&self) -> GridSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.halted.borrow().clone()
    }

    /// Resolve once the controller has halted on a drive fault.
    pub async fn wait_for_halt(&self) {
        let mut rx = self.halted.clone();
        // Err means the controller is gone, which is just as final.
        let _ = rx.wait_for(Option::is_some).await;
    }
}

/// Owner of the spawned controller task.
///
/// Dropping it stops the controller, which powers every actuator down.
#[derive(Debug)]
pub struct RunningController {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<(), FerroError>>,
}

impl RunningController {
    /// Stop the loop, cut power everywhere and return how the controller
    /// ended. A controller that already halted returns its drive fault.
    pub async fn stop(self) -> anyhow::Result<()> {
        let _ = self.stop_tx.send(());
        self.task
            .await
            .map_err(|e| anyhow::anyhow!("controller task join error: {e}"))??;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller {
    grid: Grid,
    clock: Clock,
    tick_period: Duration,
    rx: mpsc::Receiver<Request>,
    snapshot_tx: watch::Sender<GridSnapshot>,
    halt_tx: watch::Sender<Option<String>>,
}

impl Controller {
    pub fn new(grid: Grid, tick_period: Duration) -> (Self, ControllerHandle) {
        let clock = Clock::start();
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (snapshot_tx, snapshots) = watch::channel(grid.snapshot(clock.now_ms()));
        let (halt_tx, halted) = watch::channel(None);
        let controller = Self {
            grid,
            clock,
            tick_period,
            rx,
            snapshot_tx,
            halt_tx,
        };
        let handle = ControllerHandle {
            commands: CommandChannel { tx },
            snapshots,
            halted,
        };
        (controller, handle)
    }

    /// Spawn the controller onto the current Tokio runtime.
    pub fn spawn(grid: Grid, tick_period: Duration) -> (ControllerHandle, RunningController) {
        let (controller, handle) = Self::new(grid, tick_period);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(controller.run(stop_rx));
        (handle, RunningController { stop_tx, task })
    }

    /// Run until stopped, until every command sender is gone, or until a
    /// drive fault. All paths end with every actuator powered down.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> Result<(), FerroError> {
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            actuators = self.grid.len(),
            tick_ms = self.tick_period.as_millis() as u64,
            "controller started"
        );

        loop {
            let wake = tokio::select! {
                // Priority: deadlines first
                biased;

                _ = interval.tick() => Wake::Tick,
                request = self.rx.recv() => match request {
                    Some(request) => Wake::Command(request),
                    None => Wake::Closed,
                },
                _ = &mut stop => Wake::Stop,
            };

            let outcome = match wake {
                Wake::Tick => self.tick(),
                Wake::Command(request) => self.apply(request),
                Wake::Closed => {
                    info!("command channel closed");
                    break;
                }
                Wake::Stop => {
                    info!("controller stop requested");
                    break;
                }
            };
            if let Err(fault) = outcome {
                return self.halt(fault);
            }
        }

        self.grid.shutdown()?;
        self.publish();
        info!("controller stopped; all actuators off");
        Ok(())
    }

    fn tick(&mut self) -> Result<(), FerroError> {
        let now = self.clock.now_ms();
        let forced = self.grid.tick_all(now)?;
        for f in &forced {
            info!(id = f.id, reason = %f.reason, now, "actuator forced off");
        }
        if !forced.is_empty() {
            self.publish();
        }
        Ok(())
    }

    /// Apply one command and answer it. Only a drive fault is returned;
    /// everything else is the caller's problem and goes back in the reply.
    fn apply(&mut self, request: Request) -> Result<(), FerroError> {
        let now = self.clock.now_ms();
        let index = request.command.target_index;
        match self.grid.toggle(index, now) {
            Ok(state) => {
                info!(index, state = %state.status(), now, "toggle applied");
                self.publish();
                let applied = Applied {
                    applied: index,
                    state: state.status(),
                    now_ms: now,
                };
                if request.reply.send(Ok(applied)).is_err() {
                    debug!(index, "requester went away before the reply");
                }
                Ok(())
            }
            Err(FerroError::DriveFault { pin, reason }) => {
                let _ = request.reply.send(Err(FerroError::DriveFault {
                    pin,
                    reason: reason.clone(),
                }));
                Err(FerroError::DriveFault { pin, reason })
            }
            Err(e) => {
                warn!(index, "toggle rejected: {e}");
                let _ = request.reply.send(Err(e));
                Ok(())
            }
        }
    }

    fn halt(mut self, fault: FerroError) -> Result<(), FerroError> {
        error!("drive fault, halting controller: {fault}");
        if let Err(e) = self.grid.shutdown() {
            error!("safe-off incomplete: {e}");
        }
        self.publish();
        self.halt_tx.send_replace(Some(fault.to_string()));
        Err(fault)
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(self.grid.snapshot(self.clock.now_ms()));
    }
}

/// Why the controller loop woke up.
enum Wake {
    Tick,
    Command(Request),
    Closed,
    Stop,
}
