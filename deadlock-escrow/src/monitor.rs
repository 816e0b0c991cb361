//! Periodic dead-man sweep.
//!
//! Runs [`EscrowService::evaluate_all`] on a fixed interval until stopped
//! through its [`MonitorHandle`].

use crate::error::{EscrowError, EscrowResult};
use crate::service::EscrowService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Commands accepted by a running monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    Stop,
    SweepNow,
}

/// Handle for controlling the monitor loop.
#[derive(Clone)]
pub struct MonitorHandle {
    command_tx: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    pub async fn stop(&self) -> EscrowResult<()> {
        self.send(MonitorCommand::Stop).await
    }

    /// Requests a sweep without waiting for the next tick.
    pub async fn sweep_now(&self) -> EscrowResult<()> {
        self.send(MonitorCommand::SweepNow).await
    }

    async fn send(&self, command: MonitorCommand) -> EscrowResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| EscrowError::State("dead-man monitor not running".to_string()))
    }
}

/// Interval loop driving dead-man evaluation.
pub struct DeadManMonitor {
    service: Arc<EscrowService>,
    interval: Duration,
    command_rx: mpsc::Receiver<MonitorCommand>,
}

/// Creates a monitor and its command handle.
pub fn create_monitor(service: Arc<EscrowService>, interval: Duration) -> (MonitorHandle, DeadManMonitor) {
    let (command_tx, command_rx) = mpsc::channel(16);
    let monitor = DeadManMonitor {
        service,
        interval,
        command_rx,
    };
    (MonitorHandle { command_tx }, monitor)
}

impl DeadManMonitor {
    /// Runs until [`MonitorHandle::stop`] is called or every handle is dropped.
    pub async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "dead-man monitor started");

        let mut ticker = tokio::time::interval(self.interval);
        // Skip first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::Stop) => {
                            info!("dead-man monitor stopping");
                            break;
                        }
                        Some(MonitorCommand::SweepNow) => {
                            self.sweep().await;
                        }
                        None => {
                            info!("command channel closed, stopping dead-man monitor");
                            break;
                        }
                    }
                }
            }
        }

        info!("dead-man monitor stopped");
    }

    async fn sweep(&self) {
        if let Err(e) = self.service.evaluate_all().await {
            error!("dead-man evaluation error: {e}");
        }
    }
}
