//! Render worker: a dedicated thread owning the GPU context.
//!
//! Commands arrive over an unbounded FIFO channel and are processed to
//! completion before the next one, which is the protocol's backpressure
//! point. The thread exits when it processes `Destroy` or when the
//! command channel disconnects.

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::executor::Executor;
use crate::protocol::{Command, Event};

/// Host-side handle to the render thread.
pub(crate) struct WorkerHandle {
    commands: Sender<Command>,
    events: Receiver<Event>,
    join_handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn spawn() -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let join_handle = thread::Builder::new()
            .name("gradient-render".into())
            .spawn(move || run_render_thread(command_rx, event_tx))
            .map_err(|err| anyhow!("failed to spawn render thread: {err}"))?;

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            join_handle: Some(join_handle),
        })
    }

    /// Fire-and-forget dispatch; a dead thread only logs.
    pub(crate) fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("render thread is gone; command dropped");
        }
    }

    /// Drains acknowledgements without blocking.
    pub(crate) fn drain_events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    /// Sends `Destroy` and joins the thread. Safe to call repeatedly.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Destroy);
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked during shutdown");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_render_thread(commands: Receiver<Command>, events: Sender<Event>) {
    debug!("render thread started");
    let mut executor = Executor::new(events);
    while let Ok(command) = commands.recv() {
        let stop = matches!(command, Command::Destroy);
        executor.handle(command);
        if stop {
            break;
        }
    }
    debug!(phase = ?executor.phase(), "render thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::uniforms::ParamUpdate;

    #[test]
    fn shutdown_before_init_joins_cleanly() {
        let mut worker = WorkerHandle::spawn().unwrap();
        worker.shutdown();
        assert!(worker.join_handle.is_none());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut worker = WorkerHandle::spawn().unwrap();
        worker.shutdown();
        worker.shutdown();
        worker.send(Command::Render { time: 0.0 });
    }

    #[test]
    fn commands_before_init_produce_no_acknowledgements() {
        let mut worker = WorkerHandle::spawn().unwrap();
        worker.send(Command::UpdateParams(ParamUpdate {
            radius: Some(0.5),
            ..Default::default()
        }));
        worker.send(Command::Render { time: 1.0 });
        worker.shutdown();
        assert!(worker.drain_events().is_empty());
    }
}
