//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up the command, release
//! and event channels, and exposes a builder-based API. The engine is
//! configured up front (spawn entities, seed attributes, grant abilities)
//! and moved into the worker, which owns it exclusively from then on.

use aegis_core::{AttributeRegistry, Engine, SimConfig, TagRegistry};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::error::{Result, RuntimeError};
use crate::events::SimEvent;
use crate::handle::RuntimeHandle;
use crate::worker::{Command, SimulationWorker};

/// Channel sizing shared across the orchestrator and worker.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 128,
            command_buffer_size: 32,
        }
    }
}

/// Owns the worker task; [`RuntimeHandle`] is the cloneable client façade.
pub struct Runtime {
    handle: RuntimeHandle,
    worker: JoinHandle<()>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SimEvent> {
        self.handle.subscribe_events()
    }

    /// Shuts down gracefully: drops this handle and waits for the worker.
    /// Cloned handles held elsewhere keep the worker alive until dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    engine: Option<Engine>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            engine: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// The pre-configured engine the worker will own. Defaults to an empty
    /// engine with empty registries.
    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Spawns the worker. Must run inside a tokio runtime.
    pub fn build(self) -> Runtime {
        let engine = self.engine.unwrap_or_else(|| {
            Engine::new(
                SimConfig::default(),
                AttributeRegistry::new(),
                TagRegistry::new(),
            )
        });

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = broadcast::channel::<SimEvent>(self.config.event_buffer_size);

        let handle = RuntimeHandle::new(command_tx, release_tx, event_tx.clone());
        let worker = SimulationWorker::new(engine, command_rx, release_rx, event_tx);
        let worker = tokio::spawn(worker.run());

        Runtime { handle, worker }
    }
}
