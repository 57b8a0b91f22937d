//! Errors surfaced by the runtime API.
//!
//! Gameplay failures stay boolean/no-op inside the core; these errors only
//! cover worker coordination, so a `RuntimeError` always means the runtime
//! itself broke, never that a gameplay rule refused something.

use aegis_core::EntityId;
use thiserror::Error;
use tokio::sync::oneshot;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("ability slot {ability} on entity {entity} has no claim")]
    UnknownClaim { entity: EntityId, ability: usize },
}
