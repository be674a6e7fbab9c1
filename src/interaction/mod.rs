//! Optimistic interaction updates (rating, bookmark) and their remote writes.
//!
//! - [`reconciler`] - the per-article state machine with stale-completion detection
//! - [`writer`] - the [`InteractionWriter`] contract and an in-memory endpoint
//!
//! The HTTP endpoint lives in [`crate::api`].

mod reconciler;
mod writer;

pub use reconciler::{
    Completion, InteractionReconciler, ReconcileError, Resolution, WriteTicket, WriteToken,
};
pub use writer::{
    InteractionEcho, InteractionKind, InteractionPatch, InteractionWriter, MemoryWriter,
    WriteError, WriteRequest,
};
