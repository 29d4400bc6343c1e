//! TaskBurst - personal productivity store with single-instance editing
//!
//! All state lives in a local whole-blob JSON store. Because every write
//! replaces a full collection, at most one instance may edit at a time; the
//! coordinator enforces that with a heartbeat record in the store itself.
//!
//! # Modules
//!
//! - [`coordinator`] - Single-instance state machine, runner and session
//! - [`presence`] - Best-effort same-machine broadcast between instances
//! - [`domain`] - Persisted record types
//! - [`board`] - Collection read-modify-write and task/list lifecycles
//! - [`schedule`] - Recurrence, overlap layout and fortnight parity
//! - [`transfer`] - JSON entity and ZIP bundle export/import
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod board;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod presence;
pub mod schedule;
pub mod transfer;

// Re-export commonly used types
pub use config::{Config, StorageConfig};
pub use coordinator::{
    CoordinatorConfig, CoordinatorHandle, CoordinatorRunner, InstanceSession, InstanceState, SessionError,
    with_instance,
};
