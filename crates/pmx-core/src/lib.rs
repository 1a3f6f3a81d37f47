//! # pmx-core
//!
//! Persistent process registry and supervisor engine.
//!
//! Definitions and runtime status live in three JSON documents under a
//! working directory, each guarded by an advisory file lock. Every operation
//! re-reads from disk, so short-lived CLI invocations, the HTTP control plane
//! and the monitor loop can all act on the same state.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pmx_core::{Lifecycle, ProcessDefinition, StateStore};
//!
//! let store = StateStore::open("/tmp/pmx").unwrap();
//! let lifecycle = Lifecycle::new(store);
//!
//! let web = ProcessDefinition::new("web", "sleep")
//!     .with_args(["100"])
//!     .with_auto_restart(true);
//!
//! let pid = lifecycle.start(&web).unwrap();
//! println!("web running as {}", pid);
//! lifecycle.stop("web").unwrap();
//! ```

pub mod batch;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod stats;
pub mod store;
pub mod tail;
pub mod types;

pub use error::{BatchError, LifecycleError, ProbeError, StoreError, TailError};
pub use lifecycle::{stop_by_id, Lifecycle};
pub use monitor::{Monitor, MonitorConfig, RestartOutcome};
pub use registry::{Registry, StatusTables};
pub use store::{Document, StateStore};
pub use types::*;
