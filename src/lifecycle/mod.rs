//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build Admission → Spawn sweeper → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C → broadcast → server drains, sweeper stops → Exit
//!
//! Maintenance (sweeper.rs):
//!     every prune_interval → WindowStore::prune(now)
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Background tasks observe the same shutdown broadcast as the server

pub mod shutdown;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use sweeper::spawn_sweeper;
