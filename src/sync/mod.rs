//! Device and sensor synchronization
//!
//! Turns listing pages into address-space nodes and keeps their values current.

pub mod coerce;
pub mod engine;
pub mod materializer;
pub mod pagination;
pub mod registry;
pub mod scheduler;
pub mod updater;

pub use engine::{SyncEngine, SyncReport};
pub use materializer::NodeLayout;
pub use scheduler::SyncScheduler;
