//! The two scheduled jobs.
//!
//! `procesos` monitors tracked cases; `entidades` refreshes the entities tab.
//! Both take their clients as trait objects so the CLI stays a thin wiring
//! layer.
mod entidades;
mod history;
mod procesos;
mod report;

pub use entidades::sync_entities;
pub use procesos::{Coordinator, RunOptions};
