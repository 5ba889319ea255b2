//! Agent module: the single-threaded owner of core state
//!
//! Consumes key edges, menu commands and poll ticks and emits `AppEvent`s.

mod dispatch;

pub use dispatch::{Agent, AgentParts};
