// src/exec/mod.rs

//! Process supervision layer.
//!
//! [`supervisor`] owns the lifecycle of one task's OS process: spawn,
//! output streaming, exit detection, conditional restart, and debounced
//! reload. Commands run through `sh -c`, so shell metacharacters in a
//! task's `cmd` are honored; configuration input is trusted.

pub mod supervisor;

pub use supervisor::{OutputListener, TaskSupervisor};
