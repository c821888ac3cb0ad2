// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - Compiling per-task `paths` glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Fanning change events out to registered listeners.
//!
//! It does **not** know about processes or reload policy; it only turns
//! filesystem changes into [`ChangeEvent`]s.

pub mod patterns;
pub mod watcher;

pub use patterns::PathMatcher;
pub use watcher::{ChangeEvent, ChangeKind, ChangeSource};
