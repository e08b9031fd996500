//! Hierarchical, collision-free layout for bidirectional mind maps.
//!
//! Layers, innermost first: [`domain`] (outlines, the layout calculator and
//! per-node state), [`application`] (editing, export, persistence),
//! [`infrastructure`] (I/O and wiring) and [`cli`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
