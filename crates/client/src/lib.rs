//! Task lifecycle client for the gem optimization service.
//!
//! Submits an optimization job over HTTP, follows its progress over a
//! WebSocket stream, and drives the page-level state machine that hosts
//! observe. [`controller::PageController`] is the entry point; the other
//! modules are its collaborators.

pub mod api;
pub mod client;
pub mod config;
pub mod controller;
pub mod events;
pub mod session;
