//! `gemggark-cli` library crate.
//!
//! Re-exports the terminal rendering helpers for testing. The binary
//! entrypoint lives in `main.rs`.

pub mod render;
