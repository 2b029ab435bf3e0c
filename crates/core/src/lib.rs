//! Pure domain types for the gem optimization client.
//!
//! Nothing in this crate performs I/O. It defines the raw input model and
//! its validation, the request formatter that turns raw input into the
//! submission payload, and the progress events pushed by the server.

pub mod error;
pub mod input;
pub mod progress;
pub mod request;
pub mod types;
