//! Stream event protocol: the wire shape of one output line from a running interaction,
//! chain, or task, plus envelope injection (run id, sequence).
//!
//! This crate has no dependency on the orchestrator crate; the orchestrator constructs
//! `OutputEvent`s from its internal state and serializes them through `EnvelopeState`.

pub mod envelope;
pub mod event;

pub use envelope::{Envelope, EnvelopeState};
pub use event::OutputEvent;
