pub mod engine;

pub use engine::{ChainEngine, ChainRunOutput};
