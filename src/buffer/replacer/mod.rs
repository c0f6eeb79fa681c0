//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`FifoReplacer`] - oldest clean page goes first

mod fifo;

pub use fifo::FifoReplacer;
