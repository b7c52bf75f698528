//! Top-level facade crate for tagscope.
//!
//! Re-exports the core facade and the in-memory backend so users can depend
//! on a single crate.

pub use tagscope_core::*;

pub mod memory {
    pub use tagscope_memory::*;
}
