//! Parallel scheduling

mod block_scheduler;
mod scheduler;

// Re-export
pub use block_scheduler::*;
pub use scheduler::*;
