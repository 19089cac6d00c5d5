//! Sender and receiver pipelines
//!
//! Both are single-threaded cooperative loops: one blocking call per
//! iteration, an explicit per-iteration outcome instead of silent
//! catch-and-continue, and a cancellation flag checked at iteration
//! boundaries. Every per-iteration fault becomes a logged skip or a
//! counted loss; nothing escapes the loops.

pub mod receiver;
pub mod sender;

pub use receiver::{FinalizedRecordings, ReceiverPipeline, ReceiverStep};
pub use sender::{AudioStep, SenderPipeline, SenderStep};
