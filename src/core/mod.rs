//! Core Module - Sync Checking & Mempool Watching
//!
//! The only parts with concurrency coordination: height fan-out with
//! partial failure, and first-match pending transaction watching.

pub mod mempool_watcher;
pub mod predicate;
pub mod sync_checker;

pub use mempool_watcher::*;
pub use predicate::*;
pub use sync_checker::*;
