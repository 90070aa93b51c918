//! Single-document durable store with a single-writer queue.
//!
//! All mutations pass through one worker task, so operations commit in
//! submission order and at most one write is ever in flight. The document is
//! replaced atomically on disk and corruption on load is survived by backing
//! the broken content up and reinitializing.

mod debounce;
mod document;
mod error;
mod store;

pub use debounce::Debounce;
pub use document::Database;
pub use error::{StoreError, StoreResult};
pub use store::DocumentStore;
