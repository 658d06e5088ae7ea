//! High-level services built on the repositories and the remote API.

mod sync;

pub use sync::SyncEngine;
