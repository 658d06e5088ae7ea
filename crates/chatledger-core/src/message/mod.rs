//! Cached chat messages.

mod model;
mod repository;

pub use model::{Message, normalize_message};
pub use repository::MessageRepository;
