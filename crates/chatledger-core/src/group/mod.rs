//! Chat groups mirrored into local storage.

mod model;
mod repository;

pub use model::{Group, normalize_group};
pub use repository::GroupRepository;
