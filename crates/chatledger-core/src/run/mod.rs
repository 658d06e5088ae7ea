//! Cache runs: one synchronization attempt per group, with the
//! once-per-day eligibility guard.

mod eligibility;
mod model;
mod repository;

pub use eligibility::{EligibilityError, validate_window};
pub use model::{CacheRun, RunId};
pub use repository::RunRepository;
