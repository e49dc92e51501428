//! # Routes
//!
//! Completed journeys as stored route records, the store they persist to and
//! the helpers used to present them.

mod format;
mod route;
mod store;

pub use self::format::{format_distance, format_duration};
pub use self::route::{Position, StoredRoute};
pub use self::store::{MemoryStore, RouteBook, RouteStore};
