pub mod error;
pub mod model;
pub mod reconcile;
pub mod reducer;
pub mod time;

pub use error::Error;
pub use time::Clock;
