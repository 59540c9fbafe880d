//! Small shared helpers

pub mod duration;
pub mod workers;

pub use duration::{duration_to_millis, format_duration, parse_duration};
pub use workers::parse_workers;
