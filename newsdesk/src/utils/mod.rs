pub mod logger;
pub mod serde;
pub mod signal;
pub mod time;
