pub mod common;
pub mod completions;
pub mod config;
pub mod id;
pub mod sync;
pub mod trips;
pub mod version;
