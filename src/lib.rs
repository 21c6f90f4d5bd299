pub mod catalog;
pub mod client;
pub mod monitoring;
pub mod placement;
pub mod session;
pub mod slip;
pub mod storage;
pub mod sync;
pub mod types;
pub mod utils;

pub use crate::types::*;
