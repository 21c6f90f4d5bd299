pub mod dashboard;
pub mod logger;
pub mod metrics;
