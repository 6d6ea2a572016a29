pub mod checkpoint;
pub mod config;
pub mod fleet;
pub mod logging;
pub mod processor;
pub mod query;
pub mod report;
pub mod scheduler;
