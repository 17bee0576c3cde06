pub mod config;
pub mod logging;

pub mod control;
pub mod executor;
pub mod history;
pub mod platform;
pub mod retry;
pub mod scheduler;
pub mod task;
