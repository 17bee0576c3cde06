//! Retry backoff policy.
//!
//! The scheduler decides *whether* a failed task is retried (attempt budget on
//! the task itself); this module only decides *how long* the next attempt waits.

mod policy;

pub use policy::RetryPolicy;
