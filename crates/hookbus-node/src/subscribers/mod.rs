//! Built-in subscribers registered by every node

mod counters;
mod user_cache;

pub use counters::ItemCounters;
pub use user_cache::{delete_user_cache, UserCache};
