//! File-backed records with in-process serialization.

pub mod feeds;
pub mod lock;
pub mod screentime;

pub use feeds::{Feed, FeedStore};
pub use lock::KeyedLocks;
pub use screentime::{Accountability, ScreentimeStore};
