// src/config/mod.rs
pub mod feed;
pub mod sources;

pub use feed::FeedConfig;
