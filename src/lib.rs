//! Client-side synchronization of paginated forum topic feeds.
//!
//! - [`api`] - Backend contract and its HTTP implementation
//! - [`feed`] - Page cache, fetcher, optimistic votes and projection
//! - [`tabs`] - Selection over the feed sources
//! - [`session`] - Runtime driver owning the cache
//! - [`config`] - `config.toml` loading
//! - [`ui`] - Line-oriented front end

pub mod api;
pub mod config;
pub mod feed;
pub mod session;
pub mod tabs;
pub mod ui;
pub mod util;
