//! Client-side cache-and-sync layer for a movies/TV discovery app: lazy
//! anonymous identity, a reauthenticating API gateway, optimistic watchlist
//! and tags stores over a TTL cache, and paginated feed sessions.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod storage;
pub mod stores;
