pub mod tags;
pub mod watchlist;

pub use tags::TagsStore;
pub use watchlist::{MutationPolicy, WatchlistState, WatchlistStore};
