//! Cache-view layer.

mod store;
mod view;

pub use store::{CacheStore, MemoryCacheStore};
pub use view::{CacheView, ViewCache};
