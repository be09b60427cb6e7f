mod disabled_store;
mod disk_store;
mod memory_store;

pub use disabled_store::DisabledCacheStore;
pub use disk_store::DiskCacheStore;
pub use memory_store::InMemoryCacheStore;
