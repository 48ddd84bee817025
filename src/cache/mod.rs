// ============================================================================
// Cache Module
// ============================================================================
//
// - lru:         generic fixed-capacity LRU eviction cache (not thread-safe)
// - order_cache: lock-protected LRU of orders shared by ingestion and lookups
//
// ============================================================================

mod lru;
mod order_cache;

pub use order_cache::OrderCache;
