//! Tests for the reply cache: normalisation, TTL expiry and eviction order.

use std::time::Duration;

use sportml::{CacheConfig, ResponseCache};

fn cache(max_entries: usize, evict_batch: usize) -> ResponseCache {
    ResponseCache::new(
        &CacheConfig::new()
            .max_entries(max_entries)
            .evict_batch(evict_batch)
            .ttl(Duration::from_secs(15 * 60)),
    )
}

#[tokio::test(start_paused = true)]
async fn hit_uses_normalised_key() {
    let cache = cache(100, 20);
    cache.put("Who won the 2022 World Cup?", "Argentina.");
    assert_eq!(
        cache.get("  who WON the 2022 world cup?  ").as_deref(),
        Some("Argentina.")
    );
}

#[tokio::test(start_paused = true)]
async fn miss_on_unknown_message() {
    let cache = cache(100, 20);
    assert!(cache.get("anything").is_none());
}

#[tokio::test(start_paused = true)]
async fn entry_valid_until_ttl() {
    let cache = cache(100, 20);
    cache.put("q", "a");
    tokio::time::advance(Duration::from_secs(15 * 60 - 1)).await;
    assert_eq!(cache.get("q").as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn entry_expired_at_ttl_is_removed() {
    let cache = cache(100, 20);
    cache.put("q", "a");
    tokio::time::advance(Duration::from_secs(15 * 60)).await;
    assert!(cache.get("q").is_none());
    assert_eq!(cache.len(), 0, "expired entry is evicted on lookup");
}

#[tokio::test(start_paused = true)]
async fn overwrite_restarts_ttl() {
    let cache = cache(100, 20);
    cache.put("q", "old");
    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    cache.put("Q", "new");
    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    assert_eq!(cache.get("q").as_deref(), Some("new"));
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn overflow_evicts_oldest_batch() {
    let cache = cache(100, 20);
    for i in 0..100 {
        cache.put(&format!("question {i}"), format!("answer {i}"));
        tokio::time::advance(Duration::from_millis(10)).await;
    }
    assert_eq!(cache.len(), 100);

    cache.put("question 100", "answer 100");
    assert_eq!(cache.len(), 81);

    for i in 0..20 {
        assert!(cache.get(&format!("question {i}")).is_none(), "entry {i} should be evicted");
    }
    for i in 20..=100 {
        assert!(cache.get(&format!("question {i}")).is_some(), "entry {i} should survive");
    }
}

#[tokio::test(start_paused = true)]
async fn entries_written_in_same_instant_evict_in_write_order() {
    let cache = cache(3, 1);
    cache.put("a", "1");
    cache.put("b", "2");
    cache.put("c", "3");
    cache.put("d", "4");
    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_some());
    assert!(cache.get("d").is_some());
}

#[tokio::test(start_paused = true)]
async fn expired_entries_go_before_live_ones() {
    let cache = ResponseCache::new(
        &CacheConfig::new()
            .max_entries(3)
            .evict_batch(1)
            .ttl(Duration::from_secs(60)),
    );
    cache.put("old", "1");
    tokio::time::advance(Duration::from_secs(61)).await;
    cache.put("x", "2");
    cache.put("y", "3");
    cache.put("z", "4");

    // Dropping the expired entry was enough to get back under capacity.
    assert_eq!(cache.len(), 3);
    assert!(cache.get("x").is_some());
    assert!(cache.get("y").is_some());
    assert!(cache.get("z").is_some());
}

#[tokio::test(start_paused = true)]
async fn newest_entry_never_evicted_while_older_remain() {
    let cache = cache(5, 2);
    for i in 0..50 {
        cache.put(&format!("k{i}"), "v");
        assert!(cache.get(&format!("k{i}")).is_some());
        assert!(cache.len() <= 5);
    }
}

#[tokio::test(start_paused = true)]
async fn clear_empties_cache() {
    let cache = cache(10, 2);
    cache.put("a", "1");
    cache.clear();
    assert!(cache.is_empty());
}
