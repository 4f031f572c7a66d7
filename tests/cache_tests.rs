//! Tests for the randomized-TTL LRU cache.

use feedgate::RandomTtlCache;
use std::time::Duration;

#[test]
fn put_then_get_returns_value() {
    let mut cache = RandomTtlCache::with_default_jitter(8, Duration::from_secs(60));
    cache.put("k".to_string(), 42u32);
    assert_eq!(cache.get(&"k".to_string()), Some(&42));
}

#[test]
fn replacing_a_key_updates_value_without_growth() {
    let mut cache = RandomTtlCache::with_default_jitter(8, Duration::from_secs(60));
    cache.put("k".to_string(), 1u32);
    cache.put("k".to_string(), 2u32);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&"k".to_string()), Some(&2));
}

#[test]
fn ttl_jitter_stays_within_configured_bounds() {
    // ttl=60s, multipliers [1.0, 2.0] -> expiry in [60s, 120s].
    let mut cache = RandomTtlCache::new(32, Duration::from_secs(60), 1.0, 2.0);
    for i in 0..32 {
        cache.put(format!("k{i}"), i);
    }
    for i in 0..32 {
        let ttl = cache
            .time_to_live(&format!("k{i}"))
            .expect("entry should be live");
        assert!(ttl >= Duration::from_secs(59), "ttl too short: {ttl:?}");
        assert!(ttl <= Duration::from_secs(120), "ttl too long: {ttl:?}");
    }
}

#[test]
fn expired_entries_are_absent_and_pruned() {
    let mut cache = RandomTtlCache::new(8, Duration::from_millis(20), 1.0, 1.0);
    cache.put("gone".to_string(), 1u32);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(cache.get(&"gone".to_string()), None);
    assert!(cache.is_empty(), "expired entry must be pruned on touch");
}

#[test]
fn expire_prunes_all_dead_entries_eagerly() {
    let mut cache = RandomTtlCache::new(8, Duration::from_millis(20), 1.0, 1.0);
    cache.put("a".to_string(), 1u32);
    cache.put("b".to_string(), 2u32);
    std::thread::sleep(Duration::from_millis(50));
    cache.put_with_ttl("c".to_string(), 3u32, Duration::from_secs(60));
    assert_eq!(cache.expire(), 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&"c".to_string()), Some(&3));
}

#[test]
fn overflow_evicts_least_recently_used_entry() {
    let mut cache = RandomTtlCache::with_default_jitter(2, Duration::from_secs(60));
    cache.put("a".to_string(), 1u32);
    cache.put("b".to_string(), 2u32);
    // Touch "a" so "b" becomes the LRU entry.
    assert!(cache.get(&"a".to_string()).is_some());
    cache.put("c".to_string(), 3u32);
    assert_eq!(cache.len(), 2);
    assert!(cache.get(&"b".to_string()).is_none());
    assert!(cache.get(&"a".to_string()).is_some());
    assert!(cache.get(&"c".to_string()).is_some());
}
