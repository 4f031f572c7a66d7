//! Tests for the browser-session concurrency limiter.

use feedgate::SessionLimiter;
use std::time::Duration;

#[tokio::test]
async fn capacity_bounds_concurrent_permits() {
    let limiter = SessionLimiter::new(2);
    let first = limiter.acquire().await;
    let _second = limiter.acquire().await;
    assert_eq!(limiter.available(), 0);

    // Third caller blocks until a permit frees up.
    let limiter_clone = limiter.clone();
    let waiter = tokio::spawn(async move {
        let _permit = limiter_clone.acquire().await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "third acquire must wait at capacity");

    drop(first);
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should complete after a release")
        .unwrap();
}

#[tokio::test]
async fn permits_release_on_drop() {
    let limiter = SessionLimiter::new(1);
    {
        let _permit = limiter.acquire().await;
        assert_eq!(limiter.available(), 0);
    }
    assert_eq!(limiter.available(), 1);
}

#[test]
fn zero_capacity_is_clamped_to_one() {
    let limiter = SessionLimiter::new(0);
    assert_eq!(limiter.capacity(), 1);
}
