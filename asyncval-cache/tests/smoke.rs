//! End-to-end behaviour of the cache against the real clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{ready, Ready};
use tokio::task::JoinSet;

use asyncval_cache::{AsyncValueCache, CacheConfig};

type Cache = AsyncValueCache<String, usize, String>;

fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce(String) -> Ready<Result<usize, String>> + Send + 'static {
    let counter = Arc::clone(counter);
    move |_key| ready(Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
}

#[tokio::test]
async fn test_item_expiration() {
    let cache = Cache::new();
    let counter = Arc::new(AtomicUsize::new(0));

    assert_eq!(
        cache
            .get_or_add_with_ttl("1".into(), counting(&counter), Duration::from_millis(10))
            .await,
        Ok(1),
        "1 as new item is created"
    );
    assert_eq!(
        cache
            .get_or_add_with_ttl("2".into(), counting(&counter), Duration::from_millis(50))
            .await,
        Ok(2),
        "2 as new item is created"
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    cache.handle_expiration();

    assert_eq!(
        cache.get_or_add("1".into(), counting(&counter)).await,
        Ok(3),
        "3 as new item is created"
    );
    assert_eq!(
        cache.get_or_add("2".into(), counting(&counter)).await,
        Ok(2),
        "2 as cached item is used"
    );
}

#[tokio::test]
async fn test_lru() {
    let max_items = 4;
    let cache = Cache::with_config(CacheConfig::default().with_max_items(max_items)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for i in 1..=max_items + 1 {
        let key = i.to_string();
        assert_eq!(cache.get_or_add(key.clone(), counting(&counter)).await, Ok(i));
        assert_eq!(cache.get_or_add(key, counting(&counter)).await, Ok(i));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cache.handle_expiration();

    assert_eq!(
        cache.get_or_add(max_items.to_string(), counting(&counter)).await,
        Ok(max_items)
    );
    assert_eq!(
        cache.get_or_add((max_items + 1).to_string(), counting(&counter)).await,
        Ok(max_items + 1)
    );
    assert_ne!(cache.get_or_add("1".into(), counting(&counter)).await, Ok(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_fresh_key_computed_once() {
    let cache = Arc::new(Cache::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();

    for _ in 0..500 {
        let cache = Arc::clone(&cache);
        let counter = Arc::clone(&counter);
        tasks.spawn(async move {
            cache
                .get_or_add("hot".into(), move |_key| async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<usize, String>(counter.fetch_add(1, Ordering::SeqCst) + 1)
                })
                .await
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap(), Ok(1));
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failure_shared() {
    let cache = Arc::new(Cache::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();

    for _ in 0..50 {
        let cache = Arc::clone(&cache);
        let counter = Arc::clone(&counter);
        tasks.spawn(async move {
            cache
                .get_or_add("flaky".into(), move |key| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<usize, String>(format!("{key} unavailable"))
                })
                .await
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap(), Err("flaky unavailable".to_string()));
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_automatic_expiration() {
    let config = CacheConfig::default()
        .default_ttl(Duration::from_millis(10))
        .expiration_interval(Duration::from_millis(20));
    let cache = Cache::shared(config).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    cache.get_or_add("1".into(), counting(&counter)).await.unwrap();
    assert_eq!(cache.len(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.is_empty());
    assert!(cache.stats().expirations >= 1);

    cache.dispose();
    assert!(!cache.has_expiration_timer());
}
