//! Integration tests for the loader cache and the registry.

use std::sync::{Arc, Barrier};

use legendre::{
    cache_key, LegendreConfig, LegendreLoader, LegendreRegistry, LoaderKind, ThreadSafeCache,
};
use regrid_common::Grid;
use test_utils::{coarse_latlon, gaussian_n32, init_test_tracing, TempDataDir};

// =============================================================================
// ThreadSafeCache
// =============================================================================

#[test]
fn test_concurrent_puts_converge_on_one_value() {
    let cache: Arc<ThreadSafeCache<String>> = Arc::new(ThreadSafeCache::new(4));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<Arc<String>> = std::thread::scope(|scope| {
        let spawned: Vec<_> = (0..threads)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                scope.spawn(move || {
                    barrier.wait();
                    cache.put("T=21&Grid=N32", Arc::new(format!("built by {}", i)))
                })
            })
            .collect();
        spawned.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let survivor = cache.get("T=21&Grid=N32").unwrap();
    for handle in &handles {
        assert!(Arc::ptr_eq(handle, &survivor));
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_full_cache_evicts_only_unreferenced_entry() {
    let max = 5;
    let cache: ThreadSafeCache<usize> = ThreadSafeCache::new(max);

    // Hold handles to every entry but one
    let unreferenced = 2;
    let mut held = Vec::new();
    for i in 0..max {
        let handle = cache.put(&format!("key-{}", i), Arc::new(i));
        if i != unreferenced {
            held.push(handle);
        }
    }

    let extra = cache.put("key-9", Arc::new(9));
    assert_eq!(cache.len(), max);
    assert!(!cache.contains(&format!("key-{}", unreferenced)));
    for handle in &held {
        assert!(cache.contains(&format!("key-{}", handle)));
    }
    assert_eq!(*extra, 9);
}

#[test]
fn test_size_never_exceeds_max_under_contention() {
    let cache: Arc<ThreadSafeCache<u64>> = Arc::new(ThreadSafeCache::new(3));

    std::thread::scope(|scope| {
        for t in 0..4u64 {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                let mut kept = Vec::new();
                for i in 0..50u64 {
                    let handle = cache.put(&format!("{}-{}", t, i), Arc::new(t * 100 + i));
                    assert!(cache.len() <= 3);
                    // Keep a few handles alive to exercise in-use eviction
                    if i % 7 == 0 {
                        kept.push(handle);
                    }
                }
                // Evicted handles stay valid
                for (n, handle) in kept.iter().enumerate() {
                    assert_eq!(**handle, t * 100 + 7 * n as u64);
                }
            });
        }
    });

    assert!(cache.len() <= 3);
    assert!(cache.stats().evictions > 0);
}

// =============================================================================
// Registry
// =============================================================================

fn registry(dir: &TempDataDir, loader: &str, cache_size: usize) -> LegendreRegistry {
    let mut config = LegendreConfig::with_data_dir(dir.path());
    config.set_loader(loader).unwrap();
    config.cache_size = cache_size;
    LegendreRegistry::new(config).unwrap()
}

#[test]
fn test_registry_generates_and_caches() {
    init_test_tracing();
    let dir = TempDataDir::new();
    let registry = registry(&dir, "mmap", 12);
    let grid = gaussian_n32();

    let loader = registry.loader(21, &grid).unwrap();
    assert_eq!(loader.kind(), LoaderKind::MemoryMap);
    assert_eq!(loader.rows(), 32);
    assert!(dir.file("ecregrid_cf_t21_N32").is_file());

    let cached = registry.polynomials(21, &grid).unwrap();
    assert!(Arc::ptr_eq(&loader, &cached));
    assert_eq!(cache_key(21, &grid.coeff_info()), "T=21&Grid=N32");
}

#[test]
fn test_registry_eviction_keeps_issued_loaders_valid() {
    let dir = TempDataDir::new();
    let registry = registry(&dir, "mapped", 2);
    let grid = coarse_latlon();

    let first = registry.loader(1, &grid).unwrap();
    let second = registry.loader(2, &grid).unwrap();
    let _third = registry.loader(3, &grid).unwrap();

    let stats = registry.cache_stats(LoaderKind::MemoryMap).unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.evictions, 1);
    // Whichever entry went, both earlier handles still read
    assert!(first.row_at(90.0, 0).is_ok());
    assert!(second.row_at(90.0, 0).is_ok());
}

#[test]
fn test_registry_concurrent_requests_share_loader() {
    let dir = TempDataDir::new();
    let registry = registry(&dir, "shared", 12);
    let grid = gaussian_n32();
    let threads = 4;
    let barrier = Barrier::new(threads);

    let loaders: Vec<Arc<dyn LegendreLoader>> = std::thread::scope(|scope| {
        let spawned: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    registry.loader(10, &grid).unwrap()
                })
            })
            .collect();
        spawned.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for loader in &loaders {
        assert!(Arc::ptr_eq(loader, &loaders[0]));
    }
    let path = loaders[0].path().to_path_buf();
    drop(loaders);
    registry.clear();
    legendre::unload_shared_memory(&path).unwrap();
}

#[test]
fn test_unknown_loader_name_rejected() {
    let mut config = LegendreConfig::default();
    let err = config.set_loader("carrier-pigeon").unwrap_err();
    assert!(err.to_string().contains("carrier-pigeon"));
    assert_eq!(config.loader, LoaderKind::MemoryMap);
}
