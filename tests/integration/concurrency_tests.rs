//! Concurrent access to the caching layer.
//!
//! These tests verify:
//! - Parallel readers of a hot tile agree on its payload
//! - Interleaved writes, reads and deletes keep each tile's view exact
//! - An external layer delete evicts only that layer

use std::sync::Arc;

use bytes::Bytes;
use tilestore::cache::{LruCacheProvider, MemoryBlobStore};
use tilestore::storage::{BlobStore, TransientBlobStore};

use super::test_utils::{query, tile};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_readers_see_same_payload() {
    let backend = Arc::new(TransientBlobStore::new());
    backend.put(&tile("roads", 0, 0, 0, b"hot")).await.unwrap();
    let store = Arc::new(MemoryBlobStore::wrapping(backend));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                let mut q = query("roads", 0, 0, 0);
                assert!(store.get(&mut q).await.unwrap());
                q.contents().unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(Bytes::from_static(b"hot")));
    }

    let stats = store.cache_statistics().await;
    assert_eq!(stats.hit_count + stats.miss_count, 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_mutations_on_distinct_tiles() {
    let backend = Arc::new(TransientBlobStore::new());
    let provider = Arc::new(LruCacheProvider::with_capacity(4 * 1024));
    let store = Arc::new(MemoryBlobStore::with_cache_provider(backend.clone(), provider));

    // Each worker owns one tile, so its own view must stay exact while the
    // others mutate the shared cache and store
    let handles: Vec<_> = (0..8i64)
        .map(|worker| {
            let store = store.clone();
            tokio::spawn(async move {
                let mut expected: Option<Bytes> = None;
                for round in 0..30u8 {
                    match round % 3 {
                        0 => {
                            let payload = [worker as u8, round];
                            store.put(&tile("roads", worker, 0, 0, &payload)).await.unwrap();
                            expected = Some(Bytes::copy_from_slice(&payload));
                        }
                        1 => {
                            let mut q = query("roads", worker, 0, 0);
                            let found = store.get(&mut q).await.unwrap();
                            assert_eq!(found, expected.is_some());
                            assert_eq!(q.contents().unwrap(), expected.clone().filter(|_| found));
                        }
                        _ => {
                            if round % 2 == 0 {
                                store.delete(&query("roads", worker, 0, 0)).await.unwrap();
                                expected = None;
                            }
                        }
                    }
                }
                expected
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let expected = handle.await.unwrap();
        let mut q = query("roads", worker as i64, 0, 0);
        let stored = backend.get(&mut q).await.unwrap();
        assert_eq!(stored, expected.is_some(), "tile {} presence differs", worker);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_external_delete_leaves_other_layers_cached() {
    let backend = Arc::new(TransientBlobStore::new());
    let store = Arc::new(MemoryBlobStore::wrapping(backend.clone()));

    let writers: Vec<_> = ["roads", "rivers", "rails", "parks"]
        .into_iter()
        .map(|layer| {
            let store = store.clone();
            tokio::spawn(async move {
                for x in 0..16 {
                    store.put(&tile(layer, x, 0, 0, b"data")).await.unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    assert!(backend.delete_layer("roads").await.unwrap());

    for x in 0..16 {
        let mut q = query("roads", x, 0, 0);
        assert!(!store.get(&mut q).await.unwrap());
        for layer in ["rivers", "rails", "parks"] {
            let mut q = query(layer, x, 0, 0);
            assert!(store.get(&mut q).await.unwrap());
        }
    }

    let stats = store.cache_statistics().await;
    assert_eq!(stats.hit_count, 48);
    assert_eq!(stats.miss_count, 16);
}
