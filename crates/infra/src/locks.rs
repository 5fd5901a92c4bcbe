//! Per-product write serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use kardex_core::ProductId;

/// Registry of per-product write locks.
///
/// Every read-compute-write cycle against a product's stock runs with that
/// product's lock held, so concurrent writers to one product serialize while
/// different products proceed in parallel. Locks are created on first use
/// and kept for the life of the process.
#[derive(Debug, Default)]
pub struct ProductLocks {
    inner: Mutex<HashMap<ProductId, Arc<AsyncMutex<()>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the write lock for one product, waiting if another writer holds it.
    pub async fn acquire(&self, id: ProductId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(registry.entry(id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_product_serializes_different_products_do_not() {
        let locks = Arc::new(ProductLocks::new());
        let a = ProductId::new();
        let b = ProductId::new();

        let guard_a = locks.acquire(a).await;

        // A different product's lock is free.
        let _guard_b = locks.acquire(b).await;

        // The same product's lock is held.
        let contended = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(a).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!contended.is_finished());

        drop(guard_a);
        contended.await.unwrap();
    }
}
