//! Integration tests for the full ledger pipeline.
//!
//! Tests: Catalog / Ledger → MovementStore + ProductStore → Recorder
//!
//! Verifies:
//! - Movement semantics move stock and snapshot it correctly
//! - Rejected requests leave both stores untouched
//! - Concurrent writers to one product serialize exactly
//! - Manual product edits surface as automatic adjustments

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use kardex_core::{DomainError, ExpectedVersion, ProductId};
    use kardex_movements::{
        InventoryMovement, MovementRequest, MovementType, ReasonCategory, replay_stock,
    };
    use kardex_products::{Product, ProductDraft, ProductPatch};

    use crate::catalog::ProductCatalog;
    use crate::ledger::{LedgerError, StockLedger};
    use crate::locks::ProductLocks;
    use crate::movement_store::{
        InMemoryMovementStore, LedgerStats, MovementFilter, MovementStore, Pagination,
    };
    use crate::product_store::{
        InMemoryProductStore, ProductFilter, ProductStore, ProductStoreError,
    };
    use crate::recorder::AdjustmentRecorder;

    struct Harness {
        movements: Arc<InMemoryMovementStore>,
        products: Arc<InMemoryProductStore>,
        ledger: Arc<StockLedger<Arc<InMemoryMovementStore>, Arc<InMemoryProductStore>>>,
        catalog: ProductCatalog<Arc<InMemoryMovementStore>, Arc<InMemoryProductStore>>,
    }

    fn setup() -> Harness {
        let movements = Arc::new(InMemoryMovementStore::new());
        let products = Arc::new(InMemoryProductStore::new());
        let locks = Arc::new(ProductLocks::new());
        let recorder = AdjustmentRecorder::spawn(movements.clone());
        let ledger = Arc::new(StockLedger::new(
            movements.clone(),
            products.clone(),
            locks.clone(),
        ));
        let catalog = ProductCatalog::new(movements.clone(), products.clone(), locks, recorder);
        Harness {
            movements,
            products,
            ledger,
            catalog,
        }
    }

    fn draft(code: &str, stock: i64) -> ProductDraft {
        ProductDraft {
            code: code.to_string(),
            name: "Test Product".to_string(),
            barcode: None,
            description: None,
            category: None,
            location: None,
            supplier: None,
            unit: None,
            pricing: None,
            dimensions: None,
            stock_current: Some(stock),
            stock_min: None,
            stock_max: None,
        }
    }

    fn movement(
        product_id: ProductId,
        movement_type: MovementType,
        quantity: i64,
        reason: &str,
    ) -> MovementRequest {
        MovementRequest {
            product_id,
            movement_type,
            quantity,
            reason: reason.to_string(),
            reason_category: None,
            batch_id: None,
            user_id: None,
            reference_document: None,
            comments: None,
        }
    }

    /// Helper: wait for the recorder to catch up. Recording runs off the
    /// request path, so movement counts are only eventually visible.
    async fn movements_eventually(
        store: &Arc<InMemoryMovementStore>,
        product_id: ProductId,
        at_least: usize,
    ) -> Vec<InventoryMovement> {
        for _ in 0..50 {
            let history = store.load_for_product(product_id).await.unwrap();
            if history.len() >= at_least {
                return history;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Expected at least {at_least} movements for product {product_id}");
    }

    /// Helper: create a product and wait for its initial-stock movement.
    async fn seed(harness: &Harness, code: &str, stock: i64) -> Product {
        let product = harness.catalog.create(draft(code, stock)).await.unwrap();
        if stock > 0 {
            movements_eventually(&harness.movements, product.id, 1).await;
        }
        product
    }

    async fn stock_of(harness: &Harness, id: ProductId) -> i64 {
        harness
            .products
            .get(id)
            .await
            .unwrap()
            .unwrap()
            .stock_current
    }

    #[tokio::test]
    async fn in_movement_increases_stock_and_snapshots_levels() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;

        let recorded = harness
            .ledger
            .record(movement(product.id, MovementType::In, 5, "  Delivery  "))
            .await
            .unwrap();

        assert_eq!(recorded.stock_before, 10);
        assert_eq!(recorded.stock_after, 15);
        assert_eq!(recorded.quantity, 5);
        assert_eq!(recorded.reason, "Delivery");
        assert_eq!(stock_of(&harness, product.id).await, 15);
    }

    #[tokio::test]
    async fn out_and_transfer_movements_decrease_stock() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;

        let out = harness
            .ledger
            .record(movement(product.id, MovementType::Out, 4, "Sale"))
            .await
            .unwrap();
        assert_eq!(out.stock_after, 6);

        let transfer = harness
            .ledger
            .record(movement(product.id, MovementType::Transfer, 2, "To warehouse B"))
            .await
            .unwrap();
        assert_eq!(transfer.stock_before, 6);
        assert_eq!(transfer.stock_after, 4);
        assert_eq!(stock_of(&harness, product.id).await, 4);
    }

    #[tokio::test]
    async fn counted_adjustment_sets_the_absolute_level() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 40).await;

        for category in [ReasonCategory::Correction, ReasonCategory::InventoryCount] {
            let recorded = harness
                .ledger
                .record(MovementRequest {
                    reason_category: Some(category),
                    ..movement(product.id, MovementType::Adjustment, 12, "Recount")
                })
                .await
                .unwrap();
            assert_eq!(recorded.stock_after, 12);
            assert_eq!(recorded.quantity, 12);
        }
        assert_eq!(stock_of(&harness, product.id).await, 12);
    }

    #[tokio::test]
    async fn uncounted_adjustment_applies_a_delta() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 40).await;

        let recorded = harness
            .ledger
            .record(MovementRequest {
                reason_category: Some(ReasonCategory::Damage),
                ..movement(product.id, MovementType::Adjustment, 3, "Found extra units")
            })
            .await
            .unwrap();

        assert_eq!(recorded.stock_before, 40);
        assert_eq!(recorded.stock_after, 43);
        assert_eq!(stock_of(&harness, product.id).await, 43);
    }

    #[tokio::test]
    async fn movement_for_missing_product_is_not_found() {
        let harness = setup();
        let result = harness
            .ledger
            .record(movement(ProductId::new(), MovementType::In, 5, "Delivery"))
            .await;

        match result {
            Err(LedgerError::Domain(DomainError::NotFound { entity, .. })) => {
                assert_eq!(entity, "product");
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn movement_on_inactive_product_is_rejected() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;
        harness.catalog.deactivate(product.id).await.unwrap();

        let result = harness
            .ledger
            .record(movement(product.id, MovementType::In, 5, "Delivery"))
            .await;

        match result {
            Err(LedgerError::Domain(DomainError::Validation(msg))) => {
                assert!(msg.contains("inactive"));
            }
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected_before_any_state_change() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;
        let before = harness
            .movements
            .load_for_product(product.id)
            .await
            .unwrap()
            .len();

        for quantity in [0, -5] {
            let result = harness
                .ledger
                .record(movement(product.id, MovementType::In, quantity, "Broken"))
                .await;
            match result {
                Err(LedgerError::Domain(DomainError::InvalidArgument(_))) => {}
                other => panic!("Expected InvalidArgument, got {other:?}"),
            }
        }

        let after = harness
            .movements
            .load_for_product(product.id)
            .await
            .unwrap()
            .len();
        assert_eq!(before, after);
        assert_eq!(stock_of(&harness, product.id).await, 10);
    }

    #[tokio::test]
    async fn insufficient_stock_reports_levels_and_changes_nothing() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 20).await;

        let result = harness
            .ledger
            .record(movement(product.id, MovementType::Out, 25, "Oversold"))
            .await;

        match result {
            Err(LedgerError::Domain(DomainError::InsufficientStock {
                available,
                requested,
            })) => {
                assert_eq!(available, 20);
                assert_eq!(requested, 25);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }

        let history = harness.movements.load_for_product(product.id).await.unwrap();
        assert_eq!(history.len(), 1); // only the initial stock movement
        assert_eq!(stock_of(&harness, product.id).await, 20);
    }

    #[tokio::test]
    async fn list_filters_and_paginates_with_a_stable_total() {
        let harness = setup();
        let a = seed(&harness, "AAA", 0).await;
        let b = seed(&harness, "BBB", 0).await;

        harness
            .ledger
            .record(movement(a.id, MovementType::In, 5, "Delivery"))
            .await
            .unwrap();
        harness
            .ledger
            .record(movement(a.id, MovementType::Out, 2, "Sale"))
            .await
            .unwrap();
        harness
            .ledger
            .record(movement(b.id, MovementType::In, 7, "Delivery"))
            .await
            .unwrap();
        harness
            .ledger
            .record(MovementRequest {
                reason_category: Some(ReasonCategory::Correction),
                ..movement(a.id, MovementType::Adjustment, 10, "Recount")
            })
            .await
            .unwrap();
        harness
            .ledger
            .record(movement(b.id, MovementType::Transfer, 3, "To warehouse B"))
            .await
            .unwrap();

        let all = harness
            .ledger
            .list(MovementFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.total, 5);
        assert_eq!(all.data.len(), 5);
        assert!(!all.has_more);
        // Newest first.
        assert_eq!(all.data[0].movement_type, MovementType::Transfer);

        let for_a = harness
            .ledger
            .list(
                MovementFilter {
                    product_id: Some(a.id),
                    ..MovementFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(for_a.total, 3);

        let ins = harness
            .ledger
            .list(
                MovementFilter {
                    movement_type: Some(MovementType::In),
                    ..MovementFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(ins.total, 2);

        // Total stays at 5 no matter how the pages are cut.
        let mut seen = Vec::new();
        for offset in [0u32, 2, 4] {
            let page = harness
                .ledger
                .list(
                    MovementFilter::default(),
                    Pagination::new(Some(2), Some(offset)),
                )
                .await
                .unwrap();
            assert_eq!(page.total, 5);
            assert_eq!(page.has_more, offset + 2 < 5);
            seen.extend(page.data.into_iter().map(|m| m.id));
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);

        let future_only = harness
            .ledger
            .list(
                MovementFilter {
                    occurred_after: Some(Utc::now() + chrono::Duration::hours(1)),
                    ..MovementFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(future_only.total, 0);
        assert!(future_only.data.is_empty());
    }

    #[tokio::test]
    async fn stats_aggregate_activity_by_type_and_reason() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 0).await;

        let records = [
            (MovementType::In, 10, Some(ReasonCategory::Purchase)),
            (MovementType::In, 5, Some(ReasonCategory::Purchase)),
            (MovementType::Out, 3, Some(ReasonCategory::Sale)),
            (MovementType::Adjustment, 4, None),
            (MovementType::Transfer, 2, Some(ReasonCategory::Other)),
            (MovementType::Adjustment, 9, Some(ReasonCategory::Correction)),
        ];
        for (movement_type, quantity, category) in records {
            harness
                .ledger
                .record(MovementRequest {
                    reason_category: category,
                    ..movement(product.id, movement_type, quantity, "Activity")
                })
                .await
                .unwrap();
        }

        let stats = harness.ledger.stats(None, None).await.unwrap();
        assert_eq!(stats.total_in, 15);
        assert_eq!(stats.total_out, 3);
        assert_eq!(stats.adjustment_count, 2);
        assert_eq!(stats.transfer_count, 1);
        assert_eq!(stats.by_reason[&ReasonCategory::Purchase], 15);
        assert_eq!(stats.by_reason[&ReasonCategory::Sale], 3);
        assert_eq!(stats.by_reason[&ReasonCategory::Other], 2);
        assert_eq!(stats.by_reason[&ReasonCategory::Correction], 9);
        assert!(!stats.by_reason.contains_key(&ReasonCategory::Damage));

        // A window with no activity is all zeros, not an error.
        let empty = harness
            .ledger
            .stats(Some(Utc::now() + chrono::Duration::hours(1)), None)
            .await
            .unwrap();
        assert_eq!(empty, LedgerStats::default());

        let inverted = harness
            .ledger
            .stats(
                Some(Utc::now()),
                Some(Utc::now() - chrono::Duration::hours(1)),
            )
            .await;
        match inverted {
            Err(LedgerError::Domain(DomainError::InvalidArgument(_))) => {}
            other => panic!("Expected InvalidArgument, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replaying_the_history_reproduces_the_stock_level() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 20).await;

        harness
            .ledger
            .record(movement(product.id, MovementType::In, 5, "Delivery"))
            .await
            .unwrap();
        harness
            .ledger
            .record(MovementRequest {
                reason_category: Some(ReasonCategory::InventoryCount),
                ..movement(product.id, MovementType::Adjustment, 10, "Recount")
            })
            .await
            .unwrap();
        harness
            .ledger
            .record(movement(product.id, MovementType::Out, 4, "Sale"))
            .await
            .unwrap();

        let history = harness.movements.load_for_product(product.id).await.unwrap();
        assert_eq!(history.len(), 4); // initial stock + three explicit movements
        assert_eq!(replay_stock(&history), 6);
        assert_eq!(stock_of(&harness, product.id).await, 6);

        // Each record's delta also chains onto the previous snapshot.
        for pair in history.windows(2) {
            assert_eq!(pair[0].stock_after, pair[1].stock_before);
        }

        let recent = harness.ledger.recent_for_product(product.id, 2).await.unwrap();
        assert_eq!(recent.total, 4);
        assert_eq!(recent.data.len(), 2);
        assert_eq!(recent.data[0].stock_after, 6);
    }

    #[tokio::test]
    async fn rebuild_restores_a_diverged_stock_level() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;
        harness
            .ledger
            .record(movement(product.id, MovementType::Out, 3, "Sale"))
            .await
            .unwrap();

        // Simulate divergence by writing a bogus level straight to the store.
        let mut corrupted = harness.products.get(product.id).await.unwrap().unwrap();
        corrupted.stock_current = 999;
        harness
            .products
            .update(corrupted, ExpectedVersion::Any)
            .await
            .unwrap();
        assert_eq!(stock_of(&harness, product.id).await, 999);

        let level = harness.ledger.rebuild_stock(product.id).await.unwrap();
        assert_eq!(level, 7);
        assert_eq!(stock_of(&harness, product.id).await, 7);

        // A second rebuild is a no-op.
        assert_eq!(harness.ledger.rebuild_stock(product.id).await.unwrap(), 7);
    }

    /// Product store whose updates always lose the version check, standing in
    /// for a writer that slipped in from outside the lock registry.
    struct StaleProductStore {
        inner: Arc<InMemoryProductStore>,
    }

    #[async_trait]
    impl ProductStore for StaleProductStore {
        async fn insert(&self, product: Product) -> Result<(), ProductStoreError> {
            self.inner.insert(product).await
        }

        async fn get(&self, id: ProductId) -> Result<Option<Product>, ProductStoreError> {
            self.inner.get(id).await
        }

        async fn update(
            &self,
            product: Product,
            _expected: ExpectedVersion,
        ) -> Result<(), ProductStoreError> {
            Err(ProductStoreError::Conflict(format!(
                "version check failed for product {}",
                product.id
            )))
        }

        async fn delete(&self, id: ProductId) -> Result<(), ProductStoreError> {
            self.inner.delete(id).await
        }

        async fn find_active_by_code(
            &self,
            code: &str,
            exclude: Option<ProductId>,
        ) -> Result<Option<Product>, ProductStoreError> {
            self.inner.find_active_by_code(code, exclude).await
        }

        async fn find_active_by_barcode(
            &self,
            barcode: &str,
            exclude: Option<ProductId>,
        ) -> Result<Option<Product>, ProductStoreError> {
            self.inner.find_active_by_barcode(barcode, exclude).await
        }

        async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductStoreError> {
            self.inner.list(filter).await
        }
    }

    #[tokio::test]
    async fn cas_conflict_leaves_the_appended_movement_for_rebuild() {
        let movements = Arc::new(InMemoryMovementStore::new());
        let products = Arc::new(InMemoryProductStore::new());
        let locks = Arc::new(ProductLocks::new());

        let product = Product::create(ProductId::new(), draft("CAS-1", 0), Utc::now()).unwrap();
        products.insert(product.clone()).await.unwrap();

        let conflicted = StockLedger::new(
            movements.clone(),
            StaleProductStore {
                inner: products.clone(),
            },
            locks.clone(),
        );
        let result = conflicted
            .record(movement(product.id, MovementType::In, 5, "Delivery"))
            .await;
        match result {
            Err(LedgerError::Products(ProductStoreError::Conflict(_))) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }

        // The movement was appended before the stock write lost the version
        // check, so the ledger is ahead of the materialized level.
        let history = movements.load_for_product(product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(
            products.get(product.id).await.unwrap().unwrap().stock_current,
            0
        );

        // Rebuilding against the real store reconciles from the ledger.
        let ledger = StockLedger::new(movements.clone(), products.clone(), locks);
        assert_eq!(ledger.rebuild_stock(product.id).await.unwrap(), 5);
        assert_eq!(
            products.get(product.id).await.unwrap().unwrap().stock_current,
            5
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_out_movements_drain_stock_exactly() {
        let harness = setup();
        let product = seed(&harness, "CONC-1", 32).await;
        let ledger = Arc::clone(&harness.ledger);

        let mut handles = Vec::new();
        for _ in 0..40 {
            let ledger = Arc::clone(&ledger);
            let product_id = product.id;
            handles.push(tokio::spawn(async move {
                ledger
                    .record(movement(product_id, MovementType::Out, 1, "Drain"))
                    .await
            }));
        }

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(recorded) => {
                    assert!(recorded.stock_after >= 0);
                    accepted += 1;
                }
                Err(LedgerError::Domain(DomainError::InsufficientStock { .. })) => rejected += 1,
                Err(e) => panic!("Unexpected error: {e:?}"),
            }
        }

        assert_eq!(accepted, 32);
        assert_eq!(rejected, 8);
        assert_eq!(stock_of(&harness, product.id).await, 0);

        // The ledger agrees with the drained level.
        let history = harness.movements.load_for_product(product.id).await.unwrap();
        assert_eq!(replay_stock(&history), 0);
    }

    #[tokio::test]
    async fn stock_edit_through_catalog_is_recorded_as_adjustment() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;

        harness
            .catalog
            .update(
                product.id,
                &ProductPatch {
                    stock_current: Some(15),
                    name: Some("Renamed Product".to_string()),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        let history = movements_eventually(&harness.movements, product.id, 2).await;
        let recorded = history.last().unwrap();
        assert_eq!(recorded.movement_type, MovementType::Adjustment);
        assert_eq!(recorded.quantity, 5);
        assert_eq!(recorded.stock_before, 10);
        assert_eq!(recorded.stock_after, 15);
        assert_eq!(
            recorded.reason,
            "Product update: stock changed from 10 to 15"
        );
        let comments = recorded.comments.as_deref().unwrap();
        assert!(comments.contains("stock_current: 10 -> 15"));
        assert!(comments.contains("name: Test Product -> Renamed Product"));
    }

    #[tokio::test]
    async fn detail_only_edit_records_a_zero_quantity_adjustment() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;

        harness
            .catalog
            .update(
                product.id,
                &ProductPatch {
                    location: Some(Some("Aisle 9".to_string())),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        let history = movements_eventually(&harness.movements, product.id, 2).await;
        let recorded = history.last().unwrap();
        assert_eq!(recorded.quantity, 0);
        assert_eq!(recorded.stock_before, recorded.stock_after);
        assert_eq!(recorded.reason, "Product update: product details changed");
    }

    #[tokio::test]
    async fn no_op_update_records_nothing() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 10).await;

        harness
            .catalog
            .update(product.id, &ProductPatch::default())
            .await
            .unwrap();

        // Give the recorder time to (not) act.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let history = harness.movements.load_for_product(product.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn creation_with_initial_stock_is_recorded() {
        let harness = setup();
        let product = seed(&harness, "WID-1", 25).await;

        let history = harness.movements.load_for_product(product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement_type, MovementType::Adjustment);
        assert_eq!(history[0].reason, "Initial stock");
        assert_eq!(history[0].stock_before, 0);
        assert_eq!(history[0].stock_after, 25);

        // A zero-stock creation leaves the ledger empty.
        let empty = seed(&harness, "WID-2", 0).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let history = harness.movements.load_for_product(empty.id).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn code_uniqueness_is_scoped_to_active_products() {
        let harness = setup();
        let first = seed(&harness, "UNIQ-1", 0).await;

        match harness.catalog.create(draft("UNIQ-1", 0)).await {
            Err(LedgerError::Domain(DomainError::Validation(msg))) => {
                assert!(msg.contains("already in use"));
            }
            other => panic!("Expected Validation, got {other:?}"),
        }

        // Deactivating frees the code.
        harness.catalog.deactivate(first.id).await.unwrap();
        harness.catalog.create(draft("UNIQ-1", 0)).await.unwrap();

        // Reactivating would collide with the new holder.
        match harness.catalog.activate(first.id).await {
            Err(LedgerError::Domain(DomainError::Validation(_))) => {}
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn barcode_uniqueness_is_enforced_among_active_products() {
        let harness = setup();
        let mut with_barcode = draft("BAR-1", 0);
        with_barcode.barcode = Some("7501031311309".to_string());
        harness.catalog.create(with_barcode).await.unwrap();

        let mut duplicate = draft("BAR-2", 0);
        duplicate.barcode = Some("7501031311309".to_string());
        match harness.catalog.create(duplicate).await {
            Err(LedgerError::Domain(DomainError::Validation(msg))) => {
                assert!(msg.contains("barcode"));
            }
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_is_refused_once_history_exists() {
        let harness = setup();
        let product = seed(&harness, "DEL-1", 5).await;

        match harness.catalog.delete(product.id).await {
            Err(LedgerError::Domain(DomainError::Conflict(msg))) => {
                assert!(msg.contains("movement history"));
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }
        // Deactivation is the supported path.
        harness.catalog.deactivate(product.id).await.unwrap();

        let fresh = seed(&harness, "DEL-2", 0).await;
        harness.catalog.delete(fresh.id).await.unwrap();
        match harness.catalog.find(fresh.id).await {
            Err(LedgerError::Domain(DomainError::NotFound { .. })) => {}
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_stock_is_flagged_and_oversell_is_refused() {
        let harness = setup();
        let mut low_draft = draft("LOW-1", 20);
        low_draft.stock_min = Some(5);
        let product = harness.catalog.create(low_draft).await.unwrap();
        movements_eventually(&harness.movements, product.id, 1).await;
        assert!(!product.is_low_stock());

        harness
            .ledger
            .record(movement(product.id, MovementType::Out, 18, "Big order"))
            .await
            .unwrap();
        assert_eq!(stock_of(&harness, product.id).await, 2);

        let low = harness
            .catalog
            .list(&ProductFilter {
                low_stock: true,
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, product.id);

        match harness
            .ledger
            .record(movement(product.id, MovementType::Out, 5, "Another order"))
            .await
        {
            Err(LedgerError::Domain(DomainError::InsufficientStock {
                available,
                requested,
            })) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(stock_of(&harness, product.id).await, 2);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                // Each case spins up a runtime and a full harness.
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: any number of concurrent unit `OUT` movements drains
            /// a product to the sequential-equivalent level: exactly
            /// min(initial, writers) are accepted, the rest fail with
            /// insufficient stock, and the ledger replays to the final level.
            #[test]
            fn concurrent_unit_outs_match_the_sequential_result(
                initial in 0i64..48,
                writers in 1usize..48,
            ) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                let (accepted, rejected, level, replayed) = rt.block_on(async move {
                    let harness = setup();
                    let product = seed(&harness, "PROP-1", initial).await;

                    let mut handles = Vec::new();
                    for _ in 0..writers {
                        let ledger = Arc::clone(&harness.ledger);
                        let product_id = product.id;
                        handles.push(tokio::spawn(async move {
                            ledger
                                .record(movement(product_id, MovementType::Out, 1, "Drain"))
                                .await
                        }));
                    }

                    let mut accepted = 0i64;
                    let mut rejected = 0i64;
                    for handle in handles {
                        match handle.await.unwrap() {
                            Ok(recorded) => {
                                assert!(recorded.stock_after >= 0);
                                accepted += 1;
                            }
                            Err(LedgerError::Domain(DomainError::InsufficientStock { .. })) => {
                                rejected += 1;
                            }
                            Err(e) => panic!("Unexpected error: {e:?}"),
                        }
                    }

                    let level = stock_of(&harness, product.id).await;
                    let history = harness
                        .movements
                        .load_for_product(product.id)
                        .await
                        .unwrap();
                    (accepted, rejected, level, replay_stock(&history))
                });

                let expected_accepted = initial.min(writers as i64);
                prop_assert_eq!(accepted, expected_accepted);
                prop_assert_eq!(rejected, writers as i64 - expected_accepted);
                prop_assert_eq!(level, initial - expected_accepted);
                prop_assert_eq!(replayed, level);
            }
        }
    }
}
