use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kardex_core::ProductId;
use kardex_infra::{
    catalog::ProductCatalog,
    ledger::{LedgerError, StockLedger},
    locks::ProductLocks,
    movement_store::{
        InMemoryMovementStore, LedgerStats, MovementFilter, MovementPage, Pagination,
        PostgresMovementStore,
    },
    product_store::{InMemoryProductStore, PostgresProductStore, ProductFilter},
    recorder::AdjustmentRecorder,
};
use kardex_movements::{InventoryMovement, MovementRequest};
use kardex_products::{Product, ProductDraft, ProductPatch};

// Type-erased engine over the in-memory stores
type InMemoryLedger = StockLedger<Arc<InMemoryMovementStore>, Arc<InMemoryProductStore>>;
type InMemoryCatalog = ProductCatalog<Arc<InMemoryMovementStore>, Arc<InMemoryProductStore>>;

// Type-erased engine over Postgres
type PersistentLedger = StockLedger<Arc<PostgresMovementStore>, Arc<PostgresProductStore>>;
type PersistentCatalog = ProductCatalog<Arc<PostgresMovementStore>, Arc<PostgresProductStore>>;

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        ledger: Arc<InMemoryLedger>,
        catalog: Arc<InMemoryCatalog>,
    },
    Persistent {
        ledger: Arc<PersistentLedger>,
        catalog: Arc<PersistentCatalog>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        return build_persistent_services().await;
    }

    build_in_memory_services()
}

fn build_in_memory_services() -> AppServices {
    // In-memory wiring (dev/test): both engines share one lock registry and
    // the recorder feeds the same movement store the ledger appends to.
    let movements = Arc::new(InMemoryMovementStore::new());
    let products = Arc::new(InMemoryProductStore::new());
    let locks = Arc::new(ProductLocks::new());
    let recorder = AdjustmentRecorder::spawn(movements.clone());

    let ledger = Arc::new(StockLedger::new(
        movements.clone(),
        products.clone(),
        locks.clone(),
    ));
    let catalog = Arc::new(ProductCatalog::new(movements, products, locks, recorder));

    AppServices::InMemory { ledger, catalog }
}

async fn build_persistent_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = Arc::new(
        PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to Postgres"),
    );

    let movements = Arc::new(PostgresMovementStore::new(pool.clone()));
    let products = Arc::new(PostgresProductStore::new(pool));
    let locks = Arc::new(ProductLocks::new());
    let recorder = AdjustmentRecorder::spawn(movements.clone());

    let ledger = Arc::new(StockLedger::new(
        movements.clone(),
        products.clone(),
        locks.clone(),
    ));
    let catalog = Arc::new(ProductCatalog::new(movements, products, locks, recorder));

    AppServices::Persistent { ledger, catalog }
}

impl AppServices {
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.create(draft).await,
            AppServices::Persistent { catalog, .. } => catalog.create(draft).await,
        }
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.find(id).await,
            AppServices::Persistent { catalog, .. } => catalog.find(id).await,
        }
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.list(filter).await,
            AppServices::Persistent { catalog, .. } => catalog.list(filter).await,
        }
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.update(id, patch).await,
            AppServices::Persistent { catalog, .. } => catalog.update(id, patch).await,
        }
    }

    pub async fn activate_product(&self, id: ProductId) -> Result<Product, LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.activate(id).await,
            AppServices::Persistent { catalog, .. } => catalog.activate(id).await,
        }
    }

    pub async fn deactivate_product(&self, id: ProductId) -> Result<Product, LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.deactivate(id).await,
            AppServices::Persistent { catalog, .. } => catalog.deactivate(id).await,
        }
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), LedgerError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.delete(id).await,
            AppServices::Persistent { catalog, .. } => catalog.delete(id).await,
        }
    }

    pub async fn record_movement(
        &self,
        request: MovementRequest,
    ) -> Result<InventoryMovement, LedgerError> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.record(request).await,
            AppServices::Persistent { ledger, .. } => ledger.record(request).await,
        }
    }

    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, LedgerError> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.list(filter, pagination).await,
            AppServices::Persistent { ledger, .. } => ledger.list(filter, pagination).await,
        }
    }

    pub async fn movement_stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, LedgerError> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.stats(from, to).await,
            AppServices::Persistent { ledger, .. } => ledger.stats(from, to).await,
        }
    }

    pub async fn product_movements(
        &self,
        id: ProductId,
        limit: u32,
    ) -> Result<MovementPage, LedgerError> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.recent_for_product(id, limit).await,
            AppServices::Persistent { ledger, .. } => ledger.recent_for_product(id, limit).await,
        }
    }

    pub async fn rebuild_stock(&self, id: ProductId) -> Result<i64, LedgerError> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.rebuild_stock(id).await,
            AppServices::Persistent { ledger, .. } => ledger.rebuild_stock(id).await,
        }
    }
}
