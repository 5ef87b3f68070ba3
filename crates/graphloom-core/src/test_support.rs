//! Test support: connectors with injected failures and a small Northwind data set

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{StoreError, StoreResult};
use crate::record::InMemoryRecordSource;
use crate::store::{ConstraintOutcome, GraphStore, Node, NodeRef, StoreConnector, UpsertOutcome};
use crate::value::{NodeKey, Properties};

/// Refuses the first `refusals` connections, then delegates
pub struct UnavailableConnector {
    inner: Arc<dyn StoreConnector>,
    refusals: u32,
    attempts: AtomicU32,
}

impl UnavailableConnector {
    pub fn new(inner: impl StoreConnector + 'static, refusals: u32) -> Self {
        Self {
            inner: Arc::new(inner),
            refusals,
            attempts: AtomicU32::new(0),
        }
    }

    /// Connection attempts seen so far, refused or not
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for UnavailableConnector {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.refusals {
            return Err(StoreError::connection(format!("connection refused (attempt {})", attempt)));
        }
        self.inner.connect().await
    }

    fn describe(&self) -> String {
        format!("unavailable({})", self.inner.describe())
    }
}

/// Store wrapper whose writes start failing once a budget is used up
pub struct FailingStore {
    inner: Box<dyn GraphStore>,
    writes_left: AtomicU64,
}

impl FailingStore {
    pub fn new(inner: Box<dyn GraphStore>, writes_before_failure: u64) -> Self {
        Self {
            inner,
            writes_left: AtomicU64::new(writes_before_failure),
        }
    }

    fn spend_write(&self) -> StoreResult<()> {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::connection("connection reset by peer"))
    }
}

#[async_trait]
impl GraphStore for FailingStore {
    async fn ensure_unique_constraint(&self, label: &str, property: &str) -> StoreResult<ConstraintOutcome> {
        self.inner.ensure_unique_constraint(label, property).await
    }

    async fn upsert_node(&self, label: &str, key: &NodeKey, properties: &Properties) -> StoreResult<UpsertOutcome> {
        self.spend_write()?;
        self.inner.upsert_node(label, key, properties).await
    }

    async fn node(&self, label: &str, key: &NodeKey) -> StoreResult<Option<Node>> {
        self.inner.node(label, key).await
    }

    async fn upsert_relationship(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<UpsertOutcome> {
        self.spend_write()?;
        self.inner.upsert_relationship(rel_type, from, to).await
    }

    async fn relationship_exists(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<bool> {
        self.inner.relationship_exists(rel_type, from, to).await
    }

    async fn node_count(&self, label: &str) -> StoreResult<u64> {
        self.inner.node_count(label).await
    }

    async fn relationship_count(&self, rel_type: &str) -> StoreResult<u64> {
        self.inner.relationship_count(rel_type).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

/// Hands out a [`FailingStore`] on the first connection only
pub struct FailingConnector {
    inner: Arc<dyn StoreConnector>,
    writes_before_failure: u64,
    connections: AtomicU32,
}

impl FailingConnector {
    pub fn new(inner: impl StoreConnector + 'static, writes_before_failure: u64) -> Self {
        Self {
            inner: Arc::new(inner),
            writes_before_failure,
            connections: AtomicU32::new(0),
        }
    }

    pub fn connections(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for FailingConnector {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>> {
        let store = self.inner.connect().await?;
        if self.connections.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(Box::new(FailingStore::new(store, self.writes_before_failure)));
        }
        Ok(store)
    }

    fn describe(&self) -> String {
        format!("failing({})", self.inner.describe())
    }
}

/// Cancels a token once a write budget is used up, counting closed connections
///
/// Writes still go through, so the step in flight finishes before the
/// orchestrator notices the cancellation.
pub struct CancellingConnector {
    inner: Arc<dyn StoreConnector>,
    cancel: CancellationToken,
    writes_left: Arc<AtomicU64>,
    closes: Arc<AtomicU32>,
}

impl CancellingConnector {
    pub fn new(inner: impl StoreConnector + 'static, cancel: CancellationToken, writes_before_cancel: u64) -> Self {
        Self {
            inner: Arc::new(inner),
            cancel,
            writes_left: Arc::new(AtomicU64::new(writes_before_cancel)),
            closes: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Connections closed so far
    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for CancellingConnector {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>> {
        Ok(Box::new(CancellingStore {
            inner: self.inner.connect().await?,
            cancel: self.cancel.clone(),
            writes_left: Arc::clone(&self.writes_left),
            closes: Arc::clone(&self.closes),
        }))
    }

    fn describe(&self) -> String {
        format!("cancelling({})", self.inner.describe())
    }
}

struct CancellingStore {
    inner: Box<dyn GraphStore>,
    cancel: CancellationToken,
    writes_left: Arc<AtomicU64>,
    closes: Arc<AtomicU32>,
}

impl CancellingStore {
    fn spend_write(&self) {
        let spent = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if matches!(spent, Ok(1) | Err(_)) {
            self.cancel.cancel();
        }
    }
}

#[async_trait]
impl GraphStore for CancellingStore {
    async fn ensure_unique_constraint(&self, label: &str, property: &str) -> StoreResult<ConstraintOutcome> {
        self.inner.ensure_unique_constraint(label, property).await
    }

    async fn upsert_node(&self, label: &str, key: &NodeKey, properties: &Properties) -> StoreResult<UpsertOutcome> {
        let outcome = self.inner.upsert_node(label, key, properties).await;
        self.spend_write();
        outcome
    }

    async fn node(&self, label: &str, key: &NodeKey) -> StoreResult<Option<Node>> {
        self.inner.node(label, key).await
    }

    async fn upsert_relationship(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<UpsertOutcome> {
        let outcome = self.inner.upsert_relationship(rel_type, from, to).await;
        self.spend_write();
        outcome
    }

    async fn relationship_exists(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<bool> {
        self.inner.relationship_exists(rel_type, from, to).await
    }

    async fn node_count(&self, label: &str) -> StoreResult<u64> {
        self.inner.node_count(label).await
    }

    async fn relationship_count(&self, rel_type: &str) -> StoreResult<u64> {
        self.inner.relationship_count(rel_type).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

type Table = (&'static str, &'static [&'static str], &'static [&'static [&'static str]]);

/// A miniature Northwind extract
///
/// Loads 18 nodes (3 customers, 3 orders, 4 products, 2 suppliers,
/// 3 categories, 3 reviews) and 15 edges. One order references the missing
/// customer C9, one product the missing category 8 and one review the
/// missing order 99999; order 10248 appears twice.
const NORTHWIND_TABLES: &[Table] = &[
    (
        "customers",
        &["customerID", "companyName", "contactName", "city", "country", "fax"],
        &[
            &["C1", "Alfreds Futterkiste", "Maria Anders", "Berlin", "Germany", "030-0076545"],
            &["C2", "Ana Trujillo Emparedados", "Ana Trujillo", "México D.F.", "Mexico", ""],
            &["C3", "Antonio Moreno Taquería", "Antonio Moreno", "México D.F.", "Mexico", ""],
        ],
    ),
    (
        "orders",
        &[
            "orderID",
            "customerID",
            "productID",
            "numProduct",
            "unitPrice",
            "quantity",
            "discount",
            "orderDate",
            "requiredDate",
            "shippedDate",
            "shipCity",
            "shipCountry",
        ],
        &[
            &["10248", "C1", "11", "3", "14", "12", "0", "7/4/1996", "8/1/1996", "7/16/1996", "Reims", "France"],
            &["10248", "C1", "42", "3", "9.8", "10", "0", "7/4/1996", "8/1/1996", "7/16/1996", "Reims", "France"],
            &["10249", "C9", "14", "2", "18", "9", "0", "7/5/1996", "8/16/1996", "", "Münster", "Germany"],
            &["10250", "C2", "41", "1", "7", "10", "0.15", "7/8/1996", "8/5/1996", "7/12/1996", "Rio de Janeiro", "Brazil"],
        ],
    ),
    (
        "products",
        &[
            "productID",
            "productName",
            "supplierID",
            "categoryID",
            "quantityPerUnit",
            "unitPrice",
            "unitsInStock",
            "unitsOnOrder",
            "reorderLevel",
            "discontinued",
        ],
        &[
            &["11", "Queso Cabrales", "1", "4", "1 kg pkg.", "21", "22", "30", "30", "0"],
            &["14", "Tofu", "2", "7", "40 - 100 g pkgs.", "23.25", "35", "0", "0", "0"],
            &["41", "Jack's New England Clam Chowder", "2", "8", "12 - 12 oz cans", "9.65", "85", "0", "10", "0"],
            &["42", "Singaporean Hokkien Fried Mee", "1", "5", "32 - 1 kg pkgs.", "14", "26", "0", "0", "1"],
        ],
    ),
    (
        "suppliers",
        &["supplierID", "companyName", "contactName", "city", "country"],
        &[
            &["1", "Exotic Liquids", "Charlotte Cooper", "London", "UK"],
            &["2", "Tokyo Traders", "Yoshi Nagase", "Tokyo", "Japan"],
        ],
    ),
    (
        "categories",
        &["categoryID", "categoryName", "description"],
        &[
            &["4", "Dairy Products", "Cheeses"],
            &["5", "Grains/Cereals", "Breads, crackers, pasta, and cereal"],
            &["7", "Produce", "Dried fruit and bean curd"],
        ],
    ),
    (
        "reviews",
        &["reviewID", "orderID", "reviews"],
        &[
            &["1", "10248", "Arrived quickly, cheese was excellent"],
            &["2", "10250", "Chowder cans were dented"],
            &["3", "99999", "Never received"],
        ],
    ),
];

/// The miniature Northwind extract as in-memory tables named after each source
pub fn northwind_sample() -> InMemoryRecordSource {
    let source = InMemoryRecordSource::new();
    for (name, headers, rows) in NORTHWIND_TABLES {
        source.add_table(name, headers, rows);
    }
    source
}

/// Locations for [`northwind_sample`]: each source name maps to itself
pub fn northwind_locations() -> HashMap<String, String> {
    NORTHWIND_TABLES
        .iter()
        .map(|(name, _, _)| (name.to_string(), name.to_string()))
        .collect()
}

/// Write the miniature extract as `<source>.csv` files under `dir`
///
/// Returns the location of every written file keyed by source name.
pub fn write_northwind_csv(dir: &Path) -> std::io::Result<HashMap<String, String>> {
    let mut locations = HashMap::new();
    for (name, headers, rows) in NORTHWIND_TABLES {
        let path = dir.join(format!("{}.csv", name));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(*headers)?;
        for row in *rows {
            writer.write_record(*row)?;
        }
        writer.flush()?;
        locations.insert(name.to_string(), path.display().to_string());
    }
    Ok(locations)
}
