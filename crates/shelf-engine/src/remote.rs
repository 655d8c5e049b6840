//! Collaborator seams: the authoritative store, the product catalog, and the
//! session's edit policy.

use std::collections::HashMap;

use async_trait::async_trait;
use shelf_ids::{FixtureId, ProductId, SlotId};
use thiserror::Error;

use crate::Product;

/// Failure reported by a remote collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The store could not be reached or timed out.
    #[error("unreachable: {0}")]
    Unavailable(String),
    /// The store answered but refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Authoritative slot storage.
///
/// Every call is independent: the store offers no multi-slot transaction.
/// Some deployments only expose writes to reads after a delay; callers absorb
/// that with the refresh retry policy rather than a fixed sleep.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write `product` into `slot`, overwriting any occupant.
    async fn assign(&self, product: &ProductId, slot: SlotId) -> Result<(), RemoteError>;

    /// Clear `slot`. Succeeds without effect when the slot is already empty.
    async fn unassign(&self, slot: SlotId) -> Result<(), RemoteError>;

    /// Read the full occupancy of a fixture. Empty slots are absent.
    async fn read_fixture_occupancy(
        &self,
        fixture: FixtureId,
    ) -> Result<HashMap<SlotId, ProductId>, RemoteError>;
}

/// Product catalog lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve a product id to its display record.
    async fn product(&self, id: &ProductId) -> Option<Product>;
}

/// Map-backed catalog.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    /// Products by id.
    products: HashMap<ProductId, Product>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    /// Number of known products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// True when the catalog knows no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn product(&self, id: &ProductId) -> Option<Product> {
        self.products.get(id).cloned()
    }
}

/// Decides whether the current session may stage edits on a fixture.
pub trait EditPolicy: Send + Sync {
    /// True when staging is allowed.
    fn can_edit(&self, fixture: FixtureId) -> bool;
}

/// Policy that permits every edit.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl EditPolicy for AllowAll {
    fn can_edit(&self, _fixture: FixtureId) -> bool {
        true
    }
}
