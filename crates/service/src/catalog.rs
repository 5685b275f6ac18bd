//! Read-only view of the product catalog. CRUD lives with an external
//! collaborator; the core only ever loads by id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use mol_bhav_types::Product;

use crate::error::ServiceError;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get(&self, product_id: &str) -> Result<Option<Product>, ServiceError>;
}

/// Catalog backed by a map, fed at boot
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: RwLock::new(map),
        }
    }

    pub fn insert(&self, product: Product) {
        self.products.write().unwrap().insert(product.id.clone(), product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get(&self, product_id: &str) -> Result<Option<Product>, ServiceError> {
        Ok(self.products.read().unwrap().get(product_id).cloned())
    }
}
