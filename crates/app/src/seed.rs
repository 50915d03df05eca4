use std::future::Future;

use rand::Rng;
use thiserror::Error;
use tracing::info;

use mkt_init_core::{CatalogGenerator, Product};
use mkt_init_storage::{ProductRepository, StorageError};

/// Where seeded products are written.
pub trait ProductStore {
    fn count(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    fn insert_batch(
        &self,
        products: &[Product],
    ) -> impl Future<Output = Result<usize, StorageError>> + Send;
}

impl ProductStore for ProductRepository {
    async fn count(&self) -> Result<u64, StorageError> {
        ProductRepository::count(self).await
    }

    async fn insert_batch(&self, products: &[Product]) -> Result<usize, StorageError> {
        ProductRepository::insert_batch(self, products).await
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to count existing products: {0}")]
    Count(#[source] StorageError),
    #[error("failed to insert batch {batch}: {source}")]
    Insert {
        batch: usize,
        #[source]
        source: StorageError,
    },
}

/// Tops the product collection up to a target size with generated entries.
pub struct ProductSeeder<S, R> {
    store: S,
    catalog: CatalogGenerator<R>,
    batch_size: usize,
}

impl<S: ProductStore, R: Rng> ProductSeeder<S, R> {
    pub fn new(store: S, rng: R, batch_size: usize) -> Self {
        Self {
            store,
            catalog: CatalogGenerator::new(rng),
            batch_size: batch_size.max(1),
        }
    }

    /// Inserts products until the collection holds `target` documents and
    /// returns how many were created. Does nothing if it already holds enough.
    pub async fn execute(&mut self, target: u64) -> Result<u64, SeedError> {
        let existing = self.store.count().await.map_err(SeedError::Count)?;
        if existing >= target {
            info!(stage = "seed", existing, target, "products already present, skipping seed");
            return Ok(0);
        }

        let to_create = target - existing;
        info!(stage = "seed", to_create, "seeding products");

        let mut batch = Vec::with_capacity(self.batch_size);
        let mut created = 0u64;
        let mut batch_number = 1;

        // Numbering continues after existing documents so names stay unique.
        for offset in 0..to_create {
            batch.push(self.catalog.product((existing + offset) as usize));
            if batch.len() >= self.batch_size {
                created += self.flush(&mut batch, batch_number).await?;
                info!(stage = "seed", batch = batch_number, created, to_create, "batch completed");
                batch_number += 1;
            }
        }

        if !batch.is_empty() {
            created += self.flush(&mut batch, batch_number).await?;
            info!(stage = "seed", batch = batch_number, created, "final batch completed");
        }

        info!(stage = "seed", created, "seeded products");
        Ok(created)
    }

    async fn flush(&self, batch: &mut Vec<Product>, batch_number: usize) -> Result<u64, SeedError> {
        let inserted = self
            .store
            .insert_batch(batch)
            .await
            .map_err(|source| SeedError::Insert {
                batch: batch_number,
                source,
            })?;
        batch.clear();
        Ok(inserted as u64)
    }
}
