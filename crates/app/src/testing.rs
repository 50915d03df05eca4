//! In-memory stand-ins for the database seams, shared by the unit tests.

use std::sync::Mutex;

use rand::{rngs::StdRng, SeedableRng};

use mkt_init_core::{
    plan::{product_indexes, DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_ROLE},
    CollectionSpec, DatabaseUser, IndexSpec, Product, ProvisionPlan,
};
use mkt_init_storage::StorageError;

use crate::provision::ProvisionTarget;
use crate::seed::{ProductSeeder, ProductStore};

pub(crate) fn plan(indexes: bool) -> ProvisionPlan {
    let mut collection = CollectionSpec::bare(DEFAULT_COLLECTION);
    if indexes {
        collection = collection.with_indexes(product_indexes());
    }
    ProvisionPlan::new(DEFAULT_DATABASE, "mongo", "mongo123", DEFAULT_ROLE, collection)
}

fn encode_error() -> StorageError {
    let encode = bson::to_bson(&u64::MAX).expect_err("u64::MAX does not fit bson");
    StorageError::Encode(encode)
}

/// Mimics the server's duplicate errors for users and collections.
#[derive(Default)]
pub(crate) struct FakeTarget {
    pub(crate) state: Mutex<FakeState>,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) users: Vec<DatabaseUser>,
    pub(crate) collections: Vec<String>,
    pub(crate) indexes: Vec<String>,
    pub(crate) calls: Vec<&'static str>,
    pub(crate) fail_collection: bool,
}

impl FakeTarget {
    pub(crate) fn failing_collection() -> Self {
        let target = Self::default();
        target.state.lock().unwrap().fail_collection = true;
        target
    }
}

impl ProvisionTarget for FakeTarget {
    fn database_name(&self) -> &str {
        DEFAULT_DATABASE
    }

    async fn create_user(&self, user: &DatabaseUser) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_user");
        if state.users.iter().any(|existing| existing.name == user.name) {
            return Err(StorageError::UserExists(user.name.clone()));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_collection");
        if state.fail_collection {
            return Err(encode_error());
        }
        if state.collections.iter().any(|existing| existing == name) {
            return Err(StorageError::CollectionExists(name.to_string()));
        }
        state.collections.push(name.to_string());
        Ok(())
    }

    async fn create_indexes(
        &self,
        _collection: &str,
        indexes: &[IndexSpec],
    ) -> Result<Vec<String>, StorageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_indexes");
        let names: Vec<String> = indexes.iter().map(|index| index.name.clone()).collect();
        for name in &names {
            if !state.indexes.contains(name) {
                state.indexes.push(name.clone());
            }
        }
        Ok(names)
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) existing: u64,
    pub(crate) inserted: Mutex<Vec<Vec<Product>>>,
    pub(crate) fail_on_batch: Option<usize>,
}

impl MemoryStore {
    pub(crate) fn with_existing(existing: u64) -> Self {
        Self {
            existing,
            ..Self::default()
        }
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.inserted.lock().unwrap().iter().map(Vec::len).collect()
    }
}

impl ProductStore for &MemoryStore {
    async fn count(&self) -> Result<u64, StorageError> {
        let inserted: usize = self.inserted.lock().unwrap().iter().map(Vec::len).sum();
        Ok(self.existing + inserted as u64)
    }

    async fn insert_batch(&self, products: &[Product]) -> Result<usize, StorageError> {
        let mut inserted = self.inserted.lock().unwrap();
        if self.fail_on_batch == Some(inserted.len() + 1) {
            return Err(encode_error());
        }
        inserted.push(products.to_vec());
        Ok(products.len())
    }
}

pub(crate) fn seeder(store: &MemoryStore, batch_size: usize) -> ProductSeeder<&MemoryStore, StdRng> {
    ProductSeeder::new(store, StdRng::seed_from_u64(11), batch_size)
}
