//! Database: a named set of collections.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::collection::Collection;
use crate::error::{Result, VectorDbError};
use crate::schema::CollectionSchema;

/// A Database manages multiple Collections.
pub struct Database {
    name: String,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.read().contains_key(name)
    }

    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn create_collection(&self, schema: CollectionSchema) -> Result<Arc<Collection>> {
        let mut colls = self.collections.write();
        if colls.contains_key(&schema.name) {
            return Err(VectorDbError::CollectionAlreadyExists(schema.name.clone()));
        }
        let name = schema.name.clone();
        let coll = Arc::new(Collection::new(schema)?);
        colls.insert(name.clone(), Arc::clone(&coll));
        info!(database = %self.name, collection = %name, "collection created");
        Ok(coll)
    }

    pub fn describe_collection(&self, name: &str) -> Result<CollectionSchema> {
        self.collection(name).map(|c| c.schema().clone())
    }

    /// Access a collection by name.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| VectorDbError::CollectionNotFound(name.to_string()))
    }

    /// Remove a collection with all its rows and index.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let removed = self.collections.write().remove(name);
        match removed {
            Some(coll) => {
                coll.release();
                info!(database = %self.name, collection = %name, "collection dropped");
                Ok(())
            }
            None => Err(VectorDbError::CollectionNotFound(name.to_string())),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new("default")
    }
}
