use super::SiteStore;
use crate::error::{AdLayersError, Result};
use crate::model::{AdLayer, PostId};
use serde_json::Value;
use std::collections::BTreeMap;

/// Non-persistent store for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    options: BTreeMap<String, Value>,
    layers: BTreeMap<PostId, AdLayer>,
    last_id: u64,
    fail_layer_writes: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save_layer` fail.
    pub fn fail_layer_writes(&mut self, fail: bool) {
        self.fail_layer_writes = fail;
    }
}

impl SiteStore for InMemoryStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.options.get(name).cloned())
    }

    fn update_option(&mut self, name: &str, value: Value) -> Result<()> {
        self.options.insert(name.to_string(), value);
        Ok(())
    }

    fn delete_option(&mut self, name: &str) -> Result<()> {
        self.options.remove(name);
        Ok(())
    }

    fn save_layer(&mut self, layer: &AdLayer) -> Result<()> {
        if self.fail_layer_writes {
            return Err(AdLayersError::Store(format!(
                "Could not write ad layer {}",
                layer.id
            )));
        }
        self.last_id = self.last_id.max(layer.id.get());
        self.layers.insert(layer.id, layer.clone());
        Ok(())
    }

    fn get_layer(&self, id: PostId) -> Result<AdLayer> {
        self.layers
            .get(&id)
            .cloned()
            .ok_or(AdLayersError::LayerNotFound(id))
    }

    fn list_layers(&self) -> Result<Vec<AdLayer>> {
        Ok(self.layers.values().cloned().collect())
    }

    fn delete_layer(&mut self, id: PostId) -> Result<()> {
        self.layers
            .remove(&id)
            .map(|_| ())
            .ok_or(AdLayersError::LayerNotFound(id))
    }

    fn allocate_id(&mut self) -> Result<PostId> {
        self.last_id += 1;
        Ok(PostId(self.last_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostStatus;
    use serde_json::json;

    #[test]
    fn save_and_get_layer() {
        let mut store = InMemoryStore::new();
        let id = store.allocate_id().unwrap();
        let layer = AdLayer::new(id, "Home", PostStatus::Publish);
        store.save_layer(&layer).unwrap();
        assert_eq!(store.get_layer(id).unwrap(), layer);
        assert_eq!(store.list_layers().unwrap().len(), 1);
    }

    #[test]
    fn ids_never_collide_with_saved_layers() {
        let mut store = InMemoryStore::new();
        store
            .save_layer(&AdLayer::new(PostId(40), "Imported", PostStatus::Draft))
            .unwrap();
        assert_eq!(store.allocate_id().unwrap(), PostId(41));
    }

    #[test]
    fn delete_missing_layer_errors() {
        let mut store = InMemoryStore::new();
        assert!(matches!(
            store.delete_layer(PostId(3)),
            Err(AdLayersError::LayerNotFound(_))
        ));
    }

    #[test]
    fn options_roundtrip() {
        let mut store = InMemoryStore::new();
        store.update_option("x", json!([1, 2])).unwrap();
        assert_eq!(store.get_option("x").unwrap(), Some(json!([1, 2])));
        store.delete_option("x").unwrap();
        assert_eq!(store.get_option("x").unwrap(), None);
    }

    #[test]
    fn simulated_write_failure() {
        let mut store = InMemoryStore::new();
        store.fail_layer_writes(true);
        let layer = AdLayer::new(PostId(1), "A", PostStatus::Publish);
        assert!(store.save_layer(&layer).is_err());
    }
}
