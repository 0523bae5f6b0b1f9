use super::SiteStore;
use crate::error::{AdLayersError, Result};
use crate::model::{AdLayer, PostId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const OPTIONS_FILENAME: &str = "options.json";
const LAYERS_FILENAME: &str = "layers.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LayersFile {
    #[serde(default)]
    last_id: u64,
    #[serde(default)]
    layers: Vec<AdLayer>,
}

/// JSON file storage rooted at a data directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(AdLayersError::Io)?;
        }
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de> + Default>(&self, filename: &str) -> Result<T> {
        let path = self.root.join(filename);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path).map_err(AdLayersError::Io)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&content).map_err(AdLayersError::Serialization)
    }

    fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(value).map_err(AdLayersError::Serialization)?;
        fs::write(self.root.join(filename), content).map_err(AdLayersError::Io)?;
        Ok(())
    }

    fn load_options(&self) -> Result<Map<String, Value>> {
        self.read_json(OPTIONS_FILENAME)
    }

    fn load_layers(&self) -> Result<LayersFile> {
        self.read_json(LAYERS_FILENAME)
    }
}

impl SiteStore for FileStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.load_options()?.remove(name))
    }

    fn update_option(&mut self, name: &str, value: Value) -> Result<()> {
        let mut options = self.load_options()?;
        options.insert(name.to_string(), value);
        tracing::debug!(option = name, "option updated");
        self.write_json(OPTIONS_FILENAME, &options)
    }

    fn delete_option(&mut self, name: &str) -> Result<()> {
        let mut options = self.load_options()?;
        if options.remove(name).is_some() {
            self.write_json(OPTIONS_FILENAME, &options)?;
        }
        Ok(())
    }

    fn save_layer(&mut self, layer: &AdLayer) -> Result<()> {
        let mut file = self.load_layers()?;
        match file.layers.iter_mut().find(|l| l.id == layer.id) {
            Some(existing) => *existing = layer.clone(),
            None => {
                file.layers.push(layer.clone());
                file.layers.sort_by_key(|l| l.id);
            }
        }
        file.last_id = file.last_id.max(layer.id.get());
        self.write_json(LAYERS_FILENAME, &file)
    }

    fn get_layer(&self, id: PostId) -> Result<AdLayer> {
        self.load_layers()?
            .layers
            .into_iter()
            .find(|l| l.id == id)
            .ok_or(AdLayersError::LayerNotFound(id))
    }

    fn list_layers(&self) -> Result<Vec<AdLayer>> {
        Ok(self.load_layers()?.layers)
    }

    fn delete_layer(&mut self, id: PostId) -> Result<()> {
        let mut file = self.load_layers()?;
        let before = file.layers.len();
        file.layers.retain(|l| l.id != id);
        if file.layers.len() == before {
            return Err(AdLayersError::LayerNotFound(id));
        }
        self.write_json(LAYERS_FILENAME, &file)
    }

    fn allocate_id(&mut self) -> Result<PostId> {
        let mut file = self.load_layers()?;
        file.last_id += 1;
        let id = PostId(file.last_id);
        self.write_json(LAYERS_FILENAME, &file)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostStatus;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn persists_options_across_instances() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        store.update_option("ad_layers_custom_variables", json!(["section"])).unwrap();

        let reopened = FileStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.custom_variables().unwrap(), vec!["section"]);
    }

    #[test]
    fn persists_layers() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));
        let id = store.allocate_id().unwrap();
        let mut layer = AdLayer::new(id, "Home", PostStatus::Publish);
        store.save_layer(&layer).unwrap();

        layer.title = "Home page".into();
        store.save_layer(&layer).unwrap();

        let reopened = FileStore::new(dir.path().join("data"));
        let layers = reopened.list_layers().unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].title, "Home page");
        assert_eq!(reopened.get_layer(id).unwrap().id, id);
    }

    #[test]
    fn allocated_ids_are_unique() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        let a = store.allocate_id().unwrap();
        let b = store.allocate_id().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn deleting_unknown_layer_fails() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        assert!(store.delete_layer(PostId(8)).is_err());
    }
}
