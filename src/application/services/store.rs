//! Loading and saving mind maps as JSON documents.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::editor::MindMap;
use crate::application::export::validate_tree;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::infrastructure::traits::FileSystem;

/// Persists [`MindMap`]s through a [`FileSystem`].
pub struct MapStore {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl MapStore {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Start a new map with a single root node and write it to `path`.
    /// An existing file is only replaced when `overwrite` is set.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, path: &Path, root_text: &str, overwrite: bool) -> ApplicationResult<MindMap> {
        if self.fs.exists(path) && !overwrite {
            return Err(ApplicationError::MapExists {
                path: path.to_path_buf(),
            });
        }
        let mut map = MindMap::new((*self.settings).clone());
        map.create_root(root_text)?;
        self.save(&map, path)?;
        Ok(map)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<MindMap> {
        let value = self.read_value(path)?;
        let mut map = MindMap::new((*self.settings).clone());
        map.import_value(&value)?;
        debug!("load: {} nodes from {}", map.node_count(), path.display());
        Ok(map)
    }

    #[instrument(level = "debug", skip(self, map))]
    pub fn save(&self, map: &MindMap, path: &Path) -> ApplicationResult<()> {
        let json = map.to_json()?;
        self.fs
            .ensure_parent(path)
            .for_map_file("create the directory of", path)?;
        self.fs
            .write(path, &format!("{}\n", json))
            .for_map_file("write", path)?;
        debug!("save: {} nodes to {}", map.node_count(), path.display());
        Ok(())
    }

    /// Check a map file without loading it; returns the number of nodes.
    pub fn validate_file(&self, path: &Path) -> ApplicationResult<usize> {
        let value = self.read_value(path)?;
        validate_tree(&value)?;
        Ok(count_nodes(&value))
    }

    fn read_value(&self, path: &Path) -> ApplicationResult<Value> {
        let content = self
            .fs
            .read_to_string(path)
            .for_map_file("read", path)?;
        serde_json::from_str(&content).map_err(|e| ApplicationError::Json {
            context: path.display().to_string(),
            source: e,
        })
    }
}

fn count_nodes(value: &Value) -> usize {
    1 + value
        .get("children")
        .and_then(Value::as_array)
        .map_or(0, |children| children.iter().map(count_nodes).sum())
}
