use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::task::Layer;

/// The parts of a stored model that scripts are generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub name: String,
    /// The model file handed to the generated script.
    pub path: Utf8PathBuf,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Utf8Path) -> anyhow::Result<ModelDescription>;
}

/// Reads model descriptions from JSON sidecar files.
///
/// A relative `path` inside the description is resolved against the
/// directory of the description itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelLoader;

impl ModelLoader for JsonModelLoader {
    fn load(&self, path: &Utf8Path) -> anyhow::Result<ModelDescription> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model description {path}"))?;

        let mut model: ModelDescription = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse model description {path}"))?;

        if model.path.is_relative()
            && let Some(parent) = path.parent()
        {
            model.path = parent.join(&model.path);
        }

        tracing::debug!(model = %model.name, layers = model.layers.len(), "loaded model description");

        Ok(model)
    }
}
