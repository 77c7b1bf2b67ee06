use std::collections::BTreeMap;
use std::sync::RwLock;

/// Python source providing one or more functions a script can call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Plugin {
    pub name: String,
    pub contents: String,
}

impl Plugin {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// A lookup of plugins by name.
pub trait PluginStore: Send + Sync {
    fn get(&self, name: &str) -> Option<Plugin>;

    /// Every stored plugin, sorted by name.
    fn list(&self) -> Vec<Plugin>;
}

#[derive(Debug, Default)]
pub struct InMemoryPluginStore {
    plugins: RwLock<BTreeMap<String, Plugin>>,
}

impl InMemoryPluginStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the plugin previously stored under the same name.
    pub fn insert(&self, plugin: Plugin) -> Option<Plugin> {
        self.plugins
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(plugin.name.clone(), plugin)
    }
}

impl FromIterator<Plugin> for InMemoryPluginStore {
    fn from_iter<I: IntoIterator<Item = Plugin>>(iter: I) -> Self {
        let plugins = iter
            .into_iter()
            .map(|plugin| (plugin.name.clone(), plugin))
            .collect();

        Self {
            plugins: RwLock::new(plugins),
        }
    }
}

impl PluginStore for InMemoryPluginStore {
    fn get(&self, name: &str) -> Option<Plugin> {
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    fn list(&self) -> Vec<Plugin> {
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}
