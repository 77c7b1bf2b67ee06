//! Interfaces to the world outside the generator.
//!
//! None of these are used while generating a script. They provide what a
//! caller typically needs around it: running the script, looking up plugin
//! sources and reading model descriptions.

mod model;
mod plugin;
mod runner;

pub use model::{JsonModelLoader, ModelDescription, ModelLoader};
pub use plugin::{InMemoryPluginStore, Plugin, PluginStore};
pub use runner::{ProcessOutput, PythonRunner, ScriptRunner};
