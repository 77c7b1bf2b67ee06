//! Keras callbacks handed to [`TrainTask`](crate::task::TrainTask).

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind, tensorflow};
use crate::utils::{python_bool, python_string};
use crate::validator::PathValidator;
use crate::{Environment, Import, Variable};

/// When `ModelCheckpoint` writes a checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFrequency {
    #[default]
    Epoch,
    /// After this many batches.
    Batches(u32),
}

impl SaveFrequency {
    fn code(self) -> String {
        match self {
            SaveFrequency::Epoch => python_string("epoch"),
            SaveFrequency::Batches(batches) => batches.to_string(),
        }
    }
}

/// Creates a `ModelCheckpoint` callback, making its directory first.
pub struct CheckpointCallbackTask {
    core: TaskCore,
    /// May contain Keras placeholders such as `{epoch:02d}`.
    pub file_path: Required<String>,
    pub monitor: String,
    pub verbose: bool,
    pub save_best_only: bool,
    /// One of `auto`, `min` or `max`.
    pub mode: String,
    pub save_weights_only: bool,
    pub save_frequency: SaveFrequency,
    pub load_weights_on_restart: bool,
    pub output: Required<Variable>,
    paths: Arc<dyn PathValidator>,
}

impl TaskFactory for CheckpointCallbackTask {
    const KIND: TaskKind = TaskKind::CheckpointCallback;

    fn new(name: &str, env: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            file_path: Required::new("file_path"),
            monitor: "val_loss".into(),
            verbose: false,
            save_best_only: false,
            mode: "auto".into(),
            save_weights_only: false,
            save_frequency: SaveFrequency::default(),
            load_weights_on_restart: false,
            output: Required::new("output"),
            paths: env.paths().clone(),
        }
    }
}

impl Task for CheckpointCallbackTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn kind(&self) -> TaskKind {
        Self::KIND
    }

    fn inputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::new())
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::from([self.output.get()?.clone()]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([
            tensorflow(),
            Import::module("os"),
            Import::module("errno"),
            Import::ModuleAndIdentifier {
                module: "pathlib".into(),
                identifier: "Path".into(),
            },
        ])
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        let mode = matches!(self.mode.as_str(), "auto" | "min" | "max");
        Ok(mode && self.paths.is_valid_path_name(self.file_path.get()?))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        let path = python_string(self.file_path.get()?);

        Ok(format!(
            "try:
    os.makedirs(Path({path}).parent)
except OSError as err:
    if err.errno != errno.EEXIST:
        raise

{} = tf.keras.callbacks.ModelCheckpoint(
    {path},
    monitor={},
    verbose={},
    save_best_only={},
    save_weights_only={},
    mode={},
    save_freq={},
    load_weights_on_restart={}
)",
            self.output.get()?,
            python_string(&self.monitor),
            u8::from(self.verbose),
            python_bool(self.save_best_only),
            python_bool(self.save_weights_only),
            python_string(&self.mode),
            self.save_frequency.code(),
            python_bool(self.load_weights_on_restart),
        ))
    }
}

/// Creates a `CSVLogger` callback streaming epoch results to a file.
pub struct CsvLoggerCallbackTask {
    core: TaskCore,
    pub log_file_path: Required<String>,
    pub separator: char,
    /// Append to an existing file instead of overwriting it.
    pub append: bool,
    pub output: Required<Variable>,
    paths: Arc<dyn PathValidator>,
}

impl TaskFactory for CsvLoggerCallbackTask {
    const KIND: TaskKind = TaskKind::CsvLoggerCallback;

    fn new(name: &str, env: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            log_file_path: Required::new("log_file_path"),
            separator: ',',
            append: false,
            output: Required::new("output"),
            paths: env.paths().clone(),
        }
    }
}

impl Task for CsvLoggerCallbackTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn kind(&self) -> TaskKind {
        Self::KIND
    }

    fn inputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::new())
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::from([self.output.get()?.clone()]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([tensorflow()])
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        Ok(self.paths.is_valid_path_name(self.log_file_path.get()?))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok(format!(
            "{} = tf.keras.callbacks.CSVLogger(\n    {},\n    separator={},\n    append={}\n)",
            self.output.get()?,
            python_string(self.log_file_path.get()?),
            python_string(&self.separator.to_string()),
            python_bool(self.append),
        ))
    }
}
