//! Tasks: the units of code generation.
//!
//! A [`Task`] is analogous to a function call in the generated script. It
//! reads some [`Variable`]s, assigns others, needs a set of [`Import`]s and may
//! explicitly depend on other tasks. Only the explicit [`Dependencies`] order
//! tasks relative to each other; sharing a variable does not.
//!
//! Concrete kinds are listed in [`TaskKind`], which doubles as the factory
//! used by [`Tasks::create_kind`](crate::container::Tasks::create_kind). The
//! typed entry point is [`TaskFactory`].

mod callback;
mod dataset;
mod eager;
mod empty;
mod image;
mod inference;
mod layer;
mod model;
mod plugin;
mod train;

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};

use crate::error::{ContainerError, ReassignedFieldError, UninitializedFieldError};
use crate::{Environment, Import, Variable};

pub use crate::task::callback::{CheckpointCallbackTask, CsvLoggerCallbackTask, SaveFrequency};
pub use crate::task::dataset::{ExampleDataset, LoadExampleDatasetTask};
pub use crate::task::eager::EnableEagerExecutionTask;
pub use crate::task::empty::EmptyTask;
pub use crate::task::image::LoadImageTask;
pub use crate::task::inference::RunInferenceTask;
pub use crate::task::layer::{ApplyLayerDeltaTask, Layer};
pub use crate::task::model::{LoadModelTask, SaveModelTask};
pub use crate::task::plugin::RunPluginTask;
pub use crate::task::train::{CompileModelTask, Loss, Optimizer, TrainTask, Verbosity};

/// `import tensorflow as tf`
pub(crate) fn tensorflow() -> Import {
    Import::ModuleAndName {
        module: "tensorflow".into(),
        name: "tf".into(),
    }
}

/// A reference to a task inside one generator's task container.
///
/// Ids follow declaration order: the task declared first has the smallest id.
/// Each id also records the container that issued it, so an id from another
/// generator never resolves to a local task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    owner: u64,
    index: usize,
}

impl TaskId {
    pub(crate) const fn new(owner: u64, index: usize) -> Self {
        Self { owner, index }
    }

    pub(crate) fn owner(self) -> u64 {
        self.owner
    }

    pub fn index(self) -> usize {
        self.index
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Every kind of task the generator knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// The abstract root of all tasks, never instantiable.
    Base,
    Empty,
    EnableEagerExecution,
    LoadModel,
    SaveModel,
    LoadImage,
    RunInference,
    RunPlugin,
    ApplyLayerDelta,
    LoadExampleDataset,
    CompileModel,
    Train,
    CheckpointCallback,
    CsvLoggerCallback,
}

impl TaskKind {
    pub const ALL: [TaskKind; 14] = [
        TaskKind::Base,
        TaskKind::Empty,
        TaskKind::EnableEagerExecution,
        TaskKind::LoadModel,
        TaskKind::SaveModel,
        TaskKind::LoadImage,
        TaskKind::RunInference,
        TaskKind::RunPlugin,
        TaskKind::ApplyLayerDelta,
        TaskKind::LoadExampleDataset,
        TaskKind::CompileModel,
        TaskKind::Train,
        TaskKind::CheckpointCallback,
        TaskKind::CsvLoggerCallback,
    ];

    pub fn is_abstract(self) -> bool {
        matches!(self, TaskKind::Base)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Base => "Base",
            TaskKind::Empty => "Empty",
            TaskKind::EnableEagerExecution => "EnableEagerExecution",
            TaskKind::LoadModel => "LoadModel",
            TaskKind::SaveModel => "SaveModel",
            TaskKind::LoadImage => "LoadImage",
            TaskKind::RunInference => "RunInference",
            TaskKind::RunPlugin => "RunPlugin",
            TaskKind::ApplyLayerDelta => "ApplyLayerDelta",
            TaskKind::LoadExampleDataset => "LoadExampleDataset",
            TaskKind::CompileModel => "CompileModel",
            TaskKind::Train => "Train",
            TaskKind::CheckpointCallback => "CheckpointCallback",
            TaskKind::CsvLoggerCallback => "CsvLoggerCallback",
        }
    }

    pub(crate) fn instantiate(
        self,
        name: &str,
        env: &Environment,
    ) -> Result<Box<dyn Task>, ContainerError> {
        let task: Box<dyn Task> = match self {
            TaskKind::Base => return Err(ContainerError::AbstractKind(self.as_str())),
            TaskKind::Empty => Box::new(EmptyTask::new(name, env)),
            TaskKind::EnableEagerExecution => Box::new(EnableEagerExecutionTask::new(name, env)),
            TaskKind::LoadModel => Box::new(LoadModelTask::new(name, env)),
            TaskKind::SaveModel => Box::new(SaveModelTask::new(name, env)),
            TaskKind::LoadImage => Box::new(LoadImageTask::new(name, env)),
            TaskKind::RunInference => Box::new(RunInferenceTask::new(name, env)),
            TaskKind::RunPlugin => Box::new(RunPluginTask::new(name, env)),
            TaskKind::ApplyLayerDelta => Box::new(ApplyLayerDeltaTask::new(name, env)),
            TaskKind::LoadExampleDataset => Box::new(LoadExampleDatasetTask::new(name, env)),
            TaskKind::CompileModel => Box::new(CompileModelTask::new(name, env)),
            TaskKind::Train => Box::new(TrainTask::new(name, env)),
            TaskKind::CheckpointCallback => Box::new(CheckpointCallbackTask::new(name, env)),
            TaskKind::CsvLoggerCallback => Box::new(CsvLoggerCallbackTask::new(name, env)),
        };

        Ok(task)
    }
}

impl Display for TaskKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The explicit ordering edges of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(BTreeSet<TaskId>);

impl Dependencies {
    pub fn insert(&mut self, task: TaskId) -> bool {
        self.0.insert(task)
    }

    pub fn remove(&mut self, task: TaskId) -> bool {
        self.0.remove(&task)
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.0.contains(&task)
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<TaskId> for Dependencies {
    fn extend<I: IntoIterator<Item = TaskId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// A field that must be assigned exactly once while the task is configured.
pub struct Required<T> {
    field: &'static str,
    value: Option<T>,
}

impl<T> Required<T> {
    pub const fn new(field: &'static str) -> Self {
        Self { field, value: None }
    }

    pub fn set(&mut self, value: T) -> Result<(), ReassignedFieldError> {
        if self.value.is_some() {
            return Err(ReassignedFieldError { field: self.field });
        }

        self.value = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Result<&T, UninitializedFieldError> {
        self.value
            .as_ref()
            .ok_or(UninitializedFieldError { field: self.field })
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl<T: Debug> Debug for Required<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value:?}"),
            None => write!(f, "<uninitialized {}>", self.field),
        }
    }
}

/// State shared by every concrete task.
#[derive(Debug, Clone)]
pub struct TaskCore {
    name: String,
    dependencies: Dependencies,
}

impl TaskCore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Dependencies::default(),
        }
    }
}

/// The capability interface every task kind implements.
pub trait Task: Any + Send + Sync {
    fn core(&self) -> &TaskCore;

    fn core_mut(&mut self) -> &mut TaskCore;

    fn kind(&self) -> TaskKind;

    fn inputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError>;

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError>;

    fn imports(&self) -> BTreeSet<Import>;

    /// The Python code of this task. Must be pure.
    fn code(&self) -> Result<String, UninitializedFieldError>;

    /// Kind-specific validity rules, checked on top of the variables.
    fn check(&self) -> Result<bool, UninitializedFieldError> {
        Ok(true)
    }

    /// Only used to keep tasks unique, never emitted.
    fn name(&self) -> &str {
        &self.core().name
    }

    fn dependencies(&self) -> &Dependencies {
        &self.core().dependencies
    }

    fn dependencies_mut(&mut self) -> &mut Dependencies {
        &mut self.core_mut().dependencies
    }

    fn is_configured_correctly(&self) -> Result<bool, UninitializedFieldError> {
        let inputs = self.inputs()?;
        let outputs = self.outputs()?;

        let variables = inputs
            .iter()
            .chain(outputs.iter())
            .all(Variable::is_configured_correctly);

        Ok(variables && self.check()?)
    }

    /// A multi-line description for logs. Unassigned fields do not fail.
    fn summary(&self) -> String {
        fn names(variables: Result<BTreeSet<Variable>, UninitializedFieldError>) -> String {
            match variables {
                Ok(variables) => variables
                    .iter()
                    .map(Variable::name)
                    .collect::<Vec<_>>()
                    .join(", "),
                Err(_) => "<uninitialized>".to_string(),
            }
        }

        let dependencies = self
            .dependencies()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Task(\n    name={},\n    kind={},\n    inputs=[{}],\n    outputs=[{}],\n    dependencies=[{}]\n)",
            self.name(),
            self.kind(),
            names(self.inputs()),
            names(self.outputs()),
            dependencies,
        )
    }
}

/// A task kind that can be created through the typed container API.
pub trait TaskFactory: Task + Sized {
    const KIND: TaskKind;

    fn new(name: &str, env: &Environment) -> Self;
}
