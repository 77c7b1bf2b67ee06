use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::Import;
use crate::task::TaskId;
use crate::nel::Nel;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid import string: '{0}'")]
    Import(String),

    #[error("Import string '{0}' has an empty component")]
    EmptyComponent(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Cannot add domain object with name '{0}' because that name is already present.")]
    DuplicateName(String),

    #[error("This container cannot instantiate the abstract kind '{0}'.")]
    AbstractKind(&'static str),
}

/// A required field was read before the configuration callback assigned it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Field '{field}' was read before it was assigned")]
pub struct UninitializedFieldError {
    pub field: &'static str,
}

/// A required field was assigned more than once.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Field '{field}' has already been assigned")]
pub struct ReassignedFieldError {
    pub field: &'static str,
}

/// A single problem found while generating a script.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Cannot add domain object with name '{0}' because that name is already present.")]
    DuplicateName(String),

    #[error("Task '{task}' is not fully configured: {source}")]
    Uninitialized {
        task: String,
        source: UninitializedFieldError,
    },

    #[error("{kind} task '{name}' is configured incorrectly.")]
    InvalidTask { name: String, kind: &'static str },

    #[error("Variable '{0}' is configured incorrectly.")]
    InvalidVariable(String),

    #[error("Import '{0}' failed validation.")]
    InvalidImport(Import),

    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("Nothing should depend on the last task '{last}'. These tasks depend on it: {}", .dependents.join(", "))]
    DependsOnLastTask {
        last: String,
        dependents: Vec<String>,
    },

    #[error("Task '{task}' depends on a task that is not in this generator.")]
    DanglingDependency { task: String },

    #[error("The {marker} marker refers to task {id}, which is not in this generator.")]
    UnknownMarker { marker: &'static str, id: TaskId },

    #[error("Required variable '{0}' is not produced by any task.")]
    MissingRequiredVariable(String),

    #[error("Configuration failed: {0:#}")]
    Configuration(anyhow::Error),
}

impl GenerateError {
    /// Maps an error escaping a configuration callback back onto a structured
    /// kind when the library raised it.
    pub(crate) fn from_configuration(error: anyhow::Error) -> Self {
        if let Some(ContainerError::DuplicateName(name)) = error.downcast_ref::<ContainerError>() {
            return GenerateError::DuplicateName(name.clone());
        }

        if let Some(parse) = error.downcast_ref::<ParseError>() {
            return GenerateError::Parse(parse.clone());
        }

        if let Some(source) = error.downcast_ref::<UninitializedFieldError>() {
            return GenerateError::Uninitialized {
                task: "<configuration>".to_string(),
                source: source.clone(),
            };
        }

        GenerateError::Configuration(error)
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, GenerateError::Uninitialized { .. })
    }
}

/// Every error collected by one call to [`ScriptGenerator::code`].
///
/// [`ScriptGenerator::code`]: crate::ScriptGenerator::code
#[derive(Debug)]
pub struct GenerationErrors(pub(crate) Nel<GenerateError>);

impl GenerationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerateError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Nel<GenerateError> {
        self.0
    }
}

impl Display for GenerationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Script generation failed with {} error(s):", self.len())?;
        for error in self.0.iter() {
            writeln!(f, "  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GenerationErrors {}
