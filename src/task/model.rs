use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind, tensorflow};
use crate::utils::python_string;
use crate::validator::PathValidator;
use crate::{Environment, Import, Variable};

/// Loads a Keras model from an HDF5 file.
pub struct LoadModelTask {
    core: TaskCore,
    /// The file to load the model from.
    pub model_path: Required<String>,
    /// The variable the model is stored in.
    pub model_output: Required<Variable>,
    paths: Arc<dyn PathValidator>,
}

impl TaskFactory for LoadModelTask {
    const KIND: TaskKind = TaskKind::LoadModel;

    fn new(name: &str, env: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            model_path: Required::new("model_path"),
            model_output: Required::new("model_output"),
            paths: env.paths().clone(),
        }
    }
}

impl Task for LoadModelTask {
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
        Ok(BTreeSet::from([self.model_output.get()?.clone()]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([tensorflow()])
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        Ok(self.paths.is_valid_path_name(self.model_path.get()?))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok(format!(
            "{} = tf.keras.models.load_model({})",
            self.model_output.get()?,
            python_string(self.model_path.get()?)
        ))
    }
}

/// Saves a Keras model to an HDF5 file.
pub struct SaveModelTask {
    core: TaskCore,
    /// The model to save.
    pub model_input: Required<Variable>,
    /// Where to save it.
    pub model_path: Required<String>,
    paths: Arc<dyn PathValidator>,
}

impl TaskFactory for SaveModelTask {
    const KIND: TaskKind = TaskKind::SaveModel;

    fn new(name: &str, env: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            model_input: Required::new("model_input"),
            model_path: Required::new("model_path"),
            paths: env.paths().clone(),
        }
    }
}

impl Task for SaveModelTask {
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
        Ok(BTreeSet::from([self.model_input.get()?.clone()]))
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::new())
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::new()
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        Ok(self.paths.is_valid_path_name(self.model_path.get()?))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok(format!(
            "{}.save({})",
            self.model_input.get()?,
            python_string(self.model_path.get()?)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, env: &Environment) -> Variable {
        Variable::new(name, env.variable_names().clone())
    }

    #[test]
    fn test_load_model_code() {
        let env = Environment::default();
        let mut task = LoadModelTask::new("load", &env);
        task.model_path.set("model.h5".into()).unwrap();
        task.model_output.set(variable("model", &env)).unwrap();

        assert_eq!(task.is_configured_correctly(), Ok(true));
        assert_eq!(
            task.code().unwrap(),
            r#"model = tf.keras.models.load_model("model.h5")"#
        );
        assert_eq!(
            task.imports(),
            BTreeSet::from([Import::parse("import tensorflow as tf").unwrap()])
        );
    }

    #[test]
    fn test_load_model_rejected_path() {
        let env = Environment::default().with_path_validator(|_: &str| false);
        let mut task = LoadModelTask::new("load", &env);
        task.model_path.set("model.h5".into()).unwrap();
        task.model_output.set(variable("model", &env)).unwrap();

        assert_eq!(task.is_configured_correctly(), Ok(false));
    }

    #[test]
    fn test_load_model_without_output() {
        let env = Environment::default();
        let mut task = LoadModelTask::new("load", &env);
        task.model_path.set("model.h5".into()).unwrap();

        assert_eq!(
            task.is_configured_correctly(),
            Err(UninitializedFieldError {
                field: "model_output"
            })
        );
        assert!(task.code().is_err());
    }

    #[test]
    fn test_save_model_code() {
        let env = Environment::default();
        let mut task = SaveModelTask::new("save", &env);
        task.model_input.set(variable("new_model", &env)).unwrap();
        task.model_path.set(r#"out/"quoted".h5"#.into()).unwrap();

        assert_eq!(
            task.code().unwrap(),
            r#"new_model.save("out/\"quoted\".h5")"#
        );
        assert_eq!(task.outputs().unwrap().len(), 0);
    }
}
