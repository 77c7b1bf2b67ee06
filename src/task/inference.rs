use std::collections::BTreeSet;

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind};
use crate::{Environment, Import, Variable};

/// Runs a model on some input and stores the prediction.
pub struct RunInferenceTask {
    core: TaskCore,
    /// The model to run inference with.
    pub model: Required<Variable>,
    /// The data given to the model.
    pub input: Required<Variable>,
    /// The variable the prediction is saved to.
    pub output: Required<Variable>,
    /// Passed as `steps=` to `predict` when set.
    pub steps: Option<Variable>,
}

impl TaskFactory for RunInferenceTask {
    const KIND: TaskKind = TaskKind::RunInference;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            model: Required::new("model"),
            input: Required::new("input"),
            output: Required::new("output"),
            steps: None,
        }
    }
}

impl Task for RunInferenceTask {
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
        let mut inputs = BTreeSet::from([self.model.get()?.clone(), self.input.get()?.clone()]);
        inputs.extend(self.steps.clone());
        Ok(inputs)
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::from([self.output.get()?.clone()]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::new()
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        let steps = match &self.steps {
            Some(steps) => format!(", steps={steps}"),
            None => String::new(),
        };

        Ok(format!(
            "{} = {}.predict({}{steps})",
            self.output.get()?,
            self.model.get()?,
            self.input.get()?
        ))
    }
}
