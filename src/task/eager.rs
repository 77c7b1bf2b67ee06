use std::collections::BTreeSet;

use crate::error::UninitializedFieldError;
use crate::task::{Task, TaskCore, TaskFactory, TaskKind, tensorflow};
use crate::{Environment, Import, Variable};

/// Switches TensorFlow 1.x into eager mode. Meant to run once per script,
/// see [`Tasks::run_exactly_once`](crate::container::Tasks::run_exactly_once).
#[derive(Debug)]
pub struct EnableEagerExecutionTask {
    core: TaskCore,
}

impl TaskFactory for EnableEagerExecutionTask {
    const KIND: TaskKind = TaskKind::EnableEagerExecution;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
        }
    }
}

impl Task for EnableEagerExecutionTask {
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
        Ok(BTreeSet::new())
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([tensorflow()])
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok("tf.compat.v1.enable_eager_execution()".to_string())
    }
}
