use std::collections::BTreeSet;

use crate::error::UninitializedFieldError;
use crate::task::{Task, TaskCore, TaskFactory, TaskKind};
use crate::{Environment, Import, Variable};

/// Emits nothing. Useful as a join point that depends on several tasks.
#[derive(Debug)]
pub struct EmptyTask {
    core: TaskCore,
}

impl TaskFactory for EmptyTask {
    const KIND: TaskKind = TaskKind::Empty;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
        }
    }
}

impl Task for EmptyTask {
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
        BTreeSet::new()
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok(String::new())
    }
}
