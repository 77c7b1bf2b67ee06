use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind};
use crate::utils::python_string;
use crate::validator::PathValidator;
use crate::{Environment, Import, Variable};

/// Loads an image from a file with Pillow.
pub struct LoadImageTask {
    core: TaskCore,
    pub image_path: Required<String>,
    pub image_output: Required<Variable>,
    paths: Arc<dyn PathValidator>,
}

impl TaskFactory for LoadImageTask {
    const KIND: TaskKind = TaskKind::LoadImage;

    fn new(name: &str, env: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            image_path: Required::new("image_path"),
            image_output: Required::new("image_output"),
            paths: env.paths().clone(),
        }
    }
}

impl Task for LoadImageTask {
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
        Ok(BTreeSet::from([self.image_output.get()?.clone()]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([Import::ModuleAndIdentifier {
            module: "PIL".into(),
            identifier: "Image".into(),
        }])
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        Ok(self.paths.is_valid_path_name(self.image_path.get()?))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok(format!(
            "{} = Image.open({})",
            self.image_output.get()?,
            python_string(self.image_path.get()?)
        ))
    }
}
