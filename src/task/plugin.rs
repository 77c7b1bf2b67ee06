use std::collections::BTreeSet;
use std::sync::Arc;

use crate::collaborator::Plugin;
use crate::error::{ReassignedFieldError, UninitializedFieldError};
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind};
use crate::validator::VariableNameValidator;
use crate::{Environment, Import, Variable};

/// Emits a plugin's function definition and calls it.
///
/// The definition is surrounded by two blank lines so it stays isolated from
/// whatever the neighbouring tasks emit. When there are outputs the call's
/// return value is destructured into them.
pub struct RunPluginTask {
    core: TaskCore,
    /// The function to call, must be a valid identifier.
    pub function_name: Required<String>,
    /// The full function definition.
    pub function_definition: Required<String>,
    pub function_inputs: Required<Vec<Variable>>,
    pub function_outputs: Required<Vec<Variable>>,
    names: Arc<dyn VariableNameValidator>,
}

impl RunPluginTask {
    /// Takes the definition from a plugin and calls `function_name` from it.
    pub fn use_plugin(
        &mut self,
        plugin: &Plugin,
        function_name: &str,
    ) -> Result<(), ReassignedFieldError> {
        self.function_definition.set(plugin.contents.clone())?;
        self.function_name.set(function_name.to_string())
    }
}

impl TaskFactory for RunPluginTask {
    const KIND: TaskKind = TaskKind::RunPlugin;

    fn new(name: &str, env: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            function_name: Required::new("function_name"),
            function_definition: Required::new("function_definition"),
            function_inputs: Required::new("function_inputs"),
            function_outputs: Required::new("function_outputs"),
            names: env.variable_names().clone(),
        }
    }
}

impl Task for RunPluginTask {
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
        Ok(self.function_inputs.get()?.iter().cloned().collect())
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(self.function_outputs.get()?.iter().cloned().collect())
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::new()
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        self.function_definition.get()?;
        Ok(self.names.is_valid_variable_name(self.function_name.get()?))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        fn join(variables: &[Variable]) -> String {
            variables
                .iter()
                .map(Variable::name)
                .collect::<Vec<_>>()
                .join(", ")
        }

        let outputs = self.function_outputs.get()?;
        let assignment = match outputs.is_empty() {
            true => String::new(),
            false => format!("({}) = ", join(outputs)),
        };

        Ok(format!(
            "\n\n{}\n\n\n{assignment}{}({})",
            self.function_definition.get()?,
            self.function_name.get()?,
            join(self.function_inputs.get()?),
        ))
    }
}
