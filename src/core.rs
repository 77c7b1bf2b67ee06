use std::sync::Arc;

use crate::UniqueNameGenerator;
use crate::validator::{
    DefaultImportValidator, DefaultPathValidator, ImportValidator, PathValidator,
    PythonNameValidator, VariableNameValidator,
};

/// Atomic reference-counted string type used for identifiers.
pub(crate) type ArcStr = Arc<str>;

/// Everything a generation run needs from the outside world.
///
/// Validators are injected here once and threaded into every variable and
/// task the generator creates. The name generator is shared: clone the
/// `Environment` (or hand the same `Arc` to several environments) to keep
/// generated names unique across generators running in parallel.
///
/// ```rust
/// use scriptgen::Environment;
/// use scriptgen::validator::PathValidator;
///
/// let env = Environment::default()
///     .with_path_validator(|path: &str| path.ends_with(".h5"));
///
/// assert!(env.paths().is_valid_path_name("model.h5"));
/// assert!(!env.paths().is_valid_path_name("model.onnx"));
/// ```
#[derive(Clone)]
pub struct Environment {
    names: Arc<UniqueNameGenerator>,
    variable_names: Arc<dyn VariableNameValidator>,
    paths: Arc<dyn PathValidator>,
    imports: Arc<dyn ImportValidator>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            names: Arc::new(UniqueNameGenerator::new()),
            variable_names: Arc::new(PythonNameValidator),
            paths: Arc::new(DefaultPathValidator),
            imports: Arc::new(DefaultImportValidator),
        }
    }

    pub fn with_names(mut self, names: Arc<UniqueNameGenerator>) -> Self {
        self.names = names;
        self
    }

    pub fn with_variable_name_validator(
        mut self,
        validator: impl VariableNameValidator + 'static,
    ) -> Self {
        self.variable_names = Arc::new(validator);
        self
    }

    pub fn with_path_validator(mut self, validator: impl PathValidator + 'static) -> Self {
        self.paths = Arc::new(validator);
        self
    }

    pub fn with_import_validator(mut self, validator: impl ImportValidator + 'static) -> Self {
        self.imports = Arc::new(validator);
        self
    }

    pub fn names(&self) -> &Arc<UniqueNameGenerator> {
        &self.names
    }

    pub fn variable_names(&self) -> &Arc<dyn VariableNameValidator> {
        &self.variable_names
    }

    pub fn paths(&self) -> &Arc<dyn PathValidator> {
        &self.paths
    }

    pub fn imports(&self) -> &Arc<dyn ImportValidator> {
        &self.imports
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
