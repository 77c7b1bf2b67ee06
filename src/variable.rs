use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::container::Named;
use crate::core::ArcStr;
use crate::validator::VariableNameValidator;

/// A named slot standing for a value in the generated script.
///
/// Variables are cheap to clone. Tasks hold clones as references to the
/// same slot, equality and hashing only look at the name.
#[derive(Clone)]
pub struct Variable {
    name: ArcStr,
    validator: Arc<dyn VariableNameValidator>,
}

impl Variable {
    pub fn new(name: impl Into<ArcStr>, validator: Arc<dyn VariableNameValidator>) -> Self {
        Self {
            name: name.into(),
            validator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_configured_correctly(&self) -> bool {
        self.validator.is_valid_variable_name(&self.name)
    }
}

impl Named for Variable {
    fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Debug for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Variable({})", self.name)
    }
}
