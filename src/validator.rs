//! Pluggable predicates gating variable names, file paths and imports.
//!
//! Every validator is a trait so that callers can inject their own rules
//! through [`Environment`](crate::Environment). Plain closures work for the
//! name and path validators.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;

use crate::{Import, Nel};

pub trait VariableNameValidator: Send + Sync {
    fn is_valid_variable_name(&self, name: &str) -> bool;
}

pub trait PathValidator: Send + Sync {
    fn is_valid_path_name(&self, path: &str) -> bool;
}

pub trait ImportValidator: Send + Sync {
    /// Returns the imports unchanged when all of them are valid, otherwise
    /// every offending import.
    fn validate_imports(&self, imports: BTreeSet<Import>) -> Result<BTreeSet<Import>, Nel<Import>>;
}

impl<F> VariableNameValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid_variable_name(&self, name: &str) -> bool {
        self(name)
    }
}

impl<F> PathValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid_path_name(&self, path: &str) -> bool {
        self(path)
    }
}

static PYTHON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\d\W]\w*$").expect("identifier pattern is valid"));

/// Accepts Python identifiers, except for the throwaway name `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonNameValidator;

impl VariableNameValidator for PythonNameValidator {
    fn is_valid_variable_name(&self, name: &str) -> bool {
        name != "_" && PYTHON_IDENTIFIER.is_match(name)
    }
}

/// Accepts any non-blank path that does not name a directory.
///
/// The file does not have to exist yet, scripts often write to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPathValidator;

impl PathValidator for DefaultPathValidator {
    fn is_valid_path_name(&self, path: &str) -> bool {
        if path.trim().is_empty() || path.ends_with('/') || path.ends_with('\\') {
            return false;
        }

        !Utf8Path::new(path).is_dir()
    }
}

/// Rejects imports with whitespace inside any component.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImportValidator;

impl ImportValidator for DefaultImportValidator {
    fn validate_imports(&self, imports: BTreeSet<Import>) -> Result<BTreeSet<Import>, Nel<Import>> {
        let invalid: Vec<Import> = imports
            .iter()
            .filter(|import| {
                import
                    .components()
                    .iter()
                    .any(|component| component.chars().any(char::is_whitespace))
            })
            .cloned()
            .collect();

        match Nel::from_vec(invalid) {
            Some(invalid) => Err(invalid),
            None => Ok(imports),
        }
    }
}
