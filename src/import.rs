use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;
use crate::pattern::{Pattern, PatternMatch, Slot};

/// A normalized Python import statement.
///
/// Imports can be parsed from their textual form with [`Import::parse`] (or
/// [`str::parse`]) and render back to canonical syntax with [`Import::code`].
/// They (de)serialize as that canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Import {
    /// `import module`
    ModuleOnly { module: String },
    /// `from module import identifier`
    ModuleAndIdentifier { module: String, identifier: String },
    /// `import module as name`
    ModuleAndName { module: String, name: String },
    /// `from module import identifier as name`
    FullImport {
        module: String,
        identifier: String,
        name: String,
    },
}

impl Import {
    pub fn module(module: impl Into<String>) -> Self {
        Import::ModuleOnly {
            module: module.into(),
        }
    }

    /// The raw tokens of this import, without any syntax.
    pub fn components(&self) -> BTreeSet<&str> {
        match self {
            Import::ModuleOnly { module } => BTreeSet::from([module.as_str()]),
            Import::ModuleAndIdentifier { module, identifier } => {
                BTreeSet::from([module.as_str(), identifier.as_str()])
            }
            Import::ModuleAndName { module, name } => {
                BTreeSet::from([module.as_str(), name.as_str()])
            }
            Import::FullImport {
                module,
                identifier,
                name,
            } => BTreeSet::from([module.as_str(), identifier.as_str(), name.as_str()]),
        }
    }

    /// The canonical Python statement for this import.
    pub fn code(&self) -> String {
        match self {
            Import::ModuleOnly { module } => format!("import {module}"),
            Import::ModuleAndIdentifier { module, identifier } => {
                format!("from {module} import {identifier}")
            }
            Import::ModuleAndName { module, name } => format!("import {module} as {name}"),
            Import::FullImport {
                module,
                identifier,
                name,
            } => format!("from {module} import {identifier} as {name}"),
        }
    }

    /// Parses a Python import statement.
    ///
    /// The text is split on every single whitespace character, so runs of
    /// whitespace produce empty tokens and are rejected.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = text.split(char::is_whitespace).collect();

        let rules = PatternMatch::new()
            .rule(
                Pattern::new([Slot::Literal("import"), Slot::Wildcard]),
                |m| Import::ModuleOnly {
                    module: m.first().to_string(),
                },
            )
            .rule(
                Pattern::new([
                    Slot::Literal("from"),
                    Slot::Wildcard,
                    Slot::Literal("import"),
                    Slot::Wildcard,
                ]),
                |m| Import::ModuleAndIdentifier {
                    module: m.first().to_string(),
                    identifier: m.second().to_string(),
                },
            )
            .rule(
                Pattern::new([
                    Slot::Literal("import"),
                    Slot::Wildcard,
                    Slot::Literal("as"),
                    Slot::Wildcard,
                ]),
                |m| Import::ModuleAndName {
                    module: m.first().to_string(),
                    name: m.second().to_string(),
                },
            )
            .rule(
                Pattern::new([
                    Slot::Literal("from"),
                    Slot::Wildcard,
                    Slot::Literal("import"),
                    Slot::Wildcard,
                    Slot::Literal("as"),
                    Slot::Wildcard,
                ]),
                |m| Import::FullImport {
                    module: m.first().to_string(),
                    identifier: m.second().to_string(),
                    name: m.third().to_string(),
                },
            );

        let import = rules
            .evaluate(&tokens)
            .ok_or_else(|| ParseError::Import(text.to_string()))?;

        if import.components().iter().any(|c| c.is_empty()) {
            return Err(ParseError::EmptyComponent(text.to_string()));
        }

        Ok(import)
    }
}

impl Display for Import {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for Import {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Import::parse(s)
    }
}

impl TryFrom<String> for Import {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Import::parse(&value)
    }
}

impl From<Import> for String {
    fn from(value: Import) -> Self {
        value.code()
    }
}
