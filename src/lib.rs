#![forbid(unsafe_code)]
//! A dependency-graph based script generator.
//!
//! Scripts are described declaratively: a configuration block registers
//! [`Variable`]s and [`Task`]s in a [`ScriptGenerator`], wires tasks together
//! through their explicit dependencies, and the generator then validates the
//! whole graph and emits a single Python script in dependency order.
//!
//! ```rust,no_run
//! use scriptgen::{Environment, ScriptGenerator, Task};
//! use scriptgen::task::{LoadModelTask, RunInferenceTask};
//!
//! let generator = ScriptGenerator::new(Environment::default(), |script| {
//!     let model = script.variables.create("model")?;
//!     let image = script.variables.create("image")?;
//!     let prediction = script.variables.create("prediction")?;
//!
//!     let load = script.tasks.create::<LoadModelTask>("load", |task| {
//!         task.model_path.set("model.h5".to_string())?;
//!         task.model_output.set(model.clone())?;
//!         Ok(())
//!     })?;
//!
//!     script.tasks.create::<RunInferenceTask>("infer", |task| {
//!         task.model.set(model.clone())?;
//!         task.input.set(image.clone())?;
//!         task.output.set(prediction.clone())?;
//!         task.dependencies_mut().insert(load);
//!         Ok(())
//!     })?;
//!
//!     Ok(())
//! });
//!
//! match generator.code(false) {
//!     Ok(script) => println!("{script}"),
//!     Err(errors) => eprintln!("{errors}"),
//! }
//! ```

pub mod collaborator;
pub mod container;
mod core;
mod error;
mod generator;
mod import;
mod names;
mod nel;
pub mod pattern;
pub mod task;
mod utils;
pub mod validator;
mod variable;

pub use crate::core::Environment;
pub use crate::error::*;
pub use crate::generator::ScriptGenerator;
pub use crate::import::Import;
pub use crate::names::UniqueNameGenerator;
pub use crate::nel::Nel;
pub use crate::task::{Task, TaskId, TaskKind};
#[cfg(feature = "logging")]
pub use crate::utils::{init_logging, init_logging_with_default};
pub use crate::variable::Variable;
