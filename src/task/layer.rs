use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind, tensorflow};
use crate::utils::{python_bool, python_string};
use crate::{Environment, Import, Variable};

/// A layer of a Sequential model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Emitted as a `.trainable` assignment when set.
    #[serde(default)]
    pub trainable: Option<bool>,
    /// Python expression building this layer from scratch. Required for layers
    /// that are not already in the starting model.
    #[serde(default)]
    pub constructor: Option<String>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trainable: None,
            constructor: None,
        }
    }

    pub fn trainable(mut self, trainable: bool) -> Self {
        self.trainable = Some(trainable);
        self
    }

    pub fn constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = Some(constructor.into());
        self
    }
}

enum LayerOperation<'a> {
    Copy(&'a Layer),
    Make(&'a str),
}

/// Builds a new Sequential model from the layers of an existing one.
///
/// Layers of `new_layers` that are present in `current_layers` are copied from
/// `model_input`, the rest are built from their constructor. Layers only in
/// `current_layers` are dropped.
pub struct ApplyLayerDeltaTask {
    core: TaskCore,
    pub model_input: Required<Variable>,
    pub current_layers: Required<Vec<Layer>>,
    pub new_layers: Required<Vec<Layer>>,
    pub new_model_output: Required<Variable>,
}

impl ApplyLayerDeltaTask {
    fn operations<'a>(
        current: &'a [Layer],
        new: &'a [Layer],
    ) -> impl Iterator<Item = Option<LayerOperation<'a>>> {
        new.iter().map(move |layer| {
            if current.iter().any(|it| it.name == layer.name) {
                Some(LayerOperation::Copy(layer))
            } else {
                layer
                    .constructor
                    .as_deref()
                    .map(LayerOperation::Make)
            }
        })
    }
}

impl TaskFactory for ApplyLayerDeltaTask {
    const KIND: TaskKind = TaskKind::ApplyLayerDelta;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            model_input: Required::new("model_input"),
            current_layers: Required::new("current_layers"),
            new_layers: Required::new("new_layers"),
            new_model_output: Required::new("new_model_output"),
        }
    }
}

impl Task for ApplyLayerDeltaTask {
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
        Ok(BTreeSet::from([self.model_input.get()?.clone()]))
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::from([self.new_model_output.get()?.clone()]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([tensorflow()])
    }

    /// Every layer that has to be built needs a constructor.
    fn check(&self) -> Result<bool, UninitializedFieldError> {
        let current = self.current_layers.get()?;
        let new = self.new_layers.get()?;

        Ok(Self::operations(current, new).all(|op| op.is_some()))
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        let input = self.model_input.get()?;
        let output = self.new_model_output.get()?;
        let new = self.new_layers.get()?;

        // Layers without a constructor are rejected by `check`.
        let args = Self::operations(self.current_layers.get()?, new)
            .flatten()
            .map(|op| match op {
                LayerOperation::Copy(layer) => {
                    format!("{input}.get_layer({})", python_string(&layer.name))
                }
                LayerOperation::Make(constructor) => constructor.to_string(),
            })
            .collect::<Vec<_>>();

        let sequential = match args.len() {
            0 | 1 => format!("[{}]", args.join("")),
            _ => format!("[\n    {}\n]", args.join(",\n    ")),
        };

        let mut code = format!("{output} = tf.keras.Sequential({sequential})");
        for layer in new {
            if let Some(trainable) = layer.trainable {
                code.push_str(&format!(
                    "\n{output}.get_layer({}).trainable = {}",
                    python_string(&layer.name),
                    python_bool(trainable)
                ));
            }
        }

        Ok(code)
    }
}
