//! Compiling and fitting a Keras model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind, tensorflow};
use crate::utils::{python_bool, python_string};
use crate::{Environment, Import, Variable};

/// A Keras optimizer and its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Optimizer {
    Adam {
        learning_rate: f64,
        beta_1: f64,
        beta_2: f64,
        epsilon: f64,
        amsgrad: bool,
    },
    Ftrl {
        learning_rate: f64,
        learning_rate_power: f64,
        initial_accumulator_value: f64,
        l1_regularization_strength: f64,
        l2_regularization_strength: f64,
        l2_shrinkage_regularization_strength: f64,
    },
    #[serde(rename = "rmsprop")]
    RmsProp {
        learning_rate: f64,
        rho: f64,
        momentum: f64,
        epsilon: f64,
        centered: bool,
    },
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Adam {
            learning_rate: 0.001,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-7,
            amsgrad: false,
        }
    }
}

impl Optimizer {
    /// A Python expression constructing this optimizer.
    pub fn code(&self) -> String {
        match self {
            Optimizer::Adam {
                learning_rate,
                beta_1,
                beta_2,
                epsilon,
                amsgrad,
            } => format!(
                "tf.keras.optimizers.Adam({learning_rate:?}, {beta_1:?}, {beta_2:?}, {epsilon:?}, {})",
                python_bool(*amsgrad)
            ),
            Optimizer::Ftrl {
                learning_rate,
                learning_rate_power,
                initial_accumulator_value,
                l1_regularization_strength,
                l2_regularization_strength,
                l2_shrinkage_regularization_strength,
            } => format!(
                "tf.keras.optimizers.Ftrl({learning_rate:?}, {learning_rate_power:?}, \
                 {initial_accumulator_value:?}, {l1_regularization_strength:?}, \
                 {l2_regularization_strength:?}, 'Ftrl', {l2_shrinkage_regularization_strength:?})"
            ),
            Optimizer::RmsProp {
                learning_rate,
                rho,
                momentum,
                epsilon,
                centered,
            } => format!(
                "tf.keras.optimizers.RMSprop({learning_rate:?}, {rho:?}, {momentum:?}, {epsilon:?}, {})",
                python_bool(*centered)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    #[default]
    SparseCategoricalCrossentropy,
}

impl Loss {
    pub fn code(self) -> &'static str {
        match self {
            Loss::SparseCategoricalCrossentropy => "tf.keras.losses.sparse_categorical_crossentropy",
        }
    }
}

/// Prepares a model for training.
pub struct CompileModelTask {
    core: TaskCore,
    pub model_input: Required<Variable>,
    pub optimizer: Required<Optimizer>,
    pub loss: Required<Loss>,
    /// Metric names, kept in the given order.
    pub metrics: Vec<String>,
}

impl TaskFactory for CompileModelTask {
    const KIND: TaskKind = TaskKind::CompileModel;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            model_input: Required::new("model_input"),
            optimizer: Required::new("optimizer"),
            loss: Required::new("loss"),
            metrics: Vec::new(),
        }
    }
}

impl Task for CompileModelTask {
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
        Ok(BTreeSet::new())
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([tensorflow()])
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        let metrics = self
            .metrics
            .iter()
            .map(|metric| python_string(metric))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "{}.compile(\n    optimizer={},\n    loss={},\n    metrics=[{metrics}]\n)",
            self.model_input.get()?,
            self.optimizer.get()?.code(),
            self.loss.get()?.code(),
        ))
    }
}

/// How much `fit` prints while training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Silent,
    ProgressBar,
    #[default]
    OneLinePerEpoch,
}

impl Verbosity {
    pub fn level(self) -> u8 {
        match self {
            Verbosity::Silent => 0,
            Verbosity::ProgressBar => 1,
            Verbosity::OneLinePerEpoch => 2,
        }
    }
}

/// Fits a compiled model to training data.
///
/// Validation data is optional, but `validation_input` and
/// `validation_output` have to be set together. When they are set they take
/// precedence over `validation_split`.
pub struct TrainTask {
    core: TaskCore,
    pub model_input: Required<Variable>,
    pub train_input: Required<Variable>,
    pub train_output: Required<Variable>,
    pub validation_split: f64,
    pub validation_input: Option<Variable>,
    pub validation_output: Option<Variable>,
    /// Callback objects, passed in this order.
    pub callbacks: Vec<Variable>,
    /// Leave unset for datasets and generators.
    pub batch_size: Option<u32>,
    pub epochs: u32,
    pub verbose: Verbosity,
    pub shuffle: bool,
}

impl TaskFactory for TrainTask {
    const KIND: TaskKind = TaskKind::Train;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            model_input: Required::new("model_input"),
            train_input: Required::new("train_input"),
            train_output: Required::new("train_output"),
            validation_split: 0.0,
            validation_input: None,
            validation_output: None,
            callbacks: Vec::new(),
            batch_size: None,
            epochs: 1,
            verbose: Verbosity::default(),
            shuffle: true,
        }
    }
}

impl Task for TrainTask {
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
        let mut inputs = BTreeSet::from([
            self.model_input.get()?.clone(),
            self.train_input.get()?.clone(),
            self.train_output.get()?.clone(),
        ]);
        inputs.extend(self.callbacks.iter().cloned());
        inputs.extend(self.validation_input.clone());
        inputs.extend(self.validation_output.clone());
        Ok(inputs)
    }

    fn outputs(&self) -> Result<BTreeSet<Variable>, UninitializedFieldError> {
        Ok(BTreeSet::new())
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::new()
    }

    fn check(&self) -> Result<bool, UninitializedFieldError> {
        let paired = self.validation_input.is_some() == self.validation_output.is_some();
        let split = (0.0..1.0).contains(&self.validation_split);

        Ok(paired && split && self.epochs > 0)
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        let batch_size = match self.batch_size {
            Some(size) => size.to_string(),
            None => "None".to_string(),
        };

        let callbacks = self
            .callbacks
            .iter()
            .map(Variable::name)
            .collect::<Vec<_>>()
            .join(", ");

        let validation = match (&self.validation_input, &self.validation_output) {
            (Some(x), Some(y)) => format!("\n    validation_data=({x}, {y}),"),
            _ => String::new(),
        };

        Ok(format!(
            "{}.fit(\n    {},\n    {},\n    batch_size={batch_size},\n    epochs={},\n    \
             verbose={},\n    callbacks=[{callbacks}],\n    validation_split={:?},{validation}\n    \
             shuffle={}\n)",
            self.model_input.get()?,
            self.train_input.get()?,
            self.train_output.get()?,
            self.epochs,
            self.verbose.level(),
            self.validation_split,
            python_bool(self.shuffle),
        ))
    }
}
