use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::UninitializedFieldError;
use crate::task::{Required, Task, TaskCore, TaskFactory, TaskKind, tensorflow};
use crate::{Environment, Import, Variable};

/// The datasets bundled with `tf.keras.datasets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleDataset {
    BostonHousing,
    Cifar10,
    Cifar100,
    FashionMnist,
    Imdb,
    Mnist,
    Reuters,
}

impl ExampleDataset {
    /// The module name under `tf.keras.datasets`.
    pub fn module(self) -> &'static str {
        match self {
            ExampleDataset::BostonHousing => "boston_housing",
            ExampleDataset::Cifar10 => "cifar10",
            ExampleDataset::Cifar100 => "cifar100",
            ExampleDataset::FashionMnist => "fashion_mnist",
            ExampleDataset::Imdb => "imdb",
            ExampleDataset::Mnist => "mnist",
            ExampleDataset::Reuters => "reuters",
        }
    }
}

impl Display for ExampleDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.module())
    }
}

/// Loads the train and test splits of an example dataset.
pub struct LoadExampleDatasetTask {
    core: TaskCore,
    pub dataset: Required<ExampleDataset>,
    pub x_train_output: Required<Variable>,
    pub y_train_output: Required<Variable>,
    pub x_test_output: Required<Variable>,
    pub y_test_output: Required<Variable>,
}

impl TaskFactory for LoadExampleDatasetTask {
    const KIND: TaskKind = TaskKind::LoadExampleDataset;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            dataset: Required::new("dataset"),
            x_train_output: Required::new("x_train_output"),
            y_train_output: Required::new("y_train_output"),
            x_test_output: Required::new("x_test_output"),
            y_test_output: Required::new("y_test_output"),
        }
    }
}

impl Task for LoadExampleDatasetTask {
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
        Ok(BTreeSet::from([
            self.x_train_output.get()?.clone(),
            self.y_train_output.get()?.clone(),
            self.x_test_output.get()?.clone(),
            self.y_test_output.get()?.clone(),
        ]))
    }

    fn imports(&self) -> BTreeSet<Import> {
        BTreeSet::from([tensorflow()])
    }

    /// The four outputs are unpacked from one tuple, so they must differ.
    fn check(&self) -> Result<bool, UninitializedFieldError> {
        Ok(self.outputs()?.len() == 4)
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok(format!(
            "({}, {}), ({}, {}) = tf.keras.datasets.{}.load_data()",
            self.x_train_output.get()?,
            self.y_train_output.get()?,
            self.x_test_output.get()?,
            self.y_test_output.get()?,
            self.dataset.get()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(names: [&str; 4]) -> LoadExampleDatasetTask {
        let env = Environment::default();
        let [a, b, c, d] = names.map(|name| Variable::new(name, env.variable_names().clone()));

        let mut task = LoadExampleDatasetTask::new("data", &env);
        task.dataset.set(ExampleDataset::FashionMnist).unwrap();
        task.x_train_output.set(a).unwrap();
        task.y_train_output.set(b).unwrap();
        task.x_test_output.set(c).unwrap();
        task.y_test_output.set(d).unwrap();
        task
    }

    #[test]
    fn test_load_dataset_code() {
        let task = task(["x_train", "y_train", "x_test", "y_test"]);

        assert_eq!(task.is_configured_correctly(), Ok(true));
        assert_eq!(
            task.code().unwrap(),
            "(x_train, y_train), (x_test, y_test) = tf.keras.datasets.fashion_mnist.load_data()"
        );
    }

    #[test]
    fn test_outputs_must_differ() {
        let task = task(["x", "y", "x", "y_test"]);
        assert_eq!(task.is_configured_correctly(), Ok(false));
    }

    #[test]
    fn test_dataset_names() {
        let dataset: ExampleDataset = serde_json::from_str(r#""boston_housing""#).unwrap();
        assert_eq!(dataset, ExampleDataset::BostonHousing);
        assert_eq!(ExampleDataset::Cifar100.to_string(), "cifar100");
    }
}
