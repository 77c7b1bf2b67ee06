use std::collections::BTreeSet;

use scriptgen::collaborator::Plugin;
use scriptgen::task::{
    ApplyLayerDeltaTask, CheckpointCallbackTask, CompileModelTask, EmptyTask,
    EnableEagerExecutionTask, ExampleDataset, Layer, LoadExampleDatasetTask, LoadImageTask,
    LoadModelTask, Loss, Optimizer, RunInferenceTask, RunPluginTask, SaveModelTask, TrainTask,
};
use scriptgen::task::{TaskCore, TaskFactory};
use scriptgen::validator::ImportValidator;
use scriptgen::{
    Environment, GenerateError, Import, Nel, ScriptGenerator, Task, TaskId, TaskKind,
    UninitializedFieldError, Variable,
};

fn env() -> Environment {
    // Paths in these tests never exist on disk.
    Environment::default().with_path_validator(|path: &str| !path.is_empty())
}

fn errors(generator: ScriptGenerator) -> Vec<GenerateError> {
    generator.code(false).unwrap_err().into_inner().into_vec()
}

#[test]
fn dependency_is_emitted_first() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;

        let save = script.tasks.create::<SaveModelTask>("b", |task| {
            task.model_input.set(model.clone())?;
            task.model_path.set("out.h5".into())?;
            Ok(())
        })?;

        let load = script.tasks.create::<LoadModelTask>("a", |task| {
            task.model_path.set("in.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        if let Some(save) = script.tasks.get_mut(save) {
            save.dependencies_mut().insert(load);
        }

        Ok(())
    });

    assert_eq!(
        generator.code(false).unwrap(),
        "import tensorflow as tf\n\
         \n\
         model = tf.keras.models.load_model(\"in.h5\")\n\
         \n\
         model.save(\"out.h5\")"
    );
}

#[test]
fn shared_variables_do_not_order_tasks() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;

        script.tasks.create::<SaveModelTask>("save", |task| {
            task.model_input.set(model.clone())?;
            task.model_path.set("out.h5".into())?;
            Ok(())
        })?;

        script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("in.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        Ok(())
    });

    let script = generator.code(false).unwrap();
    let save = script.find("model.save").unwrap();
    let load = script.find("load_model").unwrap();

    assert!(save < load);
}

#[test]
fn partially_configured_task_emits_nothing() {
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("in.h5".into())?;
            Ok(())
        })?;
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        GenerateError::Uninitialized { task, source } if task == "load" && source.field == "model_output"
    ));
}

#[test]
fn every_error_is_reported() {
    let generator = ScriptGenerator::new(env(), |script| {
        let bad = script.variables.create("not valid")?;

        script.tasks.create::<LoadImageTask>("image", |task| {
            task.image_path.set(String::new())?;
            task.image_output.set(bad.clone())?;
            Ok(())
        })?;

        script.tasks.create::<RunInferenceTask>("infer", |_| Ok(()))?;
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 3);
    assert!(matches!(&errors[0], GenerateError::InvalidVariable(name) if name == "not valid"));
    assert!(matches!(&errors[1], GenerateError::InvalidTask { name, kind: "LoadImage" } if name == "image"));
    assert!(errors[2].is_uninitialized());
}

#[test]
fn duplicate_name_fails_generation() {
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("same", |_| Ok(()))?;
        script.tasks.create::<EnableEagerExecutionTask>("same", |_| Ok(()))?;
        Ok(())
    });

    let errors = errors(generator);
    assert!(matches!(&errors[0], GenerateError::DuplicateName(name) if name == "same"));
}

#[test]
fn abstract_kind_fails_generation() {
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create_kind("base", TaskKind::Base, |_| Ok(()))?;
        Ok(())
    });

    let errors = errors(generator);
    assert!(matches!(&errors[0], GenerateError::Configuration(_)));
    assert!(errors[0].to_string().contains("abstract kind 'Base'"));
}

#[test]
fn cycle_is_reported() {
    let generator = ScriptGenerator::new(env(), |script| {
        let a = script.tasks.create::<EmptyTask>("a", |_| Ok(()))?;
        let b = script.tasks.create::<EmptyTask>("b", |task| {
            task.dependencies_mut().insert(a);
            Ok(())
        })?;

        if let Some(a) = script.tasks.get_mut(a) {
            a.dependencies_mut().insert(b);
        }
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Dependency cycle detected: a -> b -> a"
    );
}

#[test]
fn dangling_dependency_is_reported() {
    let mut foreign: Option<TaskId> = None;
    let _ = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("x", |_| Ok(()))?;
        foreign = Some(script.tasks.create::<EmptyTask>("y", |_| Ok(()))?);
        Ok(())
    });
    let foreign = foreign.unwrap();

    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("a", |task| {
            task.dependencies_mut().insert(foreign);
            Ok(())
        })?;
        Ok(())
    });

    let errors = errors(generator);
    assert!(matches!(&errors[0], GenerateError::DanglingDependency { task } if task == "a"));
}

#[test]
fn foreign_dependency_is_dangling_even_in_range() {
    let mut foreign: Option<TaskId> = None;
    let _ = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("x", |_| Ok(()))?;
        foreign = Some(script.tasks.create::<EmptyTask>("y", |_| Ok(()))?);
        Ok(())
    });
    let foreign = foreign.unwrap();

    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("first", |_| Ok(()))?;
        let second = script.tasks.create::<EmptyTask>("second", |task| {
            task.dependencies_mut().insert(foreign);
            Ok(())
        })?;
        assert_eq!(second.index(), foreign.index());
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], GenerateError::DanglingDependency { task } if task == "second"));
}

#[test]
fn foreign_marker_is_unknown() {
    let mut foreign: Option<TaskId> = None;
    let _ = ScriptGenerator::new(env(), |script| {
        foreign = Some(script.tasks.create::<EmptyTask>("x", |_| Ok(()))?);
        Ok(())
    });

    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("a", |_| Ok(()))?;
        script.last_task = foreign;
        Ok(())
    });

    let errors = errors(generator);
    assert!(matches!(&errors[0], GenerateError::UnknownMarker { marker: "last task", .. }));
}

#[test]
fn last_task_runs_last() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;

        let save = script.tasks.create::<SaveModelTask>("save", |task| {
            task.model_input.set(model.clone())?;
            task.model_path.set("out.h5".into())?;
            Ok(())
        })?;

        script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("in.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        script.last_task = Some(save);
        Ok(())
    });

    let script = generator.code(false).unwrap();
    assert!(script.ends_with("model.save(\"out.h5\")"));
}

#[test]
fn nothing_may_depend_on_last_task() {
    let generator = ScriptGenerator::new(env(), |script| {
        let last = script.tasks.create::<EmptyTask>("last", |_| Ok(()))?;
        script.tasks.create::<EmptyTask>("a", |task| {
            task.dependencies_mut().insert(last);
            Ok(())
        })?;
        script.tasks.create::<EmptyTask>("b", |task| {
            task.dependencies_mut().insert(last);
            Ok(())
        })?;

        script.last_task = Some(last);
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        GenerateError::DependsOnLastTask { last, dependents } if last == "last" && dependents == &["a", "b"]
    ));
}

#[test]
fn pregeneration_task_follows_imports() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;

        script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("in.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        let eager = script
            .tasks
            .run_exactly_once::<EnableEagerExecutionTask>(|_| Ok(()))?;
        script.pregeneration_last_task = Some(eager);
        Ok(())
    });

    assert_eq!(
        generator.code(false).unwrap(),
        "import tensorflow as tf\n\
         \n\
         tf.compat.v1.enable_eager_execution()\n\
         \n\
         model = tf.keras.models.load_model(\"in.h5\")"
    );
}

#[test]
fn pregeneration_dependencies_stay_before_it() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;

        let load = script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("in.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        let eager = script
            .tasks
            .create::<EnableEagerExecutionTask>("eager", |task| {
                task.dependencies_mut().insert(load);
                Ok(())
            })?;

        script.pregeneration_last_task = Some(eager);
        Ok(())
    });

    let script = generator.code(false).unwrap();
    assert!(script.find("load_model").unwrap() < script.find("enable_eager").unwrap());
}

#[test]
fn required_variable_must_be_produced() {
    let generator = ScriptGenerator::new(env(), |script| {
        let output = script.variables.create("output")?;
        script.require_generation(output);
        Ok(())
    });

    let errors = errors(generator);
    assert!(matches!(&errors[0], GenerateError::MissingRequiredVariable(name) if name == "output"));
}

#[test]
fn last_task_depending_on_itself_is_one_cycle() {
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EmptyTask>("a", |_| Ok(()))?;
        let last = script.tasks.create::<EmptyTask>("last", |_| Ok(()))?;
        if let Some(task) = script.tasks.get_mut(last) {
            task.dependencies_mut().insert(last);
        }
        script.last_task = Some(last);
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], GenerateError::Cycle(names) if names == &["last", "last"]));
}

#[test]
fn debug_comments_name_each_task() {
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EnableEagerExecutionTask>("eager", |_| Ok(()))?;
        script.tasks.create::<EmptyTask>("join", |_| Ok(()))?;
        Ok(())
    });

    assert_eq!(
        generator.code(true).unwrap(),
        "import tensorflow as tf\n\
         \n\
         # EnableEagerExecution task 'eager'\n\
         tf.compat.v1.enable_eager_execution()"
    );
}

#[test]
fn debug_comments_keep_task_names_on_one_line() {
    let name = "x'\nimport os; os.system('echo hi')\n#";
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<EnableEagerExecutionTask>(name, |_| Ok(()))?;
        Ok(())
    });

    let script = generator.code(true).unwrap();

    assert!(!script.lines().any(|line| line.starts_with("import os")), "{script}");
    assert_eq!(script.lines().filter(|line| line.starts_with('#')).count(), 1);
    assert_eq!(script.lines().last(), Some("tf.compat.v1.enable_eager_execution()"));
}

/// A task needing whatever imports it was handed.
struct ImportingTask {
    core: TaskCore,
    imports: BTreeSet<Import>,
}

impl TaskFactory for ImportingTask {
    const KIND: TaskKind = TaskKind::Empty;

    fn new(name: &str, _: &Environment) -> Self {
        Self {
            core: TaskCore::new(name),
            imports: BTreeSet::new(),
        }
    }
}

impl Task for ImportingTask {
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
        Ok(BTreeSet::new())
    }

    fn imports(&self) -> BTreeSet<Import> {
        self.imports.clone()
    }

    fn code(&self) -> Result<String, UninitializedFieldError> {
        Ok("pass".into())
    }
}

#[test]
fn imports_with_whitespace_block_generation() {
    let generator = ScriptGenerator::new(env(), |script| {
        script.tasks.create::<ImportingTask>("a", |task| {
            task.imports.insert(Import::module("numpy"));
            task.imports.insert(Import::module("bad module"));
            Ok(())
        })?;
        script.tasks.create::<ImportingTask>("b", |task| {
            task.imports.insert(Import::ModuleAndName {
                module: "pandas".into(),
                name: "p d".into(),
            });
            Ok(())
        })?;
        Ok(())
    });

    let invalid = errors(generator)
        .into_iter()
        .map(|error| match error {
            GenerateError::InvalidImport(import) => import.code(),
            other => panic!("unexpected error: {other}"),
        })
        .collect::<BTreeSet<_>>();

    assert_eq!(
        invalid,
        BTreeSet::from(["import bad module".to_string(), "import pandas as p d".to_string()])
    );
}

/// Rejects every import of the listed modules.
struct DenyModules(&'static [&'static str]);

impl ImportValidator for DenyModules {
    fn validate_imports(&self, imports: BTreeSet<Import>) -> Result<BTreeSet<Import>, Nel<Import>> {
        let denied = imports
            .iter()
            .filter(|import| {
                let components = import.components();
                self.0.iter().any(|module| components.contains(*module))
            })
            .cloned()
            .collect::<Vec<_>>();

        match Nel::from_vec(denied) {
            Some(denied) => Err(denied),
            None => Ok(imports),
        }
    }
}

#[test]
fn injected_import_validator_reports_every_offender() {
    let env = env().with_import_validator(DenyModules(&["tensorflow", "PIL"]));
    let generator = ScriptGenerator::new(env, |script| {
        let image = script.variables.create("image")?;
        script.tasks.run_exactly_once::<EnableEagerExecutionTask>(|_| Ok(()))?;
        script.tasks.create::<LoadImageTask>("image", |task| {
            task.image_path.set("cat.png".into())?;
            task.image_output.set(image.clone())?;
            Ok(())
        })?;
        Ok(())
    });

    let result = generator.code(false);
    let errors = result.unwrap_err().into_inner().into_vec();

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|error| matches!(error, GenerateError::InvalidImport(_))));

    let allowed = ScriptGenerator::new(crate::env().with_import_validator(DenyModules(&["os"])), |script| {
        script.tasks.run_exactly_once::<EnableEagerExecutionTask>(|_| Ok(()))?;
        Ok(())
    });
    assert!(allowed.code(false).is_ok());
}

#[test]
fn imports_are_deduplicated_in_first_seen_order() {
    let generator = ScriptGenerator::new(env(), |script| {
        let image = script.variables.create("image")?;
        let model = script.variables.create("model")?;

        script.tasks.create::<LoadImageTask>("image", |task| {
            task.image_path.set("cat.png".into())?;
            task.image_output.set(image.clone())?;
            Ok(())
        })?;
        script.tasks.create::<LoadModelTask>("model", |task| {
            task.model_path.set("m.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;
        script.tasks.run_exactly_once::<EnableEagerExecutionTask>(|_| Ok(()))?;
        Ok(())
    });

    let script = generator.code(false).unwrap();
    assert!(script.starts_with("from PIL import Image\nimport tensorflow as tf\n\n"));
    assert_eq!(script.matches("import tensorflow as tf").count(), 1);
}

#[test]
fn inference_pipeline() {
    let plugin = Plugin::new(
        "normalize",
        "def normalize(image):\n    return np.asarray(image) / 255.0",
    );

    let generator = ScriptGenerator::new(env(), |script| {
        let image = script.variables.create("image")?;
        let data = script.variables.create("data")?;
        let model = script.variables.create("model")?;
        let prediction = script.variables.create("prediction")?;
        script.require_generation(prediction.clone());

        let load_image = script.tasks.create::<LoadImageTask>("load_image", |task| {
            task.image_path.set("cat.png".into())?;
            task.image_output.set(image.clone())?;
            Ok(())
        })?;

        let preprocess = script.tasks.create::<RunPluginTask>("preprocess", |task| {
            task.use_plugin(&plugin, "normalize")?;
            task.function_inputs.set(vec![image.clone()])?;
            task.function_outputs.set(vec![data.clone()])?;
            task.dependencies_mut().insert(load_image);
            Ok(())
        })?;

        let load_model = script.tasks.create::<LoadModelTask>("load_model", |task| {
            task.model_path.set("model.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        script.tasks.create::<RunInferenceTask>("infer", |task| {
            task.model.set(model.clone())?;
            task.input.set(data.clone())?;
            task.output.set(prediction.clone())?;
            task.dependencies_mut().extend([preprocess, load_model]);
            Ok(())
        })?;

        Ok(())
    });

    let script = generator.code(false).unwrap();

    let expected = [
        "Image.open(\"cat.png\")",
        "def normalize(image):",
        "(data) = normalize(image)",
        "load_model(\"model.h5\")",
        "prediction = model.predict(data)",
    ];
    let positions = expected
        .iter()
        .map(|needle| script.find(needle).unwrap())
        .collect::<Vec<_>>();

    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{script}");
}

#[test]
fn retraining_pipeline() {
    let generator = ScriptGenerator::new(env(), |script| {
        let base = script.variables.create("base_model")?;
        let new = script.variables.create_unique();

        let load = script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("base.h5".into())?;
            task.model_output.set(base.clone())?;
            Ok(())
        })?;

        let delta = script.tasks.create::<ApplyLayerDeltaTask>("delta", |task| {
            task.model_input.set(base.clone())?;
            task.current_layers
                .set(vec![Layer::new("dense_1"), Layer::new("dense_2")])?;
            task.new_layers
                .set(vec![Layer::new("dense_1").trainable(false)])?;
            task.new_model_output.set(new.clone())?;
            task.dependencies_mut().insert(load);
            Ok(())
        })?;

        let save = script.tasks.create::<SaveModelTask>("save", |task| {
            task.model_input.set(new.clone())?;
            task.model_path.set("new.h5".into())?;
            task.dependencies_mut().insert(delta);
            Ok(())
        })?;

        script.last_task = Some(save);
        Ok(())
    });

    assert_eq!(
        generator.code(false).unwrap(),
        "import tensorflow as tf\n\
         \n\
         base_model = tf.keras.models.load_model(\"base.h5\")\n\
         \n\
         var1 = tf.keras.Sequential([base_model.get_layer(\"dense_1\")])\n\
         var1.get_layer(\"dense_1\").trainable = False\n\
         \n\
         var1.save(\"new.h5\")"
    );
}

#[test]
fn training_pipeline() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;
        let x = script.variables.create("x")?;
        let y = script.variables.create("y")?;
        let x_test = script.variables.create("x_test")?;
        let y_test = script.variables.create("y_test")?;
        let checkpoint = script.variables.create("checkpoint")?;

        let load = script.tasks.create::<LoadModelTask>("load", |task| {
            task.model_path.set("base.h5".into())?;
            task.model_output.set(model.clone())?;
            Ok(())
        })?;

        let compile = script.tasks.create::<CompileModelTask>("compile", |task| {
            task.model_input.set(model.clone())?;
            task.optimizer.set(Optimizer::default())?;
            task.loss.set(Loss::SparseCategoricalCrossentropy)?;
            task.dependencies_mut().insert(load);
            Ok(())
        })?;

        let data = script.tasks.create::<LoadExampleDatasetTask>("data", |task| {
            task.dataset.set(ExampleDataset::Mnist)?;
            task.x_train_output.set(x.clone())?;
            task.y_train_output.set(y.clone())?;
            task.x_test_output.set(x_test.clone())?;
            task.y_test_output.set(y_test.clone())?;
            Ok(())
        })?;

        let callback = script.tasks.create::<CheckpointCallbackTask>("checkpoint", |task| {
            task.file_path.set("out/weights.h5".into())?;
            task.output.set(checkpoint.clone())?;
            Ok(())
        })?;

        let train = script.tasks.create::<TrainTask>("train", |task| {
            task.model_input.set(model.clone())?;
            task.train_input.set(x.clone())?;
            task.train_output.set(y.clone())?;
            task.callbacks = vec![checkpoint.clone()];
            task.epochs = 3;
            task.dependencies_mut().extend([compile, data, callback]);
            Ok(())
        })?;

        let save = script.tasks.create::<SaveModelTask>("save", |task| {
            task.model_input.set(model.clone())?;
            task.model_path.set("trained.h5".into())?;
            task.dependencies_mut().insert(train);
            Ok(())
        })?;

        script.last_task = Some(save);
        Ok(())
    });

    let script = generator.code(false).unwrap();

    assert!(script.starts_with(
        "import tensorflow as tf\n\
         import errno\n\
         import os\n\
         from pathlib import Path\n\n"
    ), "{script}");

    let positions = [
        "model = tf.keras.models.load_model(",
        "model.compile(",
        "(x, y), (x_test, y_test) = tf.keras.datasets.mnist.load_data()",
        "checkpoint = tf.keras.callbacks.ModelCheckpoint(",
        "model.fit(",
        "model.save(",
    ]
    .map(|needle| script.find(needle).unwrap());

    assert!(positions.is_sorted(), "{script}");
    assert!(script.contains("    epochs=3,\n"));
    assert!(script.contains("    callbacks=[checkpoint],\n"));
}

#[test]
fn training_with_half_the_validation_data_is_invalid() {
    let generator = ScriptGenerator::new(env(), |script| {
        let model = script.variables.create("model")?;
        let x = script.variables.create("x")?;
        let y = script.variables.create("y")?;

        script.tasks.create::<TrainTask>("train", |task| {
            task.model_input.set(model.clone())?;
            task.train_input.set(x.clone())?;
            task.train_output.set(y.clone())?;
            task.validation_input = Some(x.clone());
            Ok(())
        })?;
        Ok(())
    });

    let errors = errors(generator);

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        GenerateError::InvalidTask { name, kind: "Train" } if name == "train"
    ));
}
