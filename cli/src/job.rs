use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use scriptgen::collaborator::{ModelLoader, PluginStore};
use scriptgen::task::{
    ApplyLayerDeltaTask, CheckpointCallbackTask, CompileModelTask, EnableEagerExecutionTask,
    ExampleDataset, Layer, LoadExampleDatasetTask, LoadImageTask, LoadModelTask, Loss, Optimizer,
    RunInferenceTask, RunPluginTask, SaveModelTask, TrainTask,
};
use scriptgen::{Environment, ScriptGenerator, Task};
use serde::Deserialize;

/// A function taken from a plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginCall {
    pub plugin: String,
    pub function: String,
}

/// How a retrained model is fitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Training {
    pub optimizer: Optimizer,
    pub loss: Loss,
    pub metrics: Vec<String>,
    pub epochs: u32,
    pub batch_size: Option<u32>,
    /// Checkpoint file pattern, relative to the job file.
    pub checkpoint: Option<String>,
}

impl Default for Training {
    fn default() -> Self {
        Self {
            optimizer: Optimizer::default(),
            loss: Loss::default(),
            metrics: vec!["accuracy".into()],
            epochs: 1,
            batch_size: None,
            checkpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    /// Runs a model on a single image.
    Inference {
        name: String,
        model: Utf8PathBuf,
        image: String,
        #[serde(default)]
        preprocess: Option<PluginCall>,
        #[serde(default)]
        postprocess: Option<PluginCall>,
    },
    /// Rebuilds a Sequential model with a different set of layers, trains it
    /// on an example dataset and saves the result.
    Retrain {
        name: String,
        model: Utf8PathBuf,
        layers: Vec<Layer>,
        dataset: ExampleDataset,
        #[serde(default)]
        training: Training,
        save_to: String,
    },
}

impl Job {
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("failed to read job {path}"))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse job {path}"))
    }

    pub fn name(&self) -> &str {
        match self {
            Job::Inference { name, .. } | Job::Retrain { name, .. } => name,
        }
    }

    fn model(&self) -> &Utf8Path {
        match self {
            Job::Inference { model, .. } | Job::Retrain { model, .. } => model,
        }
    }

    /// Generates the script of this job. Relative paths are resolved against
    /// `base`, the directory the job was read from.
    pub fn generate(
        &self,
        base: &Utf8Path,
        env: Environment,
        models: &dyn ModelLoader,
        plugins: &dyn PluginStore,
        debug_comments: bool,
    ) -> anyhow::Result<String> {
        let model = models.load(&base.join(self.model()))?;

        let generator = match self {
            Job::Inference {
                image,
                preprocess,
                postprocess,
                ..
            } => {
                let preprocess = resolve(plugins, preprocess.as_ref())?;
                let postprocess = resolve(plugins, postprocess.as_ref())?;
                let image = base.join(image);

                ScriptGenerator::new(env, |script| {
                    let model_var = script.variables.create("model")?;
                    let image_var = script.variables.create("image")?;
                    let prediction = script.variables.create("prediction")?;
                    script.require_generation(prediction.clone());

                    let eager = script
                        .tasks
                        .run_exactly_once::<EnableEagerExecutionTask>(|_| Ok(()))?;
                    script.pregeneration_last_task = Some(eager);

                    let load_model = script.tasks.create::<LoadModelTask>("load_model", |task| {
                        task.model_path.set(model.path.to_string())?;
                        task.model_output.set(model_var.clone())?;
                        Ok(())
                    })?;

                    let mut input = image_var.clone();
                    let mut input_task = script.tasks.create::<LoadImageTask>("load_image", |task| {
                        task.image_path.set(image.to_string())?;
                        task.image_output.set(image_var.clone())?;
                        Ok(())
                    })?;

                    if let Some((plugin, function)) = &preprocess {
                        let data = script.variables.create_unique();
                        input_task = script.tasks.create::<RunPluginTask>("preprocess", |task| {
                            task.use_plugin(plugin, function)?;
                            task.function_inputs.set(vec![input.clone()])?;
                            task.function_outputs.set(vec![data.clone()])?;
                            task.dependencies_mut().insert(input_task);
                            Ok(())
                        })?;
                        input = data;
                    }

                    let infer = script.tasks.create::<RunInferenceTask>("infer", |task| {
                        task.model.set(model_var.clone())?;
                        task.input.set(input.clone())?;
                        task.output.set(prediction.clone())?;
                        task.dependencies_mut().extend([load_model, input_task]);
                        Ok(())
                    })?;

                    if let Some((plugin, function)) = &postprocess {
                        let post = script.tasks.create::<RunPluginTask>("postprocess", |task| {
                            task.use_plugin(plugin, function)?;
                            task.function_inputs.set(vec![prediction.clone()])?;
                            task.function_outputs.set(vec![])?;
                            task.dependencies_mut().insert(infer);
                            Ok(())
                        })?;
                        script.last_task = Some(post);
                    }

                    Ok(())
                })
            }
            Job::Retrain {
                layers,
                dataset,
                training,
                save_to,
                ..
            } => {
                let save_to = base.join(save_to);
                let checkpoint = training.checkpoint.as_ref().map(|path| base.join(path));

                ScriptGenerator::new(env, |script| {
                    let base_model = script.variables.create("base_model")?;
                    let new_model = script.variables.create("new_model")?;
                    let x_train = script.variables.create("x_train")?;
                    let y_train = script.variables.create("y_train")?;
                    let x_test = script.variables.create("x_test")?;
                    let y_test = script.variables.create("y_test")?;

                    let load = script.tasks.create::<LoadModelTask>("load_model", |task| {
                        task.model_path.set(model.path.to_string())?;
                        task.model_output.set(base_model.clone())?;
                        Ok(())
                    })?;

                    let delta = script.tasks.create::<ApplyLayerDeltaTask>("apply_layers", |task| {
                        task.model_input.set(base_model.clone())?;
                        task.current_layers.set(model.layers.clone())?;
                        task.new_layers.set(layers.clone())?;
                        task.new_model_output.set(new_model.clone())?;
                        task.dependencies_mut().insert(load);
                        Ok(())
                    })?;

                    let compile = script.tasks.create::<CompileModelTask>("compile", |task| {
                        task.model_input.set(new_model.clone())?;
                        task.optimizer.set(training.optimizer.clone())?;
                        task.loss.set(training.loss)?;
                        task.metrics = training.metrics.clone();
                        task.dependencies_mut().insert(delta);
                        Ok(())
                    })?;

                    let data = script.tasks.create::<LoadExampleDatasetTask>("load_dataset", |task| {
                        task.dataset.set(*dataset)?;
                        task.x_train_output.set(x_train.clone())?;
                        task.y_train_output.set(y_train.clone())?;
                        task.x_test_output.set(x_test.clone())?;
                        task.y_test_output.set(y_test.clone())?;
                        Ok(())
                    })?;

                    let mut callbacks = Vec::new();
                    let mut train_dependencies = vec![compile, data];

                    if let Some(path) = &checkpoint {
                        let callback = script.variables.create("checkpoint")?;
                        let id = script.tasks.create::<CheckpointCallbackTask>("checkpoint", |task| {
                            task.file_path.set(path.to_string())?;
                            task.output.set(callback.clone())?;
                            Ok(())
                        })?;
                        callbacks.push(callback);
                        train_dependencies.push(id);
                    }

                    let train = script.tasks.create::<TrainTask>("train", |task| {
                        task.model_input.set(new_model.clone())?;
                        task.train_input.set(x_train.clone())?;
                        task.train_output.set(y_train.clone())?;
                        task.validation_input = Some(x_test.clone());
                        task.validation_output = Some(y_test.clone());
                        task.callbacks = callbacks;
                        task.epochs = training.epochs;
                        task.batch_size = training.batch_size;
                        task.dependencies_mut().extend(train_dependencies);
                        Ok(())
                    })?;

                    let save = script.tasks.create::<SaveModelTask>("save_model", |task| {
                        task.model_input.set(new_model.clone())?;
                        task.model_path.set(save_to.to_string())?;
                        task.dependencies_mut().insert(train);
                        Ok(())
                    })?;

                    script.last_task = Some(save);
                    Ok(())
                })
            }
        };

        Ok(generator.code(debug_comments)?)
    }
}

fn resolve(
    plugins: &dyn PluginStore,
    call: Option<&PluginCall>,
) -> anyhow::Result<Option<(scriptgen::collaborator::Plugin, String)>> {
    let Some(call) = call else {
        return Ok(None);
    };

    let plugin = plugins
        .get(&call.plugin)
        .with_context(|| format!("unknown plugin '{}'", call.plugin))?;

    Ok(Some((plugin, call.function.clone())))
}
