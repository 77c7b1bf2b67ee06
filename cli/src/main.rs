mod job;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use console::style;
use rayon::prelude::*;
use scriptgen::collaborator::{
    InMemoryPluginStore, JsonModelLoader, Plugin, PythonRunner, ScriptRunner,
};
use scriptgen::{Environment, UniqueNameGenerator};
use tracing::{error, info};

use crate::job::Job;

/// Generate Python scripts from declarative job files.
#[derive(Parser, Debug, Clone)]
#[command(name = "scriptgen", version)]
struct Args {
    /// Job files or glob patterns, e.g. `jobs/*.json`.
    #[arg(required = true)]
    jobs: Vec<String>,

    /// Directory the generated scripts are written to.
    #[arg(short, long, default_value = "scripts")]
    out: Utf8PathBuf,

    /// Directory of `*.py` plugins, each named after its file stem.
    #[arg(short, long)]
    plugins: Option<Utf8PathBuf>,

    /// Prefix each task's code with a comment naming it.
    #[arg(long)]
    debug_comments: bool,

    /// Run each script after generating it.
    #[arg(long)]
    run: bool,

    /// Interpreter used by `--run`.
    #[arg(long, default_value = "python3")]
    python: String,

    /// Log more, repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    scriptgen::init_logging_with_default(level)?;

    let jobs = expand(&args.jobs)?;
    let plugins = match &args.plugins {
        Some(dir) => load_plugins(dir)?,
        None => InMemoryPluginStore::new(),
    };

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out))?;

    // One counter for every job, so generated names never collide between scripts.
    let names = Arc::new(UniqueNameGenerator::new());
    let runner = PythonRunner::new(&args.python);

    let failures = jobs
        .par_iter()
        .map(|path| {
            let env = Environment::default().with_names(names.clone());
            let result = process(path, &args, env, &plugins, &runner);
            if let Err(e) = &result {
                error!(job = %path, "{e:#}");
            }
            result
        })
        .filter(Result::is_err)
        .count();

    if failures > 0 {
        anyhow::bail!("{failures} of {} job(s) failed", jobs.len());
    }

    info!("{}", style(format!("Generated {} script(s)", jobs.len())).green());
    Ok(())
}

fn expand(patterns: &[String]) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        for entry in glob::glob(pattern).with_context(|| format!("invalid pattern '{pattern}'"))? {
            let path = entry?;
            let path = Utf8PathBuf::try_from(path)?;
            paths.push(path);
        }
    }

    paths.sort();
    paths.dedup();

    if paths.is_empty() {
        anyhow::bail!("no job files matched {patterns:?}");
    }

    Ok(paths)
}

fn load_plugins(dir: &Utf8Path) -> anyhow::Result<InMemoryPluginStore> {
    let pattern = dir.join("*.py");
    let store = InMemoryPluginStore::new();

    for entry in glob::glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        let name = path.file_stem().context("plugin without a name")?.to_string();
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read plugin {path}"))?;

        store.insert(Plugin::new(name, contents));
    }

    Ok(store)
}

fn process(
    path: &Utf8Path,
    args: &Args,
    env: Environment,
    plugins: &InMemoryPluginStore,
    runner: &dyn ScriptRunner,
) -> anyhow::Result<()> {
    let job = Job::load(path)?;
    let base = path.parent().unwrap_or(Utf8Path::new("."));

    let script = job
        .generate(base, env, &JsonModelLoader, plugins, args.debug_comments)
        .with_context(|| format!("failed to generate '{}'", job.name()))?;

    let target = args.out.join(format!("{}.py", job.name()));
    std::fs::write(&target, format!("{script}\n"))
        .with_context(|| format!("failed to write {target}"))?;

    info!(job = job.name(), script = %target, "generated");

    if args.run {
        // Paths inside the script are relative to the current directory.
        let output = runner.run(&target, &BTreeMap::new(), Utf8Path::new("."))?;

        if !output.success() {
            anyhow::bail!(
                "'{}' exited with {:?}\n{}",
                target,
                output.exit_code,
                output.stderr.trim_end()
            );
        }

        info!(job = job.name(), "{}", style("ran successfully").green());
        print!("{}", output.stdout);
    }

    Ok(())
}
