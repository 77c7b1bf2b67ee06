use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use tracing::{debug, info, warn};

use crate::container::{PositionalContainer, Tasks, Variables};
use crate::error::{GenerateError, GenerationErrors};
use crate::nel::Nel;
use crate::task::TaskId;
use crate::utils::comment_text;
use crate::{Environment, Import, Variable};

type TaskGraph = DiGraph<TaskId, ()>;

/// Assembles the tasks of one configuration block into a single script.
///
/// The configuration block runs once, in [`ScriptGenerator::new`]. It
/// declares variables and tasks through the public containers and may set the
/// two markers:
///
/// * `pregeneration_last_task` runs right after the imports. Every task that
///   it does not itself depend on is ordered after it.
/// * `last_task` runs after every other task. Nothing may depend on it.
///
/// Errors raised by the block are kept and reported by [`ScriptGenerator::code`]
/// together with everything else that is wrong.
pub struct ScriptGenerator {
    pub variables: Variables,
    pub tasks: Tasks,
    pub pregeneration_last_task: Option<TaskId>,
    pub last_task: Option<TaskId>,
    required: PositionalContainer<Variable>,
    env: Environment,
    configuration: Option<anyhow::Error>,
}

impl ScriptGenerator {
    pub fn new<F>(env: Environment, configure: F) -> Self
    where
        F: FnOnce(&mut ScriptGenerator) -> anyhow::Result<()>,
    {
        let mut generator = Self {
            variables: Variables::new(env.clone()),
            tasks: Tasks::new(env.clone()),
            pregeneration_last_task: None,
            last_task: None,
            required: PositionalContainer::new(),
            env,
            configuration: None,
        };

        if let Err(error) = configure(&mut generator) {
            generator.configuration = Some(error);
        }

        generator
    }

    /// Marks a variable that some task has to output.
    pub fn require_generation(&mut self, variable: Variable) {
        self.required.push(variable);
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Validates the declared graph and renders the script.
    ///
    /// Either every problem found is returned, or the complete script. The
    /// script starts with the deduplicated imports, followed by the code of
    /// each task in dependency order separated by blank lines. Tasks that are
    /// not ordered against each other keep their declaration order.
    pub fn code(self, include_debug_comments: bool) -> Result<String, GenerationErrors> {
        let span = tracing::info_span!(
            "generate",
            variables = self.variables.len(),
            tasks = self.tasks.len()
        );
        let _enter = span.enter();

        let Self {
            variables,
            tasks,
            pregeneration_last_task,
            last_task,
            required,
            env,
            configuration,
        } = self;

        let mut errors = Vec::new();

        if let Some(error) = configuration {
            errors.push(GenerateError::from_configuration(error));
        }

        let last_is_valid = check_last_task(&tasks, last_task, &mut errors);
        let pregeneration_is_valid =
            check_marker(&tasks, "pregeneration last task", pregeneration_last_task, &mut errors);

        check_required(&tasks, &required, &mut errors);
        check_objects(&variables, &tasks, &mut errors);
        check_imports(&tasks, &env, &mut errors);

        let graph = build_graph(
            &tasks,
            pregeneration_last_task.filter(|_| pregeneration_is_valid),
            last_task.filter(|_| last_is_valid),
            &mut errors,
        );

        if let Some(cycle) = find_cycle(&graph) {
            let names = cycle
                .into_iter()
                .filter_map(|node| tasks.get(graph[node]))
                .map(|task| task.name().to_string())
                .collect();
            errors.push(GenerateError::Cycle(names));
        }

        if let Some(errors) = Nel::from_vec(errors) {
            return Err(fail(errors));
        }

        let order = order(&graph);
        info!(order = ?order, "ordered tasks");

        let mut errors = Vec::new();
        let script = render(&tasks, &order, include_debug_comments, &mut errors);

        match Nel::from_vec(errors) {
            Some(errors) => Err(fail(errors)),
            None => Ok(script),
        }
    }
}

fn fail(errors: Nel<GenerateError>) -> GenerationErrors {
    for error in errors.iter() {
        warn!("{error}");
    }
    GenerationErrors(errors)
}

fn check_marker(
    tasks: &Tasks,
    marker: &'static str,
    id: Option<TaskId>,
    errors: &mut Vec<GenerateError>,
) -> bool {
    match id {
        Some(id) if tasks.get(id).is_none() => {
            errors.push(GenerateError::UnknownMarker { marker, id });
            false
        }
        _ => true,
    }
}

fn check_last_task(tasks: &Tasks, last: Option<TaskId>, errors: &mut Vec<GenerateError>) -> bool {
    if !check_marker(tasks, "last task", last, errors) {
        return false;
    }

    let Some((last, task)) = last.and_then(|id| Some((id, tasks.get(id)?))) else {
        return true;
    };

    // A last task that depends on itself is reported as a cycle.
    let dependents = tasks
        .iter()
        .filter(|&(id, task)| id != last && task.dependencies().contains(last))
        .map(|(_, task)| task.name().to_string())
        .collect::<Vec<_>>();

    if dependents.is_empty() {
        return true;
    }

    errors.push(GenerateError::DependsOnLastTask {
        last: task.name().to_string(),
        dependents,
    });
    false
}

fn check_required(
    tasks: &Tasks,
    required: &PositionalContainer<Variable>,
    errors: &mut Vec<GenerateError>,
) {
    if required.is_empty() {
        return;
    }

    // Unassigned outputs are reported by `check_objects`.
    let outputs = tasks
        .iter()
        .filter_map(|(_, task)| task.outputs().ok())
        .flatten()
        .collect::<HashSet<_>>();

    for variable in required.iter() {
        if !outputs.contains(variable) {
            errors.push(GenerateError::MissingRequiredVariable(
                variable.name().to_string(),
            ));
        }
    }
}

fn check_objects(variables: &Variables, tasks: &Tasks, errors: &mut Vec<GenerateError>) {
    info!(variables = ?variables.iter().map(Variable::name).collect::<Vec<_>>(), "variables");

    for variable in variables.iter() {
        if !variable.is_configured_correctly() {
            errors.push(GenerateError::InvalidVariable(variable.name().to_string()));
        }
    }

    for (_, task) in tasks.iter() {
        debug!("{}", task.summary());

        match task.is_configured_correctly() {
            Ok(true) => {}
            Ok(false) => errors.push(GenerateError::InvalidTask {
                name: task.name().to_string(),
                kind: task.kind().as_str(),
            }),
            Err(source) => errors.push(GenerateError::Uninitialized {
                task: task.name().to_string(),
                source,
            }),
        }
    }
}

fn check_imports(tasks: &Tasks, env: &Environment, errors: &mut Vec<GenerateError>) {
    let imports = tasks
        .iter()
        .flat_map(|(_, task)| task.imports())
        .collect::<BTreeSet<Import>>();

    if let Err(invalid) = env.imports().validate_imports(imports) {
        errors.extend(invalid.into_iter().map(GenerateError::InvalidImport));
    }
}

/// One node per task, in declaration order, with an edge from each dependency
/// to its dependent. Markers add their implicit edges on top.
fn build_graph(
    tasks: &Tasks,
    pregeneration: Option<TaskId>,
    last: Option<TaskId>,
    errors: &mut Vec<GenerateError>,
) -> TaskGraph {
    let mut graph = TaskGraph::with_capacity(tasks.len(), tasks.len());
    let nodes = tasks
        .iter()
        .map(|(id, _)| graph.add_node(id))
        .collect::<Vec<_>>();

    for (id, task) in tasks.iter() {
        for dependency in task.dependencies().iter() {
            match tasks.owns(dependency) {
                true => {
                    graph.update_edge(nodes[dependency.index()], nodes[id.index()], ());
                }
                false => errors.push(GenerateError::DanglingDependency {
                    task: task.name().to_string(),
                }),
            }
        }
    }

    if let Some(pregeneration) = pregeneration {
        let start = nodes[pregeneration.index()];

        let mut ancestors = HashSet::new();
        let mut dfs = Dfs::new(Reversed(&graph), start);
        while let Some(node) = dfs.next(Reversed(&graph)) {
            ancestors.insert(node);
        }

        for &node in &nodes {
            if !ancestors.contains(&node) {
                debug!(from = %pregeneration, to = %graph[node], "implicit edge");
                graph.update_edge(start, node, ());
            }
        }
    }

    if let Some(last) = last {
        let end = nodes[last.index()];

        for &node in &nodes {
            if node != end {
                graph.update_edge(node, end, ());
            }
        }
        debug!(to = %last, "implicit edges to the last task");
    }

    info!(nodes = graph.node_count(), edges = graph.edge_count(), "built task graph");
    graph
}

/// Returns the nodes of one cycle, first node repeated at the end.
fn find_cycle(graph: &TaskGraph) -> Option<Vec<NodeIndex>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color = vec![Color::White; graph.node_count()];

    for start in graph.node_indices() {
        if color[start.index()] != Color::White {
            continue;
        }

        color[start.index()] = Color::Gray;
        let mut path = vec![start];
        let mut stack = vec![graph.neighbors(start)];

        while let Some(neighbors) = stack.last_mut() {
            match neighbors.next() {
                Some(next) => match color[next.index()] {
                    Color::White => {
                        color[next.index()] = Color::Gray;
                        path.push(next);
                        stack.push(graph.neighbors(next));
                    }
                    Color::Gray => {
                        let from = path.iter().position(|&node| node == next)?;
                        let mut cycle = path[from..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    Color::Black => {}
                },
                None => {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        color[done.index()] = Color::Black;
                    }
                }
            }
        }
    }

    None
}

/// Kahn's algorithm, always taking the earliest declared task that is ready.
fn order(graph: &TaskGraph) -> Vec<TaskId> {
    let mut pending = graph
        .node_indices()
        .map(|node| graph.neighbors_directed(node, Direction::Incoming).count())
        .collect::<Vec<_>>();

    let mut ready = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(NodeIndex::new(i)))
        .collect::<BinaryHeap<_>>();

    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(Reverse(node)) = ready.pop() {
        order.push(graph[node]);

        for next in graph.neighbors(node) {
            pending[next.index()] -= 1;
            if pending[next.index()] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    order
}

fn render(
    tasks: &Tasks,
    order: &[TaskId],
    include_debug_comments: bool,
    errors: &mut Vec<GenerateError>,
) -> String {
    let mut seen = HashSet::new();
    let mut imports = Vec::new();
    let mut blocks = Vec::new();

    for task in order.iter().filter_map(|&id| tasks.get(id)) {
        for import in task.imports() {
            if seen.insert(import.clone()) {
                imports.push(import);
            }
        }

        match task.code() {
            Ok(code) if code.trim().is_empty() => {}
            Ok(code) => {
                debug!(task = task.name(), "emitting");
                blocks.push(match include_debug_comments {
                    true => format!(
                        "# {} task '{}'\n{code}",
                        task.kind(),
                        comment_text(task.name())
                    ),
                    false => code,
                });
            }
            Err(source) => errors.push(GenerateError::Uninitialized {
                task: task.name().to_string(),
                source,
            }),
        }
    }

    let mut script = imports
        .iter()
        .map(Import::code)
        .collect::<Vec<_>>()
        .join("\n");

    if !blocks.is_empty() {
        script.push_str("\n\n");
        script.push_str(&blocks.join("\n\n"));
    }

    script.trim().to_string()
}
