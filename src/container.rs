//! Registries for the objects a configuration block declares.
//!
//! [`NamedContainer`] enforces unique names. [`Variables`] and [`Tasks`] wrap
//! it with factories that thread the generator's [`Environment`] into every
//! object they create.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;

use crate::error::ContainerError;
use crate::task::{Task, TaskFactory, TaskId, TaskKind};
use crate::{Environment, Variable};

/// Anything that can be stored in a [`NamedContainer`].
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Box<dyn Task> {
    fn name(&self) -> &str {
        Task::name(self.as_ref())
    }
}

/// A name-keyed registry which keeps insertion order.
#[derive(Debug)]
pub struct NamedContainer<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Named> NamedContainer<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Fails without touching the container when the name is taken.
    pub fn insert(&mut self, item: T) -> Result<usize, ContainerError> {
        self.ensure_free(item.name())?;

        let position = self.entries.len();
        self.index.insert(item.name().to_string(), position);
        self.entries.push(item);

        Ok(position)
    }

    /// Builds an item with `factory`, runs `configure` on it and stores it.
    ///
    /// The name is checked before anything is built, so a duplicate never runs
    /// `configure`. Nothing is stored when `configure` fails.
    pub fn create<F, C>(&mut self, name: &str, factory: F, configure: C) -> anyhow::Result<usize>
    where
        F: FnOnce(&str) -> T,
        C: FnOnce(&mut T) -> anyhow::Result<()>,
    {
        self.ensure_free(name)?;

        let mut item = factory(name);
        configure(&mut item).with_context(|| format!("failed to configure '{name}'"))?;

        Ok(self.insert(item)?)
    }

    pub fn ensure_free(&self, name: &str) -> Result<(), ContainerError> {
        match self.index.contains_key(name) {
            true => Err(ContainerError::DuplicateName(name.to_string())),
            false => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.position(name).map(|i| &self.entries[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get_index(&self, position: usize) -> Option<&T> {
        self.entries.get(position)
    }

    pub fn get_index_mut(&mut self, position: usize) -> Option<&mut T> {
        self.entries.get_mut(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Named> Default for NamedContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An unkeyed registry. Duplicates are allowed.
#[derive(Debug)]
pub struct PositionalContainer<T> {
    entries: Vec<T>,
}

impl<T> PositionalContainer<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, item: T) -> usize {
        self.entries.push(item);
        self.entries.len() - 1
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.entries.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PositionalContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The variables of one generator.
pub struct Variables {
    inner: NamedContainer<Variable>,
    env: Environment,
}

impl Variables {
    pub(crate) fn new(env: Environment) -> Self {
        Self {
            inner: NamedContainer::new(),
            env,
        }
    }

    pub fn create(&mut self, name: &str) -> Result<Variable, ContainerError> {
        let variable = Variable::new(name, self.env.variable_names().clone());
        self.inner.insert(variable.clone())?;
        Ok(variable)
    }

    /// Creates a variable named by the shared [`UniqueNameGenerator`].
    ///
    /// Names already declared in this container are skipped.
    ///
    /// [`UniqueNameGenerator`]: crate::UniqueNameGenerator
    pub fn create_unique(&mut self) -> Variable {
        loop {
            let name = self.env.names().unique_variable_name();
            if let Ok(variable) = self.create(&name) {
                return variable;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.inner.get(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// The tasks of one generator, addressed by [`TaskId`] in declaration order.
pub struct Tasks {
    inner: NamedContainer<Box<dyn Task>>,
    owner: u64,
    env: Environment,
}

impl Tasks {
    pub(crate) fn new(env: Environment) -> Self {
        Self {
            inner: NamedContainer::new(),
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            env,
        }
    }

    fn id(&self, index: usize) -> TaskId {
        TaskId::new(self.owner, index)
    }

    /// Whether `id` was issued by this container.
    pub fn owns(&self, id: TaskId) -> bool {
        id.owner() == self.owner && id.index() < self.inner.len()
    }

    /// Creates a task of kind `T` named `name` and configures it.
    ///
    /// ```rust
    /// use scriptgen::{Environment, ScriptGenerator};
    /// use scriptgen::task::EmptyTask;
    ///
    /// let generator = ScriptGenerator::new(Environment::default(), |script| {
    ///     script.tasks.create::<EmptyTask>("a", |_| Ok(()))?;
    ///     assert!(script.tasks.create::<EmptyTask>("a", |_| Ok(())).is_err());
    ///     Ok(())
    /// });
    ///
    /// assert_eq!(generator.code(false).unwrap(), "");
    /// ```
    pub fn create<T>(
        &mut self,
        name: &str,
        configure: impl FnOnce(&mut T) -> anyhow::Result<()>,
    ) -> anyhow::Result<TaskId>
    where
        T: TaskFactory,
    {
        if T::KIND.is_abstract() {
            return Err(ContainerError::AbstractKind(T::KIND.as_str()).into());
        }

        let env = &self.env;
        let position = self.inner.create(
            name,
            |name| Box::new(T::new(name, env)) as Box<dyn Task>,
            |task| {
                let task = (task.as_mut() as &mut dyn Any)
                    .downcast_mut::<T>()
                    .context("task factory produced a different kind")?;
                configure(task)
            },
        )?;

        tracing::debug!(task = name, kind = %T::KIND, "created task");
        Ok(self.id(position))
    }

    /// Creates a task from a runtime [`TaskKind`].
    pub fn create_kind(
        &mut self,
        name: &str,
        kind: TaskKind,
        configure: impl FnOnce(&mut dyn Task) -> anyhow::Result<()>,
    ) -> anyhow::Result<TaskId> {
        if kind.is_abstract() {
            return Err(ContainerError::AbstractKind(kind.as_str()).into());
        }

        self.inner.ensure_free(name)?;
        let mut task = kind.instantiate(name, &self.env)?;
        configure(task.as_mut()).with_context(|| format!("failed to configure '{name}'"))?;

        tracing::debug!(task = name, %kind, "created task");
        let position = self.inner.insert(task)?;
        Ok(self.id(position))
    }

    /// Like [`Tasks::create`], with a name from the shared name generator.
    pub fn run<T>(
        &mut self,
        configure: impl FnOnce(&mut T) -> anyhow::Result<()>,
    ) -> anyhow::Result<TaskId>
    where
        T: TaskFactory,
    {
        let name = loop {
            let name = self.env.names().unique_variable_name();
            if !self.inner.contains(&name) {
                break name;
            }
        };

        self.create(&name, configure)
    }

    /// Returns the first task of kind `T`, creating it if there is none.
    ///
    /// `configure` only runs when a new task is created.
    pub fn run_exactly_once<T>(
        &mut self,
        configure: impl FnOnce(&mut T) -> anyhow::Result<()>,
    ) -> anyhow::Result<TaskId>
    where
        T: TaskFactory,
    {
        let existing = self
            .iter()
            .find(|(_, task)| task.kind() == T::KIND)
            .map(|(id, _)| id);

        match existing {
            Some(id) => Ok(id),
            None => self.run(configure),
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&dyn Task> {
        if id.owner() != self.owner {
            return None;
        }
        self.inner.get_index(id.index()).map(Box::as_ref)
    }

    /// Used to add dependencies on tasks declared after this one.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut dyn Task> {
        if id.owner() != self.owner {
            return None;
        }
        self.inner.get_index_mut(id.index()).map(Box::as_mut)
    }

    pub fn get_as<T: Task>(&self, id: TaskId) -> Option<&T> {
        let task: &dyn Any = self.get(id)?;
        task.downcast_ref()
    }

    pub fn find(&self, name: &str) -> Option<TaskId> {
        self.inner.position(name).map(|index| self.id(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &dyn Task)> {
        self.inner
            .iter()
            .enumerate()
            .map(move |(i, task)| (self.id(i), task.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
