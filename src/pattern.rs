//! First-match-wins pattern matching over fixed-length sequences.
//!
//! A [`Pattern`] is a list of [`Slot`]s. Literal slots must compare equal to
//! the candidate element at the same position, wildcard slots bind whatever
//! element sits there. A [`PatternMatch`] holds an ordered list of rules, each
//! a pattern plus a function building the result from the bound values.
//!
//! Rules are tried in the order they were declared and evaluation stops at
//! the first pattern that matches, even when a later one would match too.
//!
//! ```rust
//! use scriptgen::pattern::{Pattern, PatternMatch, Slot};
//!
//! let rules = PatternMatch::new()
//!     .rule(Pattern::new([Slot::Literal("import"), Slot::Wildcard]), |m| {
//!         format!("module {}", m.first())
//!     });
//!
//! assert_eq!(rules.evaluate(&["import", "os"]), Some("module os".to_string()));
//! assert_eq!(rules.evaluate(&["from", "os"]), None);
//! ```

/// One position in a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<E> {
    /// Matches exactly this element.
    Literal(E),
    /// Matches any element and binds it.
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern<E> {
    slots: Vec<Slot<E>>,
}

impl<E> Pattern<E>
where
    E: PartialEq + Clone,
{
    pub fn new(slots: impl IntoIterator<Item = Slot<E>>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Matches `candidate` against this pattern, returning the wildcard
    /// bindings in order.
    pub fn matches(&self, candidate: &[E]) -> Option<Bindings<E>> {
        if candidate.len() != self.slots.len() {
            return None;
        }

        let mut bound = Vec::new();
        for (slot, value) in self.slots.iter().zip(candidate) {
            match slot {
                Slot::Wildcard => bound.push(value.clone()),
                Slot::Literal(literal) if literal == value => {}
                Slot::Literal(_) => return None,
            }
        }

        Some(Bindings(bound))
    }
}

/// Values bound by the wildcards of a matching [`Pattern`], in slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings<E>(Vec<E>);

impl<E> Bindings<E> {
    pub fn get(&self, index: usize) -> Option<&E> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<E> {
        self.0
    }

    /// # Panics
    /// Panics if the pattern had no wildcard.
    pub fn first(&self) -> &E {
        &self.0[0]
    }

    /// # Panics
    /// Panics if the pattern had fewer than two wildcards.
    pub fn second(&self) -> &E {
        &self.0[1]
    }

    /// # Panics
    /// Panics if the pattern had fewer than three wildcards.
    pub fn third(&self) -> &E {
        &self.0[2]
    }
}

type Conclusion<'a, E, R> = Box<dyn Fn(Bindings<E>) -> R + 'a>;

/// An ordered list of `(pattern, result builder)` rules.
pub struct PatternMatch<'a, E, R> {
    rules: Vec<(Pattern<E>, Conclusion<'a, E, R>)>,
}

impl<'a, E, R> PatternMatch<'a, E, R>
where
    E: PartialEq + Clone,
{
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule. Rules declared earlier take precedence.
    pub fn rule<F>(mut self, pattern: Pattern<E>, conclusion: F) -> Self
    where
        F: Fn(Bindings<E>) -> R + 'a,
    {
        self.rules.push((pattern, Box::new(conclusion)));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Builds the result of the first rule whose pattern matches `candidate`.
    pub fn evaluate(&self, candidate: &[E]) -> Option<R> {
        self.rules.iter().find_map(|(pattern, conclusion)| {
            pattern
                .matches(candidate)
                .map(|bindings| conclusion(bindings))
        })
    }
}

impl<E, R> Default for PatternMatch<'_, E, R>
where
    E: PartialEq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
