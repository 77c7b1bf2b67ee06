/// A list that always holds at least one element.
///
/// Used wherever a failure has to carry *every* problem that was found rather
/// than just the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nel<T> {
    head: T,
    tail: Vec<T>,
}

impl<T> Nel<T> {
    pub fn new(head: T) -> Self {
        Self {
            head,
            tail: Vec::new(),
        }
    }

    /// Returns `None` for an empty vector.
    pub fn from_vec(mut items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }

        let head = items.remove(0);
        Some(Self { head, tail: items })
    }

    pub fn first(&self) -> &T {
        &self.head
    }

    pub fn push(&mut self, item: T) {
        self.tail.push(item);
    }

    pub fn len(&self) -> usize {
        self.tail.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    pub fn into_vec(self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        items.push(self.head);
        items.extend(self.tail);
        items
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Nel<U> {
        Nel {
            head: f(self.head),
            tail: self.tail.into_iter().map(f).collect(),
        }
    }
}

impl<T> IntoIterator for Nel<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Nel<T> {
    type Item = &'a T;
    type IntoIter = Box<dyn Iterator<Item = &'a T> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
