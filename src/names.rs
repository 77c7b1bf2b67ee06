use std::sync::{Mutex, PoisonError};

/// Hands out fresh names (`var1`, `var2`, ...) for variables and tasks that
/// were declared without one.
///
/// The counter is guarded by a mutex, so generators running in parallel can
/// share one instance through an `Arc` without ever seeing the same name
/// twice.
#[derive(Debug)]
pub struct UniqueNameGenerator {
    counter: Mutex<u64>,
}

impl UniqueNameGenerator {
    pub fn new() -> Self {
        Self {
            counter: Mutex::new(1),
        }
    }

    pub fn unique_variable_name(&self) -> String {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        let name = format!("var{}", *counter);
        *counter += 1;
        name
    }
}

impl Default for UniqueNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn test_sequential_names() {
        let generator = UniqueNameGenerator::new();

        assert_eq!(generator.unique_variable_name(), "var1");
        assert_eq!(generator.unique_variable_name(), "var2");
        assert_eq!(generator.unique_variable_name(), "var3");
    }

    #[test]
    fn test_two_threads() {
        const CALLS: usize = 10_000;

        let generator = Arc::new(UniqueNameGenerator::new());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let generator = generator.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    (0..CALLS)
                        .map(|_| generator.unique_variable_name())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name), "a name was handed out twice");
            }
        }

        assert_eq!(seen.len(), 2 * CALLS);
        assert_eq!(generator.unique_variable_name(), "var20001");
    }
}
