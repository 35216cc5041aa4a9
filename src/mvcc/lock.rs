//! Named mutex registry backing `transaction/3`'s `lock` argument (spec.md
//! §4.6): a constraint check and the transaction it guards must serialize
//! against other transactions naming the same lock, without serializing
//! against transactions that don't.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex registered under `name`, creating it on first use.
    pub fn named(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(name.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_returns_the_same_mutex() {
        let registry = LockRegistry::new();
        let a = registry.named("stock");
        let b = registry.named("stock");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_names_are_independent() {
        let registry = LockRegistry::new();
        let a = registry.named("stock");
        let b = registry.named("ledger");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
