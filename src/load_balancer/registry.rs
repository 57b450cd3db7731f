//! Round-robin backend registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::load_balancer::backend::Backend;

/// Registry loading was handed an empty address list.
#[derive(Debug, Error)]
#[error("must specify at least one backend address")]
pub struct EmptyRegistry;

/// Ordered, immutable-after-load backend list with a round-robin cursor.
///
/// The cursor advance is a single atomic fetch-and-increment so that
/// concurrent accept-handling tasks always draw unique, monotonically
/// increasing indices.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
    cursor: AtomicUsize,
}

impl BackendRegistry {
    /// Build a registry with one fresh backend per address.
    /// The cursor starts at zero.
    pub fn load<I, S>(addresses: I) -> Result<Self, EmptyRegistry>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backends: Vec<Arc<Backend>> = addresses
            .into_iter()
            .map(|address| Arc::new(Backend::new(address)))
            .collect();

        if backends.is_empty() {
            return Err(EmptyRegistry);
        }

        Ok(Self {
            backends,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Select the next backend in strict cyclic order.
    pub fn next(&self) -> Arc<Backend> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        Arc::clone(&self.backends[index % self.backends.len()])
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// All backends, in configuration order (for reporting).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_empty_list() {
        assert!(BackendRegistry::load(Vec::<String>::new()).is_err());
    }

    #[test]
    fn selection_cycles_in_order() {
        let registry =
            BackendRegistry::load(["127.0.0.1:8080", "127.0.0.1:8081"]).unwrap();

        let s1 = registry.next();
        assert_eq!(s1.address(), "127.0.0.1:8080");

        let s2 = registry.next();
        assert_eq!(s2.address(), "127.0.0.1:8081");

        let s3 = registry.next();
        assert_eq!(s3.address(), "127.0.0.1:8080");
    }

    #[test]
    fn selection_is_i_mod_n() {
        let addresses: Vec<String> = (0..3).map(|i| format!("10.0.0.{i}:80")).collect();
        let registry = BackendRegistry::load(addresses.clone()).unwrap();

        for i in 0..20 {
            assert_eq!(registry.next().address(), addresses[i % 3]);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_selection_spreads_evenly() {
        let registry = Arc::new(
            BackendRegistry::load(["a:1", "b:1", "c:1", "d:1"]).unwrap(),
        );

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let mut picked = Vec::with_capacity(100);
                for _ in 0..100 {
                    picked.push(registry.next().address().to_string());
                }
                picked
            }));
        }

        let mut counts = std::collections::HashMap::new();
        for task in tasks {
            for address in task.await.unwrap() {
                *counts.entry(address).or_insert(0u64) += 1;
            }
        }

        // 800 unique cursor draws over 4 backends: exactly 200 each.
        // Anything else means two tasks collided on a raw index read.
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 200));
    }
}
