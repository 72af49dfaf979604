//! State slices registered for the lifetime of an active route.

use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::debug;

type SliceValue = Arc<dyn Any + Send + Sync>;

/// Supplies the initial value of a route-scoped slice.
pub trait StateSlice: Send + Sync {
    fn key(&self) -> &'static str;
    fn create(&self) -> SliceValue;
}

pub struct SliceProvider<F> {
    key: &'static str,
    init: F,
}

impl<T, F> SliceProvider<F>
where
    T: Any + Send + Sync,
    F: Fn() -> T + Send + Sync,
{
    pub fn new(key: &'static str, init: F) -> Self {
        Self { key, init }
    }
}

impl<T, F> StateSlice for SliceProvider<F>
where
    T: Any + Send + Sync,
    F: Fn() -> T + Send + Sync,
{
    fn key(&self) -> &'static str {
        self.key
    }

    fn create(&self) -> SliceValue {
        Arc::new((self.init)())
    }
}

/// Shared store the active route's slices live in.
#[derive(Clone, Default)]
pub struct StateRegistry {
    slices: Arc<RwLock<HashMap<&'static str, SliceValue>>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let slices = self.slices.read().unwrap_or_else(PoisonError::into_inner);
        let value = Arc::clone(slices.get(key)?);
        value.downcast::<T>().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self
            .slices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Installs fresh values for `providers`. They stay registered until the
    /// returned scope is dropped.
    pub fn install(&self, providers: &[Arc<dyn StateSlice>]) -> SliceScope {
        let mut slices = self.slices.write().unwrap_or_else(PoisonError::into_inner);
        let mut keys = Vec::with_capacity(providers.len());
        for provider in providers {
            slices.insert(provider.key(), provider.create());
            keys.push(provider.key());
        }
        if !keys.is_empty() {
            debug!(?keys, "state slices installed");
        }
        SliceScope {
            registry: self.clone(),
            keys,
        }
    }
}

/// Removes its slices from the registry when dropped.
#[must_use]
pub struct SliceScope {
    registry: StateRegistry,
    keys: Vec<&'static str>,
}

impl SliceScope {
    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }
}

impl Drop for SliceScope {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let mut slices = self
            .registry
            .slices
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            slices.remove(key);
        }
        debug!(keys = ?self.keys, "state slices torn down");
    }
}
