// strata/src/core/attributes.rs

//! A typed key/value bag owned by a pipeline.

use crate::error::{StrataError, StrataResult};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed key into an [`Attributes`] bag. Keys are identified by name; the
/// type parameter only fixes what `get` and `put` accept.
pub struct AttributeKey<T> {
  name: &'static str,
  _phantom: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
  pub const fn new(name: &'static str) -> Self {
    Self {
      name,
      _phantom: PhantomData,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl<T> Clone for AttributeKey<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "AttributeKey({}: {})", self.name, std::any::type_name::<T>())
  }
}

type AttributeValue = Arc<dyn Any + Send + Sync>;

/// Thread-safe attribute storage.
///
/// Values are stored behind `Arc`, so cloning an `Attributes` is a shallow
/// snapshot: the clone sees the values present at clone time, and later
/// `put`s on either side are not shared.
#[derive(Default)]
pub struct Attributes {
  map: RwLock<HashMap<&'static str, AttributeValue>>,
}

impl Attributes {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns a clone of the value stored under `key`, or `None` if the key is
  /// absent or holds a value of another type.
  pub fn get<T>(&self, key: &AttributeKey<T>) -> Option<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    self.map.read().get(key.name).and_then(|v| v.downcast_ref::<T>().cloned())
  }

  /// Stores `value`, replacing whatever was stored under the same name.
  pub fn put<T>(&self, key: &AttributeKey<T>, value: T)
  where
    T: Send + Sync + 'static,
  {
    self.map.write().insert(key.name, Arc::new(value));
  }

  pub fn contains<T>(&self, key: &AttributeKey<T>) -> bool {
    self.map.read().contains_key(key.name)
  }

  /// Removes the entry. Returns whether something was stored under the name.
  pub fn remove<T>(&self, key: &AttributeKey<T>) -> bool {
    self.map.write().remove(key.name).is_some()
  }

  /// Returns the stored value, computing and storing it first if absent.
  /// `init` runs at most once per key even under concurrent callers.
  ///
  /// A value of another type stored under the same name is left in place and
  /// reported as `StrataError::AttributeTypeMismatch`; `init` does not run.
  pub fn compute_if_absent<T>(&self, key: &AttributeKey<T>, init: impl FnOnce() -> T) -> StrataResult<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    if let Some(existing) = self.get(key) {
      return Ok(existing);
    }
    let mut map = self.map.write();
    if let Some(stored) = map.get(key.name) {
      return match stored.downcast_ref::<T>() {
        Some(existing) => Ok(existing.clone()),
        None => Err(StrataError::AttributeTypeMismatch {
          key: key.name,
          expected: std::any::type_name::<T>(),
        }),
      };
    }
    let value = init();
    map.insert(key.name, Arc::new(value.clone()));
    Ok(value)
  }

  pub fn keys(&self) -> Vec<&'static str> {
    let mut keys: Vec<_> = self.map.read().keys().copied().collect();
    keys.sort_unstable();
    keys
  }

  pub fn is_empty(&self) -> bool {
    self.map.read().is_empty()
  }
}

impl Clone for Attributes {
  fn clone(&self) -> Self {
    Self {
      map: RwLock::new(self.map.read().clone()),
    }
  }
}

impl fmt::Debug for Attributes {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Attributes").field("keys", &self.keys()).finish()
  }
}
