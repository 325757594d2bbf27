//! Typed values attached to a client by its features.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Names a value of type `T` in [`Attributes`].
pub struct AttributeKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
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
        write!(f, "AttributeKey({})", self.name)
    }
}

/// A map from [`AttributeKey`] to values of the key's type.
///
/// A value stored under a name is only visible through a key of the same type.
#[derive(Default)]
pub struct Attributes {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, returning the value previously stored under the same key.
    pub fn put<T: Send + Sync + 'static>(&mut self, key: AttributeKey<T>, value: T) -> Option<T> {
        self.values.insert(key.name, Box::new(value)).and_then(|previous| previous.downcast().ok().map(|previous| *previous))
    }

    pub fn get<T: 'static>(&self, key: AttributeKey<T>) -> Option<&T> {
        self.values.get(key.name).and_then(|value| value.downcast_ref())
    }

    pub fn contains<T: 'static>(&self, key: AttributeKey<T>) -> bool {
        self.get(key).is_some()
    }

    pub fn remove<T: 'static>(&mut self, key: AttributeKey<T>) -> Option<T> {
        if !self.contains(key) {
            return None;
        }
        self.values.remove(key.name).and_then(|value| value.downcast().ok().map(|value| *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
