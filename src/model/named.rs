use serde::{Deserialize, Serialize};

use crate::model::CimName;

/// Anything identified by a case-insensitive CIM name.
pub trait Named {
    fn name(&self) -> &CimName;
}

/// Ordered list of named elements with case-insensitive lookup.
///
/// Used for qualifiers, properties, methods, parameters and key bindings,
/// all of which keep declaration order but are addressed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedList<T>(Vec<T>);

impl<T> Default for NamedList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Named> NamedList<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.0.iter().position(|item| item.name().key() == key)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.position(name).map(|idx| &self.0[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.position(name).map(move |idx| &mut self.0[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Insert or replace by name. A replacement keeps the original position.
    pub fn insert(&mut self, item: T) -> Option<T> {
        match self.position(item.name().as_str()) {
            Some(idx) => Some(std::mem::replace(&mut self.0[idx], item)),
            None => {
                self.0.push(item);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        self.position(name).map(|idx| self.0.remove(idx))
    }

    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.0.retain(f);
    }

    pub fn names(&self) -> impl Iterator<Item = &CimName> {
        self.0.iter().map(Named::name)
    }
}

impl<T> NamedList<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<T: Named> FromIterator<T> for NamedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.insert(item);
        }
        list
    }
}

impl<T> IntoIterator for NamedList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a NamedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
