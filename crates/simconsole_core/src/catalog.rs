use crate::model::Named;

/// Last successfully fetched listing, kept for client-side filtering.
///
/// Every fetch replaces the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog<T> {
    items: Vec<T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Named + Clone> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower-cases every name, stores the result and returns it.
    pub fn replace(&mut self, items: Vec<T>) -> Vec<T> {
        self.items = items.into_iter().map(Named::lowercase_name).collect();
        self.items.clone()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose name contains `query`; an empty query returns everything.
    ///
    /// The query is matched as typed, against names that are already
    /// lower-case.
    pub fn filter(&self, query: &str) -> Vec<T> {
        if query.is_empty() {
            return self.items.clone();
        }
        self.items
            .iter()
            .filter(|item| item.name().contains(query))
            .cloned()
            .collect()
    }
}
