//! Traits shared by persisted entities

use serde::Serialize;
use serde::de::DeserializeOwned;

/// An entity stored as one element of a JSON array under [`Record::KEY`]
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Store key of the live collection
    const KEY: &'static str;

    /// Short kind name used in file names and CLI output
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Creation timestamp (Unix milliseconds)
    fn created_at(&self) -> i64;

    /// Adjust a freshly imported copy before it is appended to `existing`
    fn prepare_import(&mut self, _existing: &[Self]) {}
}

/// An entity the user orders by hand
pub trait Ordered {
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

/// Next order value after every item in `items`
pub fn next_order<T: Ordered>(items: &[T]) -> i64 {
    items.iter().map(Ordered::order).max().map_or(0, |max| max + 1)
}

/// Renumber `items` 0..n in their current sequence
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (i, item) in items.iter_mut().enumerate() {
        item.set_order(i as i64);
    }
}

macro_rules! impl_record {
    ($ty:ty, $key:expr, $kind:literal) => {
        impl $crate::domain::Record for $ty {
            const KEY: &'static str = $key;
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> i64 {
                self.created_at
            }
        }
    };
    // Imported copies go to the end of the hand-ordered collection
    ($ty:ty, $key:expr, $kind:literal, ordered) => {
        impl $crate::domain::Record for $ty {
            const KEY: &'static str = $key;
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> i64 {
                self.created_at
            }

            fn prepare_import(&mut self, existing: &[Self]) {
                self.order = $crate::domain::next_order(existing);
            }
        }
    };
}

macro_rules! impl_ordered {
    ($ty:ty) => {
        impl $crate::domain::Ordered for $ty {
            fn order(&self) -> i64 {
                self.order
            }

            fn set_order(&mut self, order: i64) {
                self.order = order;
            }
        }
    };
}

pub(crate) use {impl_ordered, impl_record};
