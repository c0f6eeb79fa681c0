//! Tuple schemas.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::Type;
use crate::common::{Error, Result};

/// One column of a [`TupleDesc`].
#[derive(Debug, Clone)]
pub struct TdItem {
    pub field_type: Type,
    pub field_name: Option<String>,
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_name {
            Some(name) => write!(f, "{}({})", self.field_type, name),
            None => write!(f, "{}(null)", self.field_type),
        }
    }
}

/// The schema of a tuple: an ordered, non-empty list of typed, optionally
/// named columns.
///
/// Two schemas are equal when their type sequences match position by
/// position; names only matter for [`TupleDesc::index_of`].
///
/// # Example
/// ```
/// use heapstore::tuple::{TupleDesc, Type};
///
/// let td = TupleDesc::new(
///     vec![Type::Int, Type::String],
///     vec![Some("id".into()), Some("name".into())],
/// ).unwrap();
/// assert_eq!(td.index_of("name"), Some(1));
/// assert_eq!(td.byte_size(), 4 + 132);
/// ```
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Build a schema from parallel type and name lists.
    ///
    /// # Errors
    /// - `Error::InvalidSchema` if there are no columns or the lists differ
    ///   in length
    pub fn new(types: Vec<Type>, names: Vec<Option<String>>) -> Result<Self> {
        if types.is_empty() {
            return Err(Error::InvalidSchema("a schema needs at least one field"));
        }
        if types.len() != names.len() {
            return Err(Error::InvalidSchema("type and name lists differ in length"));
        }
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, field_name)| TdItem {
                field_type,
                field_name,
            })
            .collect();
        Ok(Self { items })
    }

    /// Build a schema of anonymous columns.
    pub fn from_types(types: Vec<Type>) -> Result<Self> {
        let names = vec![None; types.len()];
        Self::new(types, names)
    }

    /// Concatenate two schemas: all of `a`'s columns, then all of `b`'s.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let items = a.items.iter().chain(b.items.iter()).cloned().collect();
        TupleDesc { items }
    }

    #[inline]
    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> Option<Type> {
        self.items.get(i).map(|item| item.field_type)
    }

    /// Name of column `i`; `None` both for an unnamed column and for an
    /// index out of range.
    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items.get(i).and_then(|item| item.field_name.as_deref())
    }

    /// Index of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.field_name.as_deref() == Some(name))
    }

    /// Fixed size in bytes of a tuple with this schema.
    pub fn byte_size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.len()).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TdItem> {
        self.items.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.items.iter().map(|item| item.field_type)
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types().eq(other.types())
    }
}

impl Eq for TupleDesc {}

impl Hash for TupleDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for ty in self.types() {
            ty.hash(state);
        }
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TupleDesc {
    type Item = &'a TdItem;
    type IntoIter = std::slice::Iter<'a, TdItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
