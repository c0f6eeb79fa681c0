//! Tuples.

use std::fmt;
use std::sync::Arc;

use super::{Field, TupleDesc};
use crate::common::{Error, RecordId, Result};

/// A fixed-arity record conforming to a [`TupleDesc`].
///
/// The record id is `None` until the tuple has been placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Create a tuple, checking arity and field types against `desc`.
    ///
    /// Over-long strings are cut the way they will be stored.
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != desc.num_fields() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} fields, got {}",
                desc.num_fields(),
                fields.len()
            )));
        }
        for (i, (field, ty)) in fields.iter().zip(desc.types()).enumerate() {
            if field.field_type() != ty {
                return Err(Error::SchemaMismatch(format!(
                    "field {} is {}, schema says {}",
                    i,
                    field.field_type(),
                    ty
                )));
            }
        }
        Ok(Self {
            desc,
            fields: fields.into_iter().map(Field::normalized).collect(),
            record_id: None,
        })
    }

    /// Decode a tuple from its fixed-width slot image.
    pub fn parse(desc: Arc<TupleDesc>, buf: &[u8]) -> Result<Self> {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for ty in desc.types() {
            fields.push(Field::parse(ty, &buf[offset..])?);
            offset += ty.len();
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    /// Encode into a slot of exactly `desc.byte_size()` bytes.
    pub fn write_to(&self, buf: &mut [u8]) {
        let mut offset = 0;
        for field in &self.fields {
            let len = field.field_type().len();
            field.write_to(&mut buf[offset..offset + len]);
            offset += len;
        }
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn fields(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Replace field `i`; the new value must have the column's type.
    pub fn set_field(&mut self, i: usize, field: Field) -> Result<()> {
        match self.desc.field_type(i) {
            Some(ty) if ty == field.field_type() => {
                self.fields[i] = field.normalized();
                Ok(())
            }
            Some(ty) => Err(Error::SchemaMismatch(format!(
                "field {} is {}, got {}",
                i,
                ty,
                field.field_type()
            ))),
            None => Err(Error::SchemaMismatch(format!(
                "field index {} out of range for {} fields",
                i,
                self.desc.num_fields()
            ))),
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    /// Swap in another schema with the same types, e.g. one carrying
    /// table-qualified column names.
    pub fn reset_desc(&mut self, desc: Arc<TupleDesc>) -> Result<()> {
        if *desc != *self.desc {
            return Err(Error::SchemaMismatch(format!(
                "cannot retype [{}] as [{}]",
                self.desc, desc
            )));
        }
        self.desc = desc;
        Ok(())
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
