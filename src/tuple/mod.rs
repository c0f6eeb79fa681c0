//! Tuples and their schemas.
//!
//! - [`Type`] / [`Field`] - Fixed-width column types and values
//! - [`TupleDesc`] - Ordered list of typed, optionally named columns
//! - [`Tuple`] - A record conforming to a `TupleDesc`

mod field;
#[allow(clippy::module_inception)]
mod tuple;
mod tuple_desc;

pub use field::{Field, Type};
pub use tuple::Tuple;
pub use tuple_desc::{TdItem, TupleDesc};
