//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The closed set of cached page formats
//! - [`HeapPage`] - Slot bitmap + fixed-width tuple slots

mod heap_page;
#[allow(clippy::module_inception)]
mod page;

pub use heap_page::HeapPage;
pub use page::Page;
