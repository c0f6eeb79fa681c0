//! Page - the unit of caching, locking and I/O.
//!
//! A [`Page`] is a closed set of page formats. Heap pages are the only
//! format today; the buffer pool works against this enum so that another
//! format (e.g. an index page) only adds a variant.

use crate::common::{PageId, Result, TransactionId};

use super::HeapPage;

/// A cached page of any supported format.
#[derive(Debug)]
pub enum Page {
    Heap(HeapPage),
}

impl Page {
    #[inline]
    pub fn id(&self) -> PageId {
        match self {
            Page::Heap(page) => page.id(),
        }
    }

    /// The transaction that dirtied this page, if any.
    #[inline]
    pub fn dirtier(&self) -> Option<TransactionId> {
        match self {
            Page::Heap(page) => page.dirtier(),
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirtier().is_some()
    }

    /// Safe to evict: no owner and no unsaved mutation.
    #[inline]
    pub fn is_clean(&self) -> bool {
        match self {
            Page::Heap(page) => page.is_clean(),
        }
    }

    pub fn mark_dirty(&mut self, tid: TransactionId) {
        match self {
            Page::Heap(page) => page.mark_dirty(tid),
        }
    }

    pub fn mark_clean(&mut self) {
        match self {
            Page::Heap(page) => page.mark_clean(),
        }
    }

    /// Current on-disk image.
    pub fn page_data(&self) -> Vec<u8> {
        match self {
            Page::Heap(page) => page.page_data(),
        }
    }

    /// Image as of the last clean state.
    pub fn before_image_data(&self) -> Vec<u8> {
        match self {
            Page::Heap(page) => page.before_image_data(),
        }
    }

    pub fn rollback(&mut self) -> Result<()> {
        match self {
            Page::Heap(page) => page.rollback(),
        }
    }

    pub fn as_heap(&self) -> &HeapPage {
        match self {
            Page::Heap(page) => page,
        }
    }

    pub fn as_heap_mut(&mut self) -> &mut HeapPage {
        match self {
            Page::Heap(page) => page,
        }
    }
}

impl From<HeapPage> for Page {
    fn from(page: HeapPage) -> Self {
        Page::Heap(page)
    }
}
