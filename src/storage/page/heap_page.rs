//! Heap page - a slot bitmap followed by fixed-width tuple slots.

use std::sync::Arc;

use crate::common::{Error, PageId, RecordId, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

/// A page of a heap file, decoded into its slot bitmap and tuples.
///
/// # Layout
/// ```text
/// ┌──────────────────────┬────────┬────────┬─────┬──────────┬─────────┐
/// │ bitmap               │ slot 0 │ slot 1 │ ... │ slot N-1 │ zeroes  │
/// │ ceil(N / 8) bytes    │        │        │     │          │         │
/// └──────────────────────┴────────┴────────┴─────┴──────────┴─────────┘
/// ```
/// `N = floor(page_size × 8 / (tuple_size × 8 + 1))`: each tuple costs its
/// own bytes plus one bitmap bit. Bit `i` lives in byte `i / 8` at position
/// `i % 8` (least significant bit first). Page identity and schema are not
/// stored in the page; the caller supplies both.
///
/// # Before-image
/// The first mutation after the page was clean copies the clean byte image
/// aside. Commit drops that copy, abort restores from it. Later mutations
/// in the same dirty period do not copy again.
#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    page_size: usize,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
    before_image: Option<Vec<u8>>,
}

impl HeapPage {
    /// Number of tuple slots a page can hold.
    pub fn slots_per_page(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    /// Number of bitmap bytes for `num_slots` slots.
    pub fn header_size(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// Byte image of a page with every slot free.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Decode a page from its on-disk image.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if `data` is not a valid image for `desc`
    pub fn new(pid: PageId, desc: Arc<TupleDesc>, data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let (header, tuples) = Self::decode(pid, &desc, data)?;
        Ok(Self {
            pid,
            desc,
            page_size,
            header,
            tuples,
            dirtier: None,
            before_image: None,
        })
    }

    fn decode(
        pid: PageId,
        desc: &Arc<TupleDesc>,
        data: &[u8],
    ) -> Result<(Vec<u8>, Vec<Option<Tuple>>)> {
        let tuple_size = desc.byte_size();
        let num_slots = Self::slots_per_page(data.len(), tuple_size);
        let header_size = Self::header_size(num_slots);
        let header = data[..header_size].to_vec();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] & (1 << (slot % 8)) == 0 {
                tuples.push(None);
                continue;
            }
            let start = header_size + slot * tuple_size;
            let mut tuple = Tuple::parse(desc.clone(), &data[start..start + tuple_size])?;
            tuple.set_record_id(Some(RecordId::new(pid, slot as u32)));
            tuples.push(Some(tuple));
        }
        Ok((header, tuples))
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.tuples.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots()).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots() && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Encode the page into its on-disk image.
    pub fn page_data(&self) -> Vec<u8> {
        let tuple_size = self.desc.byte_size();
        let header_size = self.header.len();
        let mut data = vec![0u8; self.page_size];
        data[..header_size].copy_from_slice(&self.header);

        for (slot, tuple) in self.tuples.iter().enumerate() {
            if let Some(tuple) = tuple {
                let start = header_size + slot * tuple_size;
                tuple.write_to(&mut data[start..start + tuple_size]);
            }
        }
        data
    }

    /// Place `tuple` in the first free slot and set its record id.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple's schema differs from the page's
    /// - `Error::PageFull` if every slot is taken
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if **tuple.desc() != *self.desc {
            return Err(Error::SchemaMismatch(format!(
                "tuple [{}] does not match page [{}]",
                tuple.desc(),
                self.desc
            )));
        }
        let slot = (0..self.num_slots())
            .find(|&i| !self.is_slot_used(i))
            .ok_or(Error::PageFull(self.pid))?;

        self.capture_before_image();
        let rid = RecordId::new(self.pid, slot as u32);
        tuple.set_record_id(Some(rid));
        self.set_slot(slot, true);
        self.tuples[slot] = Some(tuple.clone());
        Ok(rid)
    }

    /// Free the slot named by `tuple`'s record id.
    ///
    /// # Errors
    /// - `Error::MissingRecordId` if the tuple was never placed
    /// - `Error::InvalidRecord` if the record id names another page, a slot
    ///   out of range or an empty slot
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        if rid.page_id() != self.pid {
            return Err(Error::InvalidRecord {
                rid,
                reason: "tuple is on another page",
            });
        }
        let slot = rid.slot() as usize;
        if slot >= self.num_slots() {
            return Err(Error::InvalidRecord {
                rid,
                reason: "slot out of range",
            });
        }
        if !self.is_slot_used(slot) {
            return Err(Error::InvalidRecord {
                rid,
                reason: "slot is already empty",
            });
        }

        self.capture_before_image();
        self.set_slot(slot, false);
        self.tuples[slot] = None;
        Ok(())
    }

    /// Tuples in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    // ========================================================================
    // Dirty tracking and before-image
    // ========================================================================

    fn capture_before_image(&mut self) {
        if self.before_image.is_none() {
            self.before_image = Some(self.page_data());
        }
    }

    /// The transaction that dirtied this page, if any.
    #[inline]
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    /// Neither owned by a transaction nor carrying unsaved mutations.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.dirtier.is_none() && self.before_image.is_none()
    }

    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtier = Some(tid);
    }

    /// Accept the current contents as the new clean state.
    pub fn mark_clean(&mut self) {
        self.dirtier = None;
        self.before_image = None;
    }

    /// Byte image of the page as of its last clean state.
    pub fn before_image_data(&self) -> Vec<u8> {
        match &self.before_image {
            Some(image) => image.clone(),
            None => self.page_data(),
        }
    }

    /// Restore the last clean state and mark the page clean.
    pub fn rollback(&mut self) -> Result<()> {
        if let Some(image) = self.before_image.take() {
            let (header, tuples) = Self::decode(self.pid, &self.desc, &image)?;
            self.header = header;
            self.tuples = tuples;
        }
        self.dirtier = None;
        Ok(())
    }
}
