// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ChainBackwardWriter`: writes into a [`Chain`] by prepending at the
//! front, while still producing bytes in forward order as the caller sees
//! them.
//!
//! A small reservation is grown at the front of the rope for the common
//! case of many short writes; each byte of it lands directly in its final
//! home, so the buffer never needs a second copy when it's fully used.
//! Large writes (`write_owned`, `write_chain`, `write_owned_chain`) bypass
//! the reservation machinery entirely and splice their payload into the
//! rope without copying.

use crate::backward_writer::BackwardWriter;
use crate::chain::Chain;
use crate::dependency::Dependency;
use crate::error::{Error, Health};
use crate::position::{checked_add, BackwardCursor};

const RECOMMENDED_BUFFER_SIZE: usize = 4096;

pub struct ChainBackwardWriter<'a> {
    chain: Dependency<'a, Chain>,
    /// Scratch storage for the current reservation; `scratch.len()` is
    /// also its capacity (and `cursor.start`). Empty when nothing is
    /// reserved.
    scratch: Vec<u8>,
    /// `limit` is always 0: the reserved-but-unwritten region is
    /// `scratch[0..cursor.cursor)`, adjacent to whatever is already
    /// committed to `chain`.
    cursor: BackwardCursor,
    health: Health,
}

impl<'a> ChainBackwardWriter<'a> {
    pub fn new(chain: Chain) -> Self {
        let start_pos = chain.size();
        Self {
            chain: Dependency::Owned(chain),
            scratch: Vec::new(),
            cursor: BackwardCursor { start_pos, start: 0, cursor: 0, limit: 0 },
            health: Health::new(),
        }
    }

    pub fn new_borrowed(chain: &'a mut Chain) -> Self {
        let start_pos = chain.size();
        Self {
            chain: Dependency::Borrowed(chain),
            scratch: Vec::new(),
            cursor: BackwardCursor { start_pos, start: 0, cursor: 0, limit: 0 },
            health: Health::new(),
        }
    }

    pub fn into_inner(self) -> Chain {
        self.chain.into_owned()
    }

    /// Folds any pending reservation back into `chain`, replacing the
    /// placeholder bytes with what was actually produced and trimming the
    /// unused prefix. After this, `chain.size() == position()`.
    fn commit_reservation(&mut self) {
        if self.scratch.is_empty() {
            return;
        }
        debug_assert_eq!(self.chain.get().size(), BackwardWriter::limit_position(self));
        let produced_from = self.cursor.cursor;
        self.chain.get_mut().fix_up_reservation(&self.scratch[produced_from..]);
        self.scratch.clear();
        let start_pos = self.chain.get().size();
        self.cursor = BackwardCursor { start_pos, start: 0, cursor: 0, limit: 0 };
    }
}

impl<'a> BackwardWriter for ChainBackwardWriter<'a> {
    fn reserved_mut(&mut self) -> &mut [u8] {
        let cursor = self.cursor.cursor;
        &mut self.scratch[..cursor]
    }

    fn available(&self) -> usize {
        self.cursor.available()
    }

    fn consume(&mut self, n: usize) {
        self.cursor.consume(n);
    }

    fn position(&self) -> u64 {
        self.cursor.pos()
    }

    fn limit_position(&self) -> u64 {
        self.cursor.limit_pos()
    }

    fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    fn status(&self) -> Option<&Error> {
        self.health.status()
    }

    fn push_slow(&mut self) -> bool {
        debug_assert_eq!(self.available(), 0);
        if !self.is_healthy() {
            return false;
        }
        self.commit_reservation();
        let current_size = self.chain.get().size();
        if checked_add(current_size, 1).is_err() {
            return self.health.fail(Error::Overflow);
        }
        let cap = RECOMMENDED_BUFFER_SIZE.min((u64::MAX - current_size) as usize);
        self.chain.get_mut().prepend_reservation(cap);
        self.scratch = vec![0u8; cap];
        self.cursor = BackwardCursor { start_pos: current_size, start: cap, cursor: cap, limit: 0 };
        true
    }

    fn write_slow(&mut self, src: &[u8]) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if checked_add(self.chain.get().size(), src.len() as u64).is_err() {
            return self.health.fail(Error::Overflow);
        }
        self.commit_reservation();
        self.chain.get_mut().prepend_slice(src);
        self.cursor.start_pos = self.chain.get().size();
        true
    }

    fn write_owned_slow(&mut self, src: Vec<u8>) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if checked_add(self.chain.get().size(), src.len() as u64).is_err() {
            return self.health.fail(Error::Overflow);
        }
        self.commit_reservation();
        self.chain.get_mut().prepend_owned(src);
        self.cursor.start_pos = self.chain.get().size();
        true
    }

    fn write_chain_slow(&mut self, src: &Chain) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if checked_add(self.chain.get().size(), src.size()).is_err() {
            return self.health.fail(Error::Overflow);
        }
        self.commit_reservation();
        self.chain.get_mut().prepend_chain(src.clone());
        self.cursor.start_pos = self.chain.get().size();
        true
    }

    fn write_owned_chain_slow(&mut self, src: Chain) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if checked_add(self.chain.get().size(), src.size()).is_err() {
            return self.health.fail(Error::Overflow);
        }
        self.commit_reservation();
        self.chain.get_mut().prepend_chain(src);
        self.cursor.start_pos = self.chain.get().size();
        true
    }

    fn truncate(&mut self, new_size: u64) -> bool {
        if new_size > BackwardWriter::position(self) {
            return false;
        }
        if new_size >= self.cursor.start_pos {
            let new_cursor = self.cursor.start - (new_size - self.cursor.start_pos) as usize;
            self.cursor.cursor = new_cursor;
            true
        } else {
            self.commit_reservation();
            let current = self.chain.get().size();
            let drop = (current - new_size) as usize;
            self.chain.get_mut().remove_prefix(drop);
            self.cursor.start_pos = self.chain.get().size();
            true
        }
    }

    fn close(&mut self) -> bool {
        self.commit_reservation();
        self.is_healthy()
    }
}

impl<'a> Drop for ChainBackwardWriter<'a> {
    fn drop(&mut self) {
        let _ = BackwardWriter::close(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward_writer::BackwardWriterExt;

    #[test]
    fn writes_prepend_in_forward_order() {
        let mut chain = Chain::new();
        chain.append_slice(b"!");
        {
            let mut w = ChainBackwardWriter::new_borrowed(&mut chain);
            assert!(BackwardWriterExt::write(&mut w, b"world"));
            assert!(BackwardWriterExt::write(&mut w, b"hello "));
            assert!(BackwardWriter::close(&mut w));
        }
        // Writes are applied in call order, each prepended before the
        // previous content, so the *last* write ends up leftmost.
        assert_eq!(chain.to_vec(), b"hello world!");
    }

    #[test]
    fn limit_position_tracks_chain_size_through_reservation() {
        let mut chain = Chain::new();
        {
            let mut w = ChainBackwardWriter::new_borrowed(&mut chain);
            assert!(BackwardWriterExt::push(&mut w));
            assert_eq!(chain.size(), BackwardWriter::limit_position(&w));
            assert!(BackwardWriterExt::write(&mut w, b"abc"));
            assert_eq!(chain.size(), BackwardWriter::limit_position(&w));
            assert!(BackwardWriter::close(&mut w));
            assert_eq!(chain.size(), BackwardWriter::limit_position(&w));
        }
        assert_eq!(chain.to_vec(), b"abc");
    }

    #[test]
    fn large_write_bypasses_reservation_and_is_not_copied_twice() {
        let mut chain = Chain::new();
        let payload = vec![7u8; 1 << 20];
        let moved = payload.clone();
        let original_ptr = moved.as_ptr();
        {
            let mut w = ChainBackwardWriter::new_borrowed(&mut chain);
            assert!(BackwardWriterExt::write_owned(&mut w, moved));
            assert!(BackwardWriter::close(&mut w));
        }
        assert_eq!(chain.size(), payload.len() as u64);
        assert_eq!(chain.chunk_count(), 1);
        // `Bytes::from(Vec<u8>)` absorbs the allocation without copying;
        // the chunk landed in `chain` must be the same allocation `moved`
        // pointed at, not a fresh copy.
        assert_eq!(chain.chunks().next().unwrap().as_ptr(), original_ptr);
    }

    #[test]
    fn truncate_within_and_below_start_pos() {
        let mut chain = Chain::new();
        {
            let mut w = ChainBackwardWriter::new_borrowed(&mut chain);
            assert!(BackwardWriterExt::write(&mut w, b"abc"));
            assert!(BackwardWriterExt::push(&mut w));
            assert!(BackwardWriterExt::write(&mut w, b"def"));
            assert!(w.truncate(4));
            assert!(BackwardWriter::close(&mut w));
        }
        // truncate(4) rolls the pending "def" reservation back to its
        // byte closest to the already-committed "abc", i.e. "f".
        assert_eq!(chain.to_vec(), b"fabc");
    }
}
