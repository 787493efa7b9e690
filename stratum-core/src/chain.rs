// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Chain`: an ordered rope of `bytes::Bytes` chunks that supports
//! zero-copy prepend, append, and split at either end.
//!
//! This is the concrete destination `ChainBackwardWriter` builds, and the
//! concrete source `ChainReader` walks. Neither chunk storage nor chunk
//! count is part of the stream contract; only `size()` and the byte
//! sequence it yields are observable.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

#[derive(Debug, Default, Clone)]
pub struct Chain {
    chunks: VecDeque<Bytes>,
    size: usize,
}

impl Chain {
    pub fn new() -> Self {
        Chain::default()
    }

    pub fn from_bytes(bytes: Bytes) -> Self {
        let mut chain = Chain::new();
        chain.append_bytes(bytes);
        chain
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Bytes> {
        self.chunks.iter()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    fn append_bytes(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.size += bytes.len();
        self.chunks.push_back(bytes);
    }

    fn prepend_bytes(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.size += bytes.len();
        self.chunks.push_front(bytes);
    }

    pub fn prepend_slice(&mut self, data: &[u8]) {
        self.prepend_bytes(Bytes::copy_from_slice(data));
    }

    pub fn prepend_owned(&mut self, data: Vec<u8>) {
        self.prepend_bytes(Bytes::from(data));
    }

    pub fn prepend_chain(&mut self, mut other: Chain) {
        if other.is_empty() {
            return;
        }
        self.size += other.size;
        while let Some(chunk) = other.chunks.pop_back() {
            self.chunks.push_front(chunk);
        }
    }

    pub fn append_slice(&mut self, data: &[u8]) {
        self.append_bytes(Bytes::copy_from_slice(data));
    }

    pub fn append_owned(&mut self, data: Vec<u8>) {
        self.append_bytes(Bytes::from(data));
    }

    pub fn append_chain(&mut self, mut other: Chain) {
        if other.is_empty() {
            return;
        }
        self.size += other.size;
        while let Some(chunk) = other.chunks.pop_front() {
            self.chunks.push_back(chunk);
        }
    }

    pub fn remove_prefix(&mut self, mut n: usize) {
        assert!(n <= self.size, "remove_prefix beyond chain size");
        self.size -= n;
        while n > 0 {
            let front_len = self.chunks[0].len();
            if front_len <= n {
                n -= front_len;
                self.chunks.pop_front();
            } else {
                let chunk = self.chunks.pop_front().unwrap();
                self.chunks.push_front(chunk.slice(n..));
                n = 0;
            }
        }
    }

    pub fn remove_suffix(&mut self, mut n: usize) {
        assert!(n <= self.size, "remove_suffix beyond chain size");
        self.size -= n;
        while n > 0 {
            let back_len = self.chunks.back().unwrap().len();
            if back_len <= n {
                n -= back_len;
                self.chunks.pop_back();
            } else {
                let chunk = self.chunks.pop_back().unwrap();
                let keep = chunk.len() - n;
                self.chunks.push_back(chunk.slice(..keep));
                n = 0;
            }
        }
    }

    /// Splits the rope at byte offset `at`: `self` keeps the prefix, the
    /// suffix is returned as a new `Chain`. No chunk data is copied.
    pub fn split(&mut self, at: usize) -> Chain {
        assert!(at <= self.size, "split point beyond chain size");
        let mut suffix = Chain::new();
        let mut remaining = self.size - at;
        suffix.size = remaining;
        self.size = at;

        while remaining > 0 {
            let back_len = self.chunks.back().unwrap().len();
            if back_len <= remaining {
                remaining -= back_len;
                suffix.chunks.push_front(self.chunks.pop_back().unwrap());
            } else {
                let chunk = self.chunks.pop_back().unwrap();
                let split_at = chunk.len() - remaining;
                suffix.chunks.push_front(chunk.slice(split_at..));
                self.chunks.push_back(chunk.slice(..split_at));
                remaining = 0;
            }
        }
        suffix
    }

    /// Reserves `len` bytes of zeroed placeholder storage at the front of
    /// the rope and immediately accounts for it in `size()`. Pair with
    /// [`Chain::fix_up_reservation`] once the caller knows how much of the
    /// reservation was actually written; this is how `ChainBackwardWriter`
    /// keeps `limit_pos` equal to `chain.size()` even while a buffer full
    /// of not-yet-written bytes is outstanding.
    pub fn prepend_reservation(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.size += len;
        self.chunks.push_front(Bytes::from(vec![0u8; len]));
    }

    /// Replaces the placeholder chunk installed by the most recent
    /// [`Chain::prepend_reservation`] with `produced`, which may be
    /// shorter than the reservation; the unused prefix is dropped from the
    /// rope's length.
    pub fn fix_up_reservation(&mut self, produced: &[u8]) {
        let placeholder = self.chunks.pop_front().expect("no pending reservation to fix up");
        self.size -= placeholder.len();
        self.append_front(produced);
    }

    fn append_front(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.size += data.len();
        self.chunks.push_front(Bytes::copy_from_slice(data));
    }

    /// Reserves `len` bytes of writable capacity the caller can copy into
    /// directly, for callers that would rather manage their own scratch
    /// buffer than go through `prepend_reservation`/`fix_up_reservation`.
    pub fn scratch_buffer(len: usize) -> BytesMut {
        BytesMut::zeroed(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_and_append_preserve_order() {
        let mut chain = Chain::new();
        chain.append_slice(b"world");
        chain.prepend_slice(b"hello ");
        assert_eq!(chain.to_vec(), b"hello world");
        assert_eq!(chain.size(), 11);
    }

    #[test]
    fn remove_prefix_and_suffix_trim_chunks() {
        let mut chain = Chain::new();
        chain.append_slice(b"abc");
        chain.append_slice(b"def");
        chain.remove_prefix(1);
        assert_eq!(chain.to_vec(), b"bcdef");
        chain.remove_suffix(2);
        assert_eq!(chain.to_vec(), b"bcd");
    }

    #[test]
    fn split_keeps_prefix_and_returns_suffix() {
        let mut chain = Chain::new();
        chain.append_slice(b"abc");
        chain.append_slice(b"def");
        let suffix = chain.split(4);
        assert_eq!(chain.to_vec(), b"abcd");
        assert_eq!(suffix.to_vec(), b"ef");
    }

    #[test]
    fn reservation_round_trip() {
        let mut chain = Chain::new();
        chain.append_slice(b"tail");
        chain.prepend_reservation(8);
        assert_eq!(chain.size(), 12);
        // Only the last 3 bytes of the reservation were actually written.
        chain.fix_up_reservation(b"xyz");
        assert_eq!(chain.size(), 7);
        assert_eq!(chain.to_vec(), b"xyztail");
    }

    #[test]
    fn prepend_chain_transfers_all_chunks_in_order() {
        let mut a = Chain::new();
        a.append_slice(b"cd");
        let mut b = Chain::new();
        b.append_slice(b"ab");
        a.prepend_chain(b);
        assert_eq!(a.to_vec(), b"abcd");
    }
}
