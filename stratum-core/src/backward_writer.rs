// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `BackwardWriter` trait: a cursor-buffered sink that is filled from
//! the end backward, used to prepend to a destination (see
//! [`crate::chain_backward_writer::ChainBackwardWriter`]).

use crate::chain::Chain;
use crate::error::Error;

pub trait BackwardWriter {
    /// The reserved-but-unwritten region, in storage order. The fast path
    /// fills it from its tail: the last byte of this slice is adjacent to
    /// the already-written data, and each write shrinks it from that end.
    fn reserved_mut(&mut self) -> &mut [u8];

    /// Bytes of reserved space currently available without a slow-path
    /// call.
    fn available(&self) -> usize;

    /// Marks the last `n` bytes of [`BackwardWriter::reserved_mut`] as
    /// written. `n` must not exceed `available()`.
    fn consume(&mut self, n: usize);

    fn position(&self) -> u64;

    fn limit_position(&self) -> u64;

    fn is_healthy(&self) -> bool;

    fn status(&self) -> Option<&Error>;

    /// Reserves more writable space. Only called when `available() == 0`
    /// and `is_healthy()` is true.
    fn push_slow(&mut self) -> bool;

    /// Writes all of `src`, prepended in the order given. Only called when
    /// `src.len() > available()`.
    fn write_slow(&mut self, src: &[u8]) -> bool;

    fn write_owned_slow(&mut self, src: Vec<u8>) -> bool {
        self.write_slow(&src)
    }

    fn write_chain_slow(&mut self, src: &Chain) -> bool {
        self.write_slow(&src.to_vec())
    }

    fn write_owned_chain_slow(&mut self, src: Chain) -> bool {
        self.write_chain_slow(&src)
    }

    /// Discards everything written past `new_size`. Fails if `new_size`
    /// exceeds the current position (this writer never grows on
    /// truncation).
    fn truncate(&mut self, new_size: u64) -> bool;

    fn close(&mut self) -> bool {
        self.is_healthy()
    }
}

pub trait BackwardWriterExt: BackwardWriter {
    #[inline]
    fn push(&mut self) -> bool {
        if self.available() > 0 {
            return true;
        }
        if !self.is_healthy() {
            return false;
        }
        self.push_slow()
    }

    fn write(&mut self, src: &[u8]) -> bool {
        if src.is_empty() {
            return true;
        }
        if !self.is_healthy() {
            return false;
        }
        if src.len() <= self.available() {
            let n = src.len();
            let reserved = self.reserved_mut();
            let at = reserved.len() - n;
            reserved[at..].copy_from_slice(src);
            self.consume(n);
            true
        } else {
            self.write_slow(src)
        }
    }

    fn write_owned(&mut self, src: Vec<u8>) -> bool {
        if src.len() <= self.available() {
            self.write(&src)
        } else {
            self.write_owned_slow(src)
        }
    }

    fn write_chain(&mut self, src: &Chain) -> bool {
        if (src.size() as usize) <= self.available() {
            self.write(&src.to_vec())
        } else {
            self.write_chain_slow(src)
        }
    }

    fn write_owned_chain(&mut self, src: Chain) -> bool {
        if (src.size() as usize) <= self.available() {
            let v = src.to_vec();
            self.write(&v)
        } else {
            self.write_owned_chain_slow(src)
        }
    }
}

impl<T: BackwardWriter + ?Sized> BackwardWriterExt for T {}
