// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `LimitingReader`: clamps a source `Reader` to a fixed byte range,
//! without copying or buffering any bytes of its own.

use crate::backward_writer::{BackwardWriter, BackwardWriterExt};
use crate::dependency::Dependency;
use crate::error::Error;
use crate::reader::{Reader, ReaderExt};
use crate::writer::Writer;

pub struct LimitingReader<'a, R: Reader> {
    source: Dependency<'a, R>,
    size_limit: u64,
}

impl<'a, R: Reader> LimitingReader<'a, R> {
    pub fn new(source: R, size_limit: u64) -> Self {
        Self { source: Dependency::Owned(source), size_limit }
    }

    pub fn new_borrowed(source: &'a mut R, size_limit: u64) -> Self {
        Self { source: Dependency::Borrowed(source), size_limit }
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    pub fn into_inner(self) -> R
    where
        R: Sized,
    {
        self.source.into_owned()
    }

    fn remaining(&self) -> u64 {
        self.size_limit.saturating_sub(self.source.get().position())
    }

    /// The `Reader` -> `BackwardWriter` transfer direction (§4.2): if `n`
    /// exceeds what the limit allows, the source is advanced to the limit
    /// (so `position()` reflects the attempted read) but nothing is
    /// written to `dst` and the call fails.
    pub fn copy_to_backward<W: BackwardWriter + ?Sized>(&mut self, dst: &mut W, n: u64) -> bool {
        if n == 0 {
            return self.is_healthy();
        }
        if !self.is_healthy() {
            return false;
        }
        let remaining = self.remaining();
        if n > remaining {
            let _ = ReaderExt::seek(self, self.size_limit);
            return false;
        }
        crate::reader::copy_to_backward(self, dst, n)
    }
}

impl<'a, R: Reader> Reader for LimitingReader<'a, R> {
    fn buffer(&self) -> &[u8] {
        let src = self.source.get();
        let avail = src.buffer();
        let max_avail = self.remaining().min(avail.len() as u64) as usize;
        &avail[..max_avail]
    }

    fn consume(&mut self, n: usize) {
        self.source.get_mut().consume(n);
    }

    fn position(&self) -> u64 {
        self.source.get().position()
    }

    fn limit_position(&self) -> u64 {
        self.source.get().limit_position().min(self.size_limit)
    }

    fn is_healthy(&self) -> bool {
        self.source.get().is_healthy()
    }

    fn status(&self) -> Option<&Error> {
        self.source.get().status()
    }

    fn pull_slow(&mut self) -> bool {
        debug_assert!(self.buffer().is_empty());
        if self.remaining() == 0 {
            return false;
        }
        ReaderExt::pull(self.source.get_mut())
    }

    fn read_slow(&mut self, dst: &mut [u8]) -> bool {
        debug_assert!(dst.len() > self.buffer().len());
        if dst.len() as u64 > self.remaining() {
            return false;
        }
        ReaderExt::read(self.source.get_mut(), dst)
    }

    fn copy_to_slow<W: Writer + ?Sized>(&mut self, dst: &mut W, n: u64) -> bool {
        debug_assert!(n > self.buffer().len() as u64);
        let remaining = self.remaining();
        if n > remaining {
            let _ = ReaderExt::copy_to(self.source.get_mut(), dst, remaining);
            return false;
        }
        ReaderExt::copy_to(self.source.get_mut(), dst, n)
    }

    fn supports_random_access(&self) -> bool {
        self.source.get().supports_random_access()
    }

    fn seek_slow(&mut self, new_pos: u64) -> bool {
        let clamped = new_pos.min(self.size_limit);
        let ok = ReaderExt::seek(self.source.get_mut(), clamped);
        ok && new_pos <= self.size_limit
    }

    fn size(&mut self) -> Option<u64> {
        self.source.get_mut().size().map(|s| s.min(self.size_limit))
    }

    fn close(&mut self) -> bool {
        if self.source.is_owned() {
            self.source.get_mut().close()
        } else {
            self.is_healthy()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_backward_writer::ChainBackwardWriter;
    use crate::chain::Chain;
    use crate::mem::{SliceReader, VecWriter};
    use crate::writer::WriterExt;

    #[test]
    fn read_truncates_at_limit() {
        let source = SliceReader::new(b"0123456789");
        let mut r = LimitingReader::new(source, 4);
        let mut buf = [0u8; 4];
        assert!(ReaderExt::read(&mut r, &mut buf));
        assert_eq!(&buf, b"0123");
        let mut one = [0u8; 1];
        assert!(!ReaderExt::read(&mut r, &mut one));
    }

    #[test]
    fn seek_clamps_to_limit() {
        let source = SliceReader::new(b"0123456789");
        let mut r = LimitingReader::new(source, 4);
        assert!(ReaderExt::seek(&mut r, 4));
        assert_eq!(ReaderExt::pos(&r), 4);
        assert!(!ReaderExt::seek(&mut r, 5));
    }

    #[test]
    fn copy_to_forward_emits_prefix_then_fails() {
        let source = SliceReader::new(b"0123456789");
        let mut r = LimitingReader::new(source, 4);
        let mut w = VecWriter::new();
        assert!(!ReaderExt::copy_to(&mut r, &mut w, 6));
        assert!(Writer::close(&mut w));
        assert_eq!(w.into_vec(), b"0123");
    }

    #[test]
    fn copy_to_backward_emits_nothing_on_overrun() {
        let source = SliceReader::new(b"0123456789");
        let mut r = LimitingReader::new(source, 4);
        let mut chain = Chain::new();
        let mut w = ChainBackwardWriter::new_borrowed(&mut chain);
        assert!(!r.copy_to_backward(&mut w, 6));
        assert!(BackwardWriterExt::write(&mut w, b""));
        assert!(chain.is_empty());
    }
}
