// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory readers and writers: `SliceReader`/`StringReader` expose an
//! existing buffer directly as a `Reader` with no copying at all, and
//! `ChainReader` walks a [`Chain`] chunk by chunk. `VecWriter`/
//! `ChainWriter` are thin [`BufferedWriter`] instances over a growable
//! sink, so their buffering and flush behaviour comes straight from the
//! same mixin `FdWriter` uses.

use bytes::Bytes;

use crate::buffered::{BufferedWriter, RawWrite};
use crate::chain::Chain;
use crate::dependency::Dependency;
use crate::error::{Error, Health};
use crate::reader::Reader;

/// A `Reader` over a borrowed byte slice. The entire slice is the buffer
/// window; there is no slow path to speak of.
pub struct SliceReader<'a> {
    data: &'a [u8],
    cursor: usize,
    health: Health,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0, health: Health::new() }
    }
}

impl<'a> Reader for SliceReader<'a> {
    fn buffer(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.data.len() - self.cursor);
        self.cursor += n;
    }

    fn position(&self) -> u64 {
        self.cursor as u64
    }

    fn limit_position(&self) -> u64 {
        self.data.len() as u64
    }

    fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    fn status(&self) -> Option<&Error> {
        self.health.status()
    }

    fn pull_slow(&mut self) -> bool {
        false
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn seek_slow(&mut self, new_pos: u64) -> bool {
        if new_pos > self.data.len() as u64 {
            return false;
        }
        self.cursor = new_pos as usize;
        true
    }

    fn size(&mut self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

/// A `Reader` over an owned buffer (anything that derefs to `[u8]`, e.g.
/// `String`, `Vec<u8>`, `bytes::Bytes`).
pub struct StringReader<D> {
    data: D,
    cursor: usize,
    health: Health,
}

impl<D: AsRef<[u8]>> StringReader<D> {
    pub fn new(data: D) -> Self {
        Self { data, cursor: 0, health: Health::new() }
    }

    pub fn into_inner(self) -> D {
        self.data
    }
}

impl<D: AsRef<[u8]>> Reader for StringReader<D> {
    fn buffer(&self) -> &[u8] {
        &self.data.as_ref()[self.cursor..]
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.data.as_ref().len() - self.cursor);
        self.cursor += n;
    }

    fn position(&self) -> u64 {
        self.cursor as u64
    }

    fn limit_position(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    fn status(&self) -> Option<&Error> {
        self.health.status()
    }

    fn pull_slow(&mut self) -> bool {
        false
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn seek_slow(&mut self, new_pos: u64) -> bool {
        if new_pos > self.data.as_ref().len() as u64 {
            return false;
        }
        self.cursor = new_pos as usize;
        true
    }

    fn size(&mut self) -> Option<u64> {
        Some(self.data.as_ref().len() as u64)
    }
}

/// A `Reader` that walks a [`Chain`] one chunk at a time. Each chunk is a
/// cheap refcount bump (`Bytes::clone`), never a copy.
pub struct ChainReader<'a> {
    chain: Dependency<'a, Chain>,
    chunk_index: usize,
    current: Bytes,
    cursor: usize,
    consumed_before: u64,
    health: Health,
}

impl<'a> ChainReader<'a> {
    pub fn new(chain: Chain) -> Self {
        Self::from_dependency(Dependency::Owned(chain))
    }

    pub fn new_borrowed(chain: &'a mut Chain) -> Self {
        Self::from_dependency(Dependency::Borrowed(chain))
    }

    fn from_dependency(chain: Dependency<'a, Chain>) -> Self {
        Self { chain, chunk_index: 0, current: Bytes::new(), cursor: 0, consumed_before: 0, health: Health::new() }
    }

    fn total_size(&self) -> u64 {
        self.chain.get().size()
    }
}

impl<'a> Reader for ChainReader<'a> {
    fn buffer(&self) -> &[u8] {
        &self.current[self.cursor..]
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.current.len() - self.cursor);
        self.cursor += n;
    }

    fn position(&self) -> u64 {
        self.consumed_before + self.cursor as u64
    }

    fn limit_position(&self) -> u64 {
        self.consumed_before + self.current.len() as u64
    }

    fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    fn status(&self) -> Option<&Error> {
        self.health.status()
    }

    fn pull_slow(&mut self) -> bool {
        debug_assert!(self.buffer().is_empty());
        self.consumed_before += self.current.len() as u64;
        loop {
            let chunk = self.chain.get().chunks().nth(self.chunk_index).cloned();
            match chunk {
                None => return false,
                Some(bytes) => {
                    self.chunk_index += 1;
                    if bytes.is_empty() {
                        continue;
                    }
                    self.current = bytes;
                    self.cursor = 0;
                    return true;
                }
            }
        }
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn seek_slow(&mut self, new_pos: u64) -> bool {
        if new_pos > self.total_size() {
            return false;
        }
        self.chunk_index = 0;
        self.current = Bytes::new();
        self.cursor = 0;
        self.consumed_before = 0;
        let mut remaining = new_pos;
        for chunk in self.chain.get().chunks().cloned().collect::<Vec<_>>() {
            self.chunk_index += 1;
            if (chunk.len() as u64) <= remaining {
                self.consumed_before += chunk.len() as u64;
                remaining -= chunk.len() as u64;
            } else {
                self.current = chunk;
                self.cursor = remaining as usize;
                return true;
            }
        }
        true
    }

    fn size(&mut self) -> Option<u64> {
        Some(self.total_size())
    }
}

struct VecSink(Vec<u8>);

impl RawWrite for VecSink {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// A `Writer` that accumulates into an owned `Vec<u8>`.
pub struct VecWriter {
    inner: BufferedWriter<VecSink>,
}

impl VecWriter {
    pub fn new() -> Self {
        Self { inner: BufferedWriter::new(VecSink(Vec::new())) }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: BufferedWriter::new(VecSink(Vec::with_capacity(capacity))) }
    }

    /// Like [`VecWriter::new`], but with an explicit staging-buffer size
    /// instead of [`crate::buffered::DEFAULT_BUFFER_SIZE`]. Useful for
    /// forcing callers upstream (e.g. a compressor) to push in small
    /// increments.
    pub fn with_buffer_size(buf_size: usize) -> Self {
        Self { inner: BufferedWriter::with_buffer_size(VecSink(Vec::new()), buf_size) }
    }

    /// Flushes any staged bytes and returns the accumulated output.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.inner.flush_staged();
        self.inner.into_sink().0
    }
}

impl Default for VecWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::writer::Writer for VecWriter {
    fn buffer_mut(&mut self) -> &mut [u8] {
        self.inner.buffer_mut()
    }
    fn available(&self) -> usize {
        self.inner.available()
    }
    fn consume(&mut self, n: usize) {
        self.inner.consume(n)
    }
    fn position(&self) -> u64 {
        self.inner.position()
    }
    fn limit_position(&self) -> u64 {
        self.inner.limit_position()
    }
    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
    fn status(&self) -> Option<&Error> {
        self.inner.status()
    }
    fn push_slow(&mut self) -> bool {
        crate::writer::Writer::push_slow(&mut self.inner)
    }
    fn write_slow(&mut self, src: &[u8]) -> bool {
        crate::writer::Writer::write_slow(&mut self.inner, src)
    }
    fn flush(&mut self, kind: crate::writer::FlushKind) -> bool {
        crate::writer::Writer::flush(&mut self.inner, kind)
    }
    fn close(&mut self) -> bool {
        crate::writer::Writer::close(&mut self.inner)
    }
}

struct ChainSink(Chain);

impl RawWrite for ChainSink {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.0.append_slice(buf);
        Ok(buf.len())
    }
}

/// A `Writer` that appends into an owned [`Chain`].
pub struct ChainWriter {
    inner: BufferedWriter<ChainSink>,
}

impl ChainWriter {
    pub fn new() -> Self {
        Self { inner: BufferedWriter::new(ChainSink(Chain::new())) }
    }

    pub fn into_chain(mut self) -> Chain {
        self.inner.flush_staged();
        self.inner.into_sink().0
    }
}

impl Default for ChainWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::writer::Writer for ChainWriter {
    fn buffer_mut(&mut self) -> &mut [u8] {
        self.inner.buffer_mut()
    }
    fn available(&self) -> usize {
        self.inner.available()
    }
    fn consume(&mut self, n: usize) {
        self.inner.consume(n)
    }
    fn position(&self) -> u64 {
        self.inner.position()
    }
    fn limit_position(&self) -> u64 {
        self.inner.limit_position()
    }
    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
    fn status(&self) -> Option<&Error> {
        self.inner.status()
    }
    fn push_slow(&mut self) -> bool {
        crate::writer::Writer::push_slow(&mut self.inner)
    }
    fn write_slow(&mut self, src: &[u8]) -> bool {
        crate::writer::Writer::write_slow(&mut self.inner, src)
    }
    fn flush(&mut self, kind: crate::writer::FlushKind) -> bool {
        crate::writer::Writer::flush(&mut self.inner, kind)
    }
    fn close(&mut self) -> bool {
        crate::writer::Writer::close(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderExt;
    use crate::writer::WriterExt;

    #[test]
    fn slice_reader_seeks_freely() {
        let mut r = SliceReader::new(b"abcdef");
        assert!(ReaderExt::seek(&mut r, 4));
        let mut buf = [0u8; 2];
        assert!(ReaderExt::read(&mut r, &mut buf));
        assert_eq!(&buf, b"ef");
        assert!(ReaderExt::seek(&mut r, 0));
        assert_eq!(ReaderExt::pos(&r), 0);
    }

    #[test]
    fn string_reader_owns_its_buffer() {
        let mut r = StringReader::new(String::from("hi there"));
        let mut buf = [0u8; 2];
        assert!(ReaderExt::read(&mut r, &mut buf));
        assert_eq!(&buf, b"hi");
    }

    #[test]
    fn chain_reader_walks_chunks() {
        let mut chain = Chain::new();
        chain.append_slice(b"ab");
        chain.append_slice(b"cd");
        chain.append_slice(b"ef");
        let mut r = ChainReader::new(chain);
        let mut buf = [0u8; 6];
        assert!(ReaderExt::read(&mut r, &mut buf));
        assert_eq!(&buf, b"abcdef");
    }

    #[test]
    fn chain_reader_seeks_across_chunks() {
        let mut chain = Chain::new();
        chain.append_slice(b"ab");
        chain.append_slice(b"cd");
        let mut r = ChainReader::new(chain);
        assert!(ReaderExt::seek(&mut r, 3));
        let mut buf = [0u8; 1];
        assert!(ReaderExt::read(&mut r, &mut buf));
        assert_eq!(&buf, b"d");
    }

    #[test]
    fn vec_writer_accumulates() {
        let mut w = VecWriter::new();
        assert!(WriterExt::write(&mut w, b"hello"));
        assert!(Writer::close(&mut w));
        assert_eq!(w.into_vec(), b"hello");
    }

    #[test]
    fn chain_writer_accumulates() {
        let mut w = ChainWriter::new();
        assert!(WriterExt::write(&mut w, b"hello"));
        assert!(Writer::close(&mut w));
        assert_eq!(w.into_chain().to_vec(), b"hello");
    }
}
