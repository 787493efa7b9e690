// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A generic growable-heap-buffer mixin: wraps anything that can fill or
//! drain a raw byte slice and exposes it through the `Reader`/`Writer`
//! buffer-window protocol. Concrete adapters that have nothing smarter to
//! do than "read some raw bytes" or "write some raw bytes" (`FdReader`,
//! `FdWriter`, `VecWriter`, `ChainWriter`) are thin wrappers over these.

use crate::dependency::Dependency;
use crate::error::Error;
use crate::position::ForwardCursor;
use crate::reader::Reader;
use crate::writer::{FlushKind, Writer};

/// The default buffer size used when a buffered adapter isn't constructed
/// with an explicit size.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// A source of raw bytes, one `read` call at a time.
pub trait RawRead {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
}

/// A sink for raw bytes, one `write` call at a time.
pub trait RawWrite {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error>;

    /// Drains any raw-level buffering at the requested tier. Implementors
    /// that have no notion of tiers (most in-memory sinks) can ignore
    /// `kind`; implementors that wrap a real OS resource must honor it,
    /// since a weaker tier must not pay for a stronger one's durability.
    fn flush_raw(&mut self, kind: FlushKind) -> Result<(), Error> {
        let _ = kind;
        Ok(())
    }
}

impl<'a, D: RawRead> RawRead for Dependency<'a, D> {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.get_mut().read_raw(buf)
    }
}

impl<'a, D: RawWrite> RawWrite for Dependency<'a, D> {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.get_mut().write_raw(buf)
    }

    fn flush_raw(&mut self, kind: FlushKind) -> Result<(), Error> {
        self.get_mut().flush_raw(kind)
    }
}

pub struct BufferedReader<S> {
    source: S,
    buf: Vec<u8>,
    cursor: ForwardCursor,
    buf_size: usize,
    health: crate::error::Health,
}

impl<S: RawRead> BufferedReader<S> {
    pub fn new(source: S) -> Self {
        Self::with_buffer_size(source, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(source: S, buf_size: usize) -> Self {
        let buf_size = buf_size.max(1);
        Self {
            source,
            buf: vec![0u8; buf_size],
            cursor: ForwardCursor::default(),
            buf_size,
            health: crate::error::Health::new(),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: RawRead> Reader for BufferedReader<S> {
    fn buffer(&self) -> &[u8] {
        &self.buf[self.cursor.cursor..self.cursor.limit]
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

    fn pull_slow(&mut self) -> bool {
        debug_assert!(self.buffer().is_empty());
        if !self.is_healthy() {
            return false;
        }
        let committed_pos = self.cursor.pos();
        log::trace!("refilling buffered reader at position {committed_pos}");
        match self.source.read_raw(&mut self.buf[..self.buf_size]) {
            Ok(0) => false,
            Ok(n) => {
                self.cursor.make_buffer(committed_pos, 0, 0, n);
                true
            }
            Err(e) => self.health.fail(e),
        }
    }
}

pub struct BufferedWriter<S> {
    sink: S,
    buf: Vec<u8>,
    cursor: ForwardCursor,
    buf_size: usize,
    health: crate::error::Health,
}

impl<S: RawWrite> BufferedWriter<S> {
    pub fn new(sink: S) -> Self {
        Self::with_buffer_size(sink, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(sink: S, buf_size: usize) -> Self {
        let buf_size = buf_size.max(1);
        Self {
            sink,
            buf: vec![0u8; buf_size],
            cursor: ForwardCursor { start_pos: 0, start: 0, cursor: 0, limit: buf_size },
            buf_size,
            health: crate::error::Health::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(mut self) -> S {
        self.flush_staged();
        self.sink
    }

    /// Latches `err` as the reason this writer is now unhealthy. Exposed so
    /// adapters built on top of `BufferedWriter` (like a streaming
    /// compressor) can report their own failures through the same health
    /// state.
    pub fn fail(&mut self, err: Error) -> bool {
        self.health.fail(err)
    }

    /// Pushes any staged bytes to the sink, without asking the sink itself
    /// to flush. Used by adapters that must guarantee all buffered input
    /// has reached the sink before driving their own flush/close sequence.
    pub fn flush_staged(&mut self) -> bool {
        if !self.is_healthy() {
            return false;
        }
        self.do_flush()
    }

    fn do_flush(&mut self) -> bool {
        let written = self.cursor.cursor;
        if written > 0 {
            match self.sink.write_raw(&self.buf[..written]) {
                Ok(n) if n == written => {}
                Ok(n) => {
                    return self
                        .health
                        .fail(Error::Downstream(format!("short raw write: {n} of {written} bytes")));
                }
                Err(e) => return self.health.fail(e),
            }
        }
        self.cursor.start_pos += written as u64;
        self.cursor.make_buffer(self.cursor.start_pos, 0, 0, self.buf_size);
        true
    }
}

impl<S: RawWrite> Writer for BufferedWriter<S> {
    fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.cursor.cursor..self.cursor.limit]
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
        self.do_flush()
    }

    fn write_slow(&mut self, src: &[u8]) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if !self.do_flush() {
            return false;
        }
        let mut written = 0;
        while written < src.len() {
            match self.sink.write_raw(&src[written..]) {
                Ok(0) => {
                    return self.health.fail(Error::Downstream("raw sink accepted 0 bytes".into()));
                }
                Ok(n) => written += n,
                Err(e) => return self.health.fail(e),
            }
        }
        self.cursor.start_pos += src.len() as u64;
        self.cursor.make_buffer(self.cursor.start_pos, 0, 0, self.buf_size);
        true
    }

    fn flush(&mut self, kind: FlushKind) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if !self.do_flush() {
            return false;
        }
        match self.sink.flush_raw(kind) {
            Ok(()) => true,
            Err(e) => self.health.fail(e),
        }
    }

    fn close(&mut self) -> bool {
        if !self.is_healthy() {
            return false;
        }
        self.do_flush()
    }
}

#[cfg(test)]
mod tests;
