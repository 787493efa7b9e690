// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use crate::reader::ReaderExt;
use crate::writer::WriterExt;

/// A `RawRead` source that doles out bytes from a `Vec<u8>` a few at a
/// time, so tests exercise more than one `pull_slow` call.
struct ChunkyRead {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl RawRead for ChunkyRead {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = (self.data.len() - self.pos).min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct FailingRead;

impl RawRead for FailingRead {
    fn read_raw(&mut self, _buf: &mut [u8]) -> Result<usize, Error> {
        Err(Error::Downstream("disk on fire".into()))
    }
}

struct VecSink(Vec<u8>);

impl RawWrite for VecSink {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }
}

struct FailingWrite;

impl RawWrite for FailingWrite {
    fn write_raw(&mut self, _buf: &[u8]) -> Result<usize, Error> {
        Err(Error::Downstream("disk full".into()))
    }
}

#[test]
fn reader_pulls_across_chunk_boundaries() {
    let source = ChunkyRead { data: b"hello world".to_vec(), pos: 0, chunk: 4 };
    let mut r = BufferedReader::with_buffer_size(source, 3);
    let mut out = [0u8; 11];
    assert!(ReaderExt::read(&mut r, &mut out));
    assert_eq!(&out, b"hello world");
    assert_eq!(ReaderExt::pos(&r), 11);
}

#[test]
fn reader_clean_eof_stays_healthy() {
    let source = ChunkyRead { data: b"ab".to_vec(), pos: 0, chunk: 8 };
    let mut r = BufferedReader::with_buffer_size(source, 8);
    let mut out = [0u8; 2];
    assert!(ReaderExt::read(&mut r, &mut out));
    assert!(r.is_healthy());
    let mut more = [0u8; 1];
    assert!(!ReaderExt::read(&mut r, &mut more));
    assert!(r.is_healthy());
}

#[test]
fn reader_latches_unhealthy_on_raw_error() {
    let mut r = BufferedReader::with_buffer_size(FailingRead, 8);
    let mut out = [0u8; 1];
    assert!(!ReaderExt::read(&mut r, &mut out));
    assert!(!r.is_healthy());
    assert!(r.status().is_some());
}

#[test]
fn writer_buffers_then_flushes_to_sink() {
    let mut w = BufferedWriter::with_buffer_size(VecSink(Vec::new()), 4);
    assert!(WriterExt::write(&mut w, b"ab"));
    assert!(w.sink().0.is_empty());
    assert!(WriterExt::write(&mut w, b"cd"));
    assert!(WriterExt::push(&mut w));
    assert_eq!(w.sink().0, b"abcd");
}

#[test]
fn writer_large_write_bypasses_buffer() {
    let mut w = BufferedWriter::with_buffer_size(VecSink(Vec::new()), 4);
    assert!(WriterExt::write(&mut w, b"0123456789"));
    assert!(Writer::close(&mut w));
    assert_eq!(w.sink().0, b"0123456789");
}

#[test]
fn writer_latches_unhealthy_on_raw_error() {
    let mut w = BufferedWriter::with_buffer_size(FailingWrite, 4);
    assert!(!WriterExt::write(&mut w, b"abcdefgh"));
    assert!(!w.is_healthy());
}
