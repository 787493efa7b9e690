// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ZstdWriter`: a streaming Zstandard-compressing [`Writer`] built on
//! `stratum_core`'s buffered-writer mixin. Uncompressed bytes are staged
//! the same way any other `BufferedWriter` stages them; once a staging
//! chunk fills up (or the caller asks for a flush), it is handed to the
//! codec and the resulting compressed bytes are pushed to the downstream
//! writer.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use stratum_core::buffered::{BufferedWriter, RawWrite};
use stratum_core::{Dependency, Error, FlushKind, Writer, WriterExt};

/// Configuration for a [`ZstdWriter`].
#[derive(Debug, Clone)]
pub struct ZstdWriterOptions {
    /// Passed to the codec as its compression level; valid range and
    /// meaning are the codec's own (1 is fastest, 19+ is closer to
    /// maximal, depending on the build's configured bounds).
    pub compression_level: i32,
    /// Overrides the codec's window size, log2 of the window in bytes.
    /// `None` leaves the codec's default for the chosen level.
    pub window_log: Option<i32>,
    /// A hint for the total uncompressed size, used to pick a tighter
    /// frame header and dictionary window when known in advance.
    pub size_hint: Option<u64>,
    /// Size, in bytes, of the staging buffer accumulating uncompressed
    /// input before it is handed to the codec.
    pub buffer_size: usize,
}

impl Default for ZstdWriterOptions {
    fn default() -> Self {
        Self { compression_level: 3, window_log: None, size_hint: None, buffer_size: 64 * 1024 }
    }
}

struct ZstdSink<'a, W: Writer> {
    downstream: Dependency<'a, W>,
    cstream: Option<zstd_safe::CCtx<'static>>,
    options: ZstdWriterOptions,
    total_in: u64,
}

impl<'a, W: Writer> ZstdSink<'a, W> {
    fn ensure_initialized(&mut self) -> Result<(), Error> {
        if self.cstream.is_some() {
            return Ok(());
        }
        let mut cstream = zstd_safe::CCtx::create();
        cstream
            .set_parameter(zstd_safe::CParameter::CompressionLevel(self.options.compression_level))
            .map_err(|code| codec_error("ZSTD_createCStream()", code))?;
        if let Some(window_log) = self.options.window_log {
            cstream
                .set_parameter(zstd_safe::CParameter::WindowLog(window_log))
                .map_err(|code| codec_error("ZSTD_initCStream_advanced()", code))?;
        }
        if let Some(size_hint) = self.options.size_hint {
            cstream
                .set_pledged_src_size(Some(size_hint))
                .map_err(|code| codec_error("ZSTD_initCStream_advanced()", code))?;
        }
        self.cstream = Some(cstream);
        Ok(())
    }

    fn push_downstream_space(&mut self) -> Result<(), Error> {
        if !WriterExt::push(self.downstream.get_mut()) {
            return Err(downstream_error(self.downstream.get_mut()));
        }
        Ok(())
    }
}

fn codec_error(call: &'static str, code: usize) -> Error {
    Error::Codec { call, detail: zstd_safe::get_error_name(code).to_string() }
}

fn downstream_error<W: Writer + ?Sized>(downstream: &mut W) -> Error {
    match downstream.status() {
        Some(_) => Error::Downstream(
            downstream.status().map(|e| e.to_string()).unwrap_or_else(|| "downstream writer failed".into()),
        ),
        None => Error::Downstream("downstream writer refused to make space".into()),
    }
}

impl<'a, W: Writer> RawWrite for ZstdSink<'a, W> {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        stratum_core::position::checked_add(self.total_in, buf.len() as u64)?;
        self.ensure_initialized()?;

        let mut input = zstd_safe::InBuffer::around(buf);
        while input.pos() < buf.len() {
            self.push_downstream_space()?;
            let produced;
            {
                let out_slice = self.downstream.get_mut().buffer_mut();
                let mut output = zstd_safe::OutBuffer::around(out_slice);
                let cstream = self.cstream.as_mut().expect("initialized above");
                cstream
                    .compress_stream(&mut output, &mut input)
                    .map_err(|code| codec_error("ZSTD_compressStream()", code))?;
                produced = output.pos();
            }
            self.downstream.get_mut().consume(produced);
        }
        self.total_in += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush_raw(&mut self, kind: FlushKind) -> Result<(), Error> {
        if let Some(cstream) = self.cstream.as_mut() {
            loop {
                if !WriterExt::push(self.downstream.get_mut()) {
                    return Err(downstream_error(self.downstream.get_mut()));
                }
                let remaining;
                {
                    let out_slice = self.downstream.get_mut().buffer_mut();
                    let mut output = zstd_safe::OutBuffer::around(out_slice);
                    remaining =
                        cstream.flush_stream(&mut output).map_err(|code| codec_error("ZSTD_flushStream()", code))?;
                    self.downstream.get_mut().consume(output.pos());
                }
                if remaining == 0 {
                    break;
                }
            }
        }
        if !self.downstream.get_mut().flush(kind) {
            return Err(downstream_error(self.downstream.get_mut()));
        }
        Ok(())
    }
}

impl<'a, W: Writer> ZstdSink<'a, W> {
    fn end(&mut self) -> Result<(), Error> {
        if let Some(cstream) = self.cstream.as_mut() {
            loop {
                if !WriterExt::push(self.downstream.get_mut()) {
                    return Err(downstream_error(self.downstream.get_mut()));
                }
                let remaining;
                {
                    let out_slice = self.downstream.get_mut().buffer_mut();
                    let mut output = zstd_safe::OutBuffer::around(out_slice);
                    remaining =
                        cstream.end_stream(&mut output).map_err(|code| codec_error("ZSTD_endStream()", code))?;
                    self.downstream.get_mut().consume(output.pos());
                }
                if remaining == 0 {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// A streaming Zstandard-compressing `Writer`.
///
/// Every byte written is staged, compressed, and pushed to `downstream` as
/// the stage fills; [`Writer::flush`] drains the codec's internal state
/// without ending the frame, and [`Writer::close`] ends it, after which no
/// more data can be written.
pub struct ZstdWriter<'a, W: Writer> {
    inner: BufferedWriter<ZstdSink<'a, W>>,
}

impl<'a, W: Writer> ZstdWriter<'a, W> {
    pub fn new(downstream: W, options: ZstdWriterOptions) -> Self {
        Self::from_sink(Dependency::Owned(downstream), options)
    }

    pub fn new_borrowed(downstream: &'a mut W, options: ZstdWriterOptions) -> Self {
        Self::from_sink(Dependency::Borrowed(downstream), options)
    }

    fn from_sink(downstream: Dependency<'a, W>, options: ZstdWriterOptions) -> Self {
        let buffer_size = options.buffer_size;
        let sink = ZstdSink { downstream, cstream: None, options, total_in: 0 };
        Self { inner: BufferedWriter::with_buffer_size(sink, buffer_size) }
    }
}

impl<'a, W: Writer> Writer for ZstdWriter<'a, W> {
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
        Writer::push_slow(&mut self.inner)
    }

    fn write_slow(&mut self, src: &[u8]) -> bool {
        Writer::write_slow(&mut self.inner, src)
    }

    fn flush(&mut self, kind: FlushKind) -> bool {
        // The generic mixin's `flush` already stages-then-calls
        // `RawWrite::flush_raw`, which is exactly the drain-without-ending
        // sequence this writer needs; only `FlushKind` is currently
        // ignored by the codec step itself.
        Writer::flush(&mut self.inner, kind)
    }

    fn close(&mut self) -> bool {
        if !self.is_healthy() {
            return false;
        }
        if !self.inner.flush_staged() {
            return false;
        }
        if let Err(e) = self.inner.sink_mut().end() {
            return self.inner.fail(e);
        }
        if self.inner.sink().downstream.is_owned() {
            if !Writer::close(self.inner.sink_mut().downstream.get_mut()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::VecWriter;

    #[test]
    fn small_payload_round_trips_through_real_zstd() {
        let downstream = VecWriter::new();
        let mut w = ZstdWriter::new(downstream, ZstdWriterOptions::default());
        assert!(WriterExt::write(&mut w, b"hello, hello, hello, compress me"));
        assert!(Writer::close(&mut w));

        // `ZstdWriter` doesn't expose its downstream after `close`, so this
        // crate's own round-trip coverage lives in `tests/roundtrip.rs`,
        // which decodes with the `zstd` crate directly.
    }

    #[test]
    fn empty_input_still_produces_a_valid_frame_on_close() {
        let downstream = VecWriter::new();
        let mut w = ZstdWriter::new(downstream, ZstdWriterOptions::default());
        assert!(Writer::close(&mut w));
    }
}
