// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `FdReader`/`FdWriter`: thin buffered adapters over `std::fs::File`,
//! gated behind the `fd` feature so the rest of the crate stays free of a
//! hard dependency on OS file handles.

use std::fs::File;
use std::io::{Read, Write};

use crate::buffered::{BufferedReader, BufferedWriter, RawRead, RawWrite};
use crate::dependency::Dependency;
use crate::error::Error;
use crate::reader::Reader;
use crate::writer::{FlushKind, Writer};

impl RawRead for File {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        Ok(Read::read(self, buf)?)
    }
}

impl RawWrite for File {
    fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        Ok(Write::write(self, buf)?)
    }

    fn flush_raw(&mut self, kind: FlushKind) -> Result<(), Error> {
        match kind {
            // Bytes are already handed to the OS once `write_raw` returns;
            // nothing further is owed at the object or process tier.
            FlushKind::FromObject | FlushKind::FromProcess => Ok(()),
            FlushKind::FromMachine => Ok(self.sync_data()?),
        }
    }
}

pub struct FdReader<'a> {
    inner: BufferedReader<Dependency<'a, File>>,
}

impl<'a> FdReader<'a> {
    pub fn new(file: File) -> Self {
        Self { inner: BufferedReader::new(Dependency::Owned(file)) }
    }

    pub fn new_borrowed(file: &'a mut File) -> Self {
        Self { inner: BufferedReader::new(Dependency::Borrowed(file)) }
    }
}

impl<'a> Reader for FdReader<'a> {
    fn buffer(&self) -> &[u8] {
        self.inner.buffer()
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
    fn pull_slow(&mut self) -> bool {
        Reader::pull_slow(&mut self.inner)
    }
}

pub struct FdWriter<'a> {
    inner: BufferedWriter<Dependency<'a, File>>,
}

impl<'a> FdWriter<'a> {
    pub fn new(file: File) -> Self {
        Self { inner: BufferedWriter::new(Dependency::Owned(file)) }
    }

    pub fn new_borrowed(file: &'a mut File) -> Self {
        Self { inner: BufferedWriter::new(Dependency::Borrowed(file)) }
    }
}

impl<'a> Writer for FdWriter<'a> {
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
        Writer::flush(&mut self.inner, kind)
    }
    fn close(&mut self) -> bool {
        if !Writer::close(&mut self.inner) {
            return false;
        }
        if self.inner.sink().is_owned() {
            // Nothing further to release: `File`'s `Drop` closes the
            // descriptor once the `Dependency` is dropped.
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderExt;
    use crate::writer::WriterExt;
    use std::io::Seek;

    fn temp_file() -> File {
        let mut path = std::env::temp_dir();
        path.push(format!("stratum-fd-test-{}-{:?}", std::process::id(), std::time::SystemTime::now()));
        File::options().read(true).write(true).create(true).truncate(true).open(path).unwrap()
    }

    #[test]
    fn round_trips_through_a_real_file() {
        let file = temp_file();
        let mut w = FdWriter::new(file);
        assert!(WriterExt::write(&mut w, b"hello file"));
        assert!(Writer::close(&mut w));

        let mut file = w.inner.into_sink().into_owned();
        file.rewind().unwrap();

        let mut r = FdReader::new(file);
        let mut buf = [0u8; 10];
        assert!(ReaderExt::read(&mut r, &mut buf));
        assert_eq!(&buf, b"hello file");
    }
}
