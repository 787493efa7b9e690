// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cursor-buffered `Reader`/`Writer`/`BackwardWriter` abstractions for
//! byte-stream I/O.
//!
//! The central idea is a direct buffer window: every concrete stream
//! exposes the bytes it currently has on hand (`[cursor, limit)`) so a
//! caller can read or write them without going through a virtual call,
//! only falling back to an overridable slow path when that window runs
//! dry. [`Reader`] and [`Writer`] carry that protocol for forward
//! streams; [`BackwardWriter`] carries the mirrored protocol for sinks
//! that are filled by prepending, such as [`ChainBackwardWriter`].
//!
//! Composable adapters ([`LimitingReader`], [`ChainBackwardWriter`]) are
//! generic over a source or destination and parameterize ownership of it
//! through [`Dependency`]. The in-memory adapters in [`mem`] and the
//! `fd`-gated [`fd`] module round out the concrete stream zoo; the
//! [`buffered`] module is the generic heap-buffer mixin several of them
//! are built on.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backward_writer;
pub mod buffered;
pub mod chain;
pub mod chain_backward_writer;
pub mod dependency;
pub mod error;
#[cfg(feature = "fd")]
pub mod fd;
pub mod limiting_reader;
pub mod mem;
pub mod position;
pub mod reader;
pub mod writer;

pub use backward_writer::{BackwardWriter, BackwardWriterExt};
pub use chain::Chain;
pub use chain_backward_writer::ChainBackwardWriter;
pub use dependency::Dependency;
pub use error::{Error, Health};
#[cfg(feature = "fd")]
pub use fd::{FdReader, FdWriter};
pub use limiting_reader::LimitingReader;
pub use mem::{ChainReader, ChainWriter, SliceReader, StringReader, VecWriter};
pub use reader::{copy_to_backward, Reader, ReaderExt};
pub use writer::{FlushKind, Writer, WriterExt};

pub type Result<T> = std::result::Result<T, Error>;
