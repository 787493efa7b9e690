// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The error type shared by every reader and writer in this crate, and the
//! small health-tracking helper that implements the latch-on-first-failure
//! policy they all follow.

use std::fmt;

/// The reason a stream stopped being healthy.
#[derive(Debug)]
pub enum Error {
    /// A wrapped reader or writer reported failure; its message is carried
    /// through unchanged.
    Downstream(String),
    /// A position arithmetic step would have exceeded `u64::MAX`.
    Overflow,
    /// A streaming-compression codec call failed.
    Codec { call: &'static str, detail: String },
    /// An I/O error surfaced by a `std::fs`-backed adapter.
    #[cfg(feature = "fd")]
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Downstream(msg) => f.write_str(msg),
            Error::Overflow => f.write_str("stream position overflow"),
            Error::Codec { call, detail } => write!(f, "{call} failed: {detail}"),
            #[cfg(feature = "fd")]
            Error::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "fd")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Tracks the health flag and failure message of a stream.
///
/// `Ok` (the default) means healthy. Once failed, a `Health` stays failed;
/// nothing in this crate clears one.
#[derive(Debug, Default)]
pub struct Health(Option<Error>);

impl Health {
    pub fn new() -> Self {
        Health(None)
    }

    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.0.is_none()
    }

    pub fn status(&self) -> Option<&Error> {
        self.0.as_ref()
    }

    /// Latches `err` as the reason this stream is now unhealthy and returns
    /// `false`, so call sites can write `return self.health.fail(err)`.
    pub fn fail(&mut self, err: Error) -> bool {
        log::warn!("stream became unhealthy: {err}");
        self.0 = Some(err);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy() {
        let health = Health::new();
        assert!(health.is_healthy());
        assert!(health.status().is_none());
    }

    #[test]
    fn fail_latches() {
        let mut health = Health::new();
        assert!(!health.fail(Error::Overflow));
        assert!(!health.is_healthy());
        assert!(matches!(health.status(), Some(Error::Overflow)));
        // A second failure is recorded too, but the stream was already dead.
        assert!(!health.fail(Error::Downstream("boom".into())));
        assert!(!health.is_healthy());
    }

    #[test]
    fn display_messages() {
        assert_eq!(Error::Overflow.to_string(), "stream position overflow");
        assert_eq!(
            Error::Codec { call: "ZSTD_compressStream()", detail: "bad state".into() }.to_string(),
            "ZSTD_compressStream() failed: bad state"
        );
    }
}
