// Stratum
// Copyright (c) 2021-2024 The Stratum Authors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ownership parameterization for the resource an adapter wraps.
//!
//! Every composing adapter in this crate (`LimitingReader`,
//! `ChainBackwardWriter`, `ZstdWriter`, ...) is generic over whether it
//! owns its downstream resource outright or only borrows it for the
//! adapter's lifetime. `close()` only propagates to an owned dependency;
//! a borrowed one is left for its original owner to finish.

/// Either an owned value or a borrow of one held elsewhere.
pub enum Dependency<'a, D> {
    Borrowed(&'a mut D),
    Owned(D),
}

impl<'a, D> Dependency<'a, D> {
    #[inline]
    pub fn get(&self) -> &D {
        match self {
            Dependency::Borrowed(r) => r,
            Dependency::Owned(d) => d,
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut D {
        match self {
            Dependency::Borrowed(r) => r,
            Dependency::Owned(d) => d,
        }
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Dependency::Owned(_))
    }

    /// Unwraps an owned dependency. Panics if this dependency is borrowed;
    /// adapters only call this after checking `is_owned()`.
    pub fn into_owned(self) -> D {
        match self {
            Dependency::Owned(d) => d,
            Dependency::Borrowed(_) => panic!("into_owned called on a borrowed Dependency"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_roundtrips() {
        let dep: Dependency<'_, Vec<u8>> = Dependency::Owned(vec![1, 2, 3]);
        assert!(dep.is_owned());
        assert_eq!(dep.get(), &[1, 2, 3]);
        assert_eq!(dep.into_owned(), vec![1, 2, 3]);
    }

    #[test]
    fn borrowed_is_not_owned() {
        let mut v = vec![1, 2, 3];
        let mut dep: Dependency<'_, Vec<u8>> = Dependency::Borrowed(&mut v);
        assert!(!dep.is_owned());
        dep.get_mut().push(4);
        assert_eq!(v, vec![1, 2, 3, 4]);
    }
}
