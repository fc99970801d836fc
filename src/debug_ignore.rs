// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::ops::{Deref, DerefMut};

/// A newtype wrapper that causes this field to be ignored while being
/// debugged.
///
/// Used by [`crate::state::State`] to keep its graph backreference and
/// dead-end callback out of derived `Debug` output.
#[derive(Clone, Copy)]
pub(crate) struct DebugIgnore<T>(pub(crate) T);

impl<T> Deref for DebugIgnore<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for DebugIgnore<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> fmt::Debug for DebugIgnore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...")
    }
}
