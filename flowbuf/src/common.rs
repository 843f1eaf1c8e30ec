// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Common internal helpers for flowbuf.

/// Fraction of the capacity limit a blocked producer waits to drain down to.
pub(crate) const LOW_WATERMARK: f64 = 0.3;

/// Fraction of the capacity limit a blocked consumer waits to fill up to.
pub(crate) const HIGH_WATERMARK: f64 = 0.7;

#[inline]
#[cold]
fn cold() {}

#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if !b {
        cold();
    }
    b
}

#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold();
    }
    b
}

/// Occupancy threshold for `limit` at `fraction`, truncated toward zero.
#[inline]
pub(crate) fn watermark(limit: usize, fraction: f64) -> usize {
    (limit as f64 * fraction) as usize
}

/// Next slot index on a ring of `slots` entries.
#[inline(always)]
pub(crate) fn wrap_next(index: usize, slots: usize) -> usize {
    let next = index + 1;
    if next == slots {
        0
    } else {
        next
    }
}
