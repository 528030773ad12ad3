// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Stack growth for deeply recursive user programs.

/// Run `f`, growing the native stack first if less than the red zone
/// remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
