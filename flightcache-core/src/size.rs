//! Approximate byte-footprint estimation for cached values.
//!
//! Follows the same opt-in shape as the workspace's older `MemoryEstimator`: a trait
//! with a default body, overridden per concrete type with the cost rules the eviction
//! scorer actually wants (string length in UTF-16-ish code units, not `size_of`).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Maximum recursion depth for nested containers; anything deeper is costed as zero.
pub const MAX_DEPTH: usize = 10;

/// Number of elements beyond which a sequence is costed by sampling rather than
/// walking every element.
const SAMPLE_THRESHOLD: usize = 50;
const SAMPLE_SIZE: usize = 50;

thread_local! {
    static VISITED: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

/// Types that can estimate their own resident byte footprint.
///
/// The default implementation falls back to `std::mem::size_of_val`, which is a
/// reasonable stand-in for `Copy`-ish leaf types. Containers and the string/bool/
/// number leaf types below override [`ByteSize::byte_size_at`] with the spec's
/// explicit cost rules.
pub trait ByteSize {
    /// Estimate the byte footprint of `self`.
    fn byte_size(&self) -> usize {
        self.byte_size_at(0)
    }

    /// Depth-aware estimation used internally by recursive container impls.
    fn byte_size_at(&self, _depth: usize) -> usize {
        std::mem::size_of_val(self)
    }
}

macro_rules! impl_number {
    ($($t:ty),*) => {
        $(impl ByteSize for $t {
            fn byte_size_at(&self, _depth: usize) -> usize { 8 }
        })*
    };
}
impl_number!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl ByteSize for bool {
    fn byte_size_at(&self, _depth: usize) -> usize {
        4
    }
}

impl ByteSize for String {
    fn byte_size_at(&self, _depth: usize) -> usize {
        self.chars().count() * 2
    }
}

impl ByteSize for str {
    fn byte_size_at(&self, _depth: usize) -> usize {
        self.chars().count() * 2
    }
}

impl<T: ByteSize> ByteSize for Vec<T> {
    fn byte_size_at(&self, depth: usize) -> usize {
        estimate_sequence(self.iter(), self.len(), depth)
    }
}

impl<T: ByteSize> ByteSize for [T] {
    fn byte_size_at(&self, depth: usize) -> usize {
        estimate_sequence(self.iter(), self.len(), depth)
    }
}

impl<T: ByteSize> ByteSize for Option<T> {
    fn byte_size_at(&self, depth: usize) -> usize {
        if depth >= MAX_DEPTH {
            return 0;
        }
        match self {
            Some(v) => v.byte_size_at(depth + 1),
            None => 0,
        }
    }
}

impl<T: ByteSize, E: ByteSize> ByteSize for Result<T, E> {
    fn byte_size_at(&self, depth: usize) -> usize {
        if depth >= MAX_DEPTH {
            return 0;
        }
        match self {
            Ok(v) => v.byte_size_at(depth + 1),
            Err(e) => e.byte_size_at(depth + 1),
        }
    }
}

impl<K: ByteSize, V: ByteSize> ByteSize for HashMap<K, V> {
    fn byte_size_at(&self, depth: usize) -> usize {
        if depth >= MAX_DEPTH {
            return 0;
        }
        self.iter()
            .map(|(k, v)| k.byte_size_at(depth + 1) + v.byte_size_at(depth + 1))
            .sum()
    }
}

impl<K: ByteSize, V: ByteSize> ByteSize for BTreeMap<K, V> {
    fn byte_size_at(&self, depth: usize) -> usize {
        if depth >= MAX_DEPTH {
            return 0;
        }
        self.iter()
            .map(|(k, v)| k.byte_size_at(depth + 1) + v.byte_size_at(depth + 1))
            .sum()
    }
}

impl<T: ByteSize> ByteSize for Box<T> {
    fn byte_size_at(&self, depth: usize) -> usize {
        self.as_ref().byte_size_at(depth)
    }
}

impl<A: ByteSize, B: ByteSize> ByteSize for (A, B) {
    fn byte_size_at(&self, depth: usize) -> usize {
        if depth >= MAX_DEPTH {
            return 0;
        }
        self.0.byte_size_at(depth + 1) + self.1.byte_size_at(depth + 1)
    }
}

/// Cycle-safe estimation for reference-counted values: a pointer already on the
/// current call stack is costed as zero instead of being walked again.
impl<T: ByteSize> ByteSize for Arc<T> {
    fn byte_size_at(&self, depth: usize) -> usize {
        let ptr = Arc::as_ptr(self) as usize;
        let already_visiting = VISITED.with(|v| v.borrow().contains(&ptr));
        if already_visiting {
            return 0;
        }
        VISITED.with(|v| v.borrow_mut().push(ptr));
        let size = self.as_ref().byte_size_at(depth);
        VISITED.with(|v| {
            v.borrow_mut().pop();
        });
        size
    }
}

fn estimate_sequence<'a, T: ByteSize + 'a>(
    items: impl Iterator<Item = &'a T>,
    len: usize,
    depth: usize,
) -> usize {
    if depth >= MAX_DEPTH {
        return 0;
    }
    if len >= SAMPLE_THRESHOLD {
        let mut sampled_total = 0usize;
        let mut sampled_count = 0usize;
        for item in items.take(SAMPLE_SIZE) {
            sampled_total += item.byte_size_at(depth + 1);
            sampled_count += 1;
        }
        if sampled_count == 0 {
            return 0;
        }
        (sampled_total as f64 / sampled_count as f64 * len as f64).round() as usize
    } else {
        items.map(|item| item.byte_size_at(depth + 1)).sum()
    }
}
