/*!
 * Core Types
 * Common types used across the simulator
 */

/// Index of a resource kind in the resource table
pub type ResourceIndex = usize;

/// Per-resource instance counts (one entry per resource kind)
pub type ResourceVec = Vec<u32>;

/// Simulated nanoseconds
pub type Nanos = u64;

/// Element-wise `a <= b`
#[inline]
pub fn vec_le(a: &[u32], b: &[u32]) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y)
}

/// Element-wise `acc += v`
#[inline]
pub fn vec_add_assign(acc: &mut [u32], v: &[u32]) {
    for (a, x) in acc.iter_mut().zip(v) {
        *a += x;
    }
}
