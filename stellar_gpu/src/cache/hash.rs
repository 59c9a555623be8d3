/// Order-sensitive 64-bit hash combining for structural cache keys

/// 2^64 / golden ratio
pub const GOLDEN_RATIO_64: u64 = 0x9e37_79b9_7f4a_7c15;

/// Mix `value` into `seed`
///
/// Swapping two combined values changes the result.
#[inline]
pub fn hash_combine(seed: &mut u64, value: u64) {
    *seed ^= value
        .wrapping_add(GOLDEN_RATIO_64)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}
