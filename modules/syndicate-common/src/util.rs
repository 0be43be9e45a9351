/// Clamp a count to the remote integer column's width. Remote tabular fields
/// are 32-bit; overflow is clamped, never rejected.
pub fn clamp_to_i32(value: i64) -> i32 {
    if value > i32::MAX as i64 {
        i32::MAX
    } else if value < i32::MIN as i64 {
        i32::MIN
    } else {
        value as i32
    }
}

/// Clamp an optional count, preserving absence.
pub fn clamp_opt(value: Option<i64>) -> Option<i32> {
    value.map(clamp_to_i32)
}
