use std::collections::BTreeSet;

/// Decide whether a rung of the resolution ladder is worth encoding.
///
/// Downscales and exact matches are always attempted. Upscales only happen for
/// heights the operator explicitly enabled.
pub fn should_encode(source_height: u32, target_height: u32, enabled: &BTreeSet<u32>) -> bool {
    if source_height >= target_height {
        return true;
    }
    enabled.contains(&target_height)
}
