//! Screen dimensions (in points) for known device models.

/// Size used for unknown models: the classic 4.7" iPhone.
pub const DEFAULT_SCREEN_SIZE: (u32, u32) = (375, 667);

/// Looks up the point dimensions for a `ProductType` identifier such as
/// `iPhone16,2`, falling back to [`DEFAULT_SCREEN_SIZE`].
pub fn screen_size_for(product_type: &str) -> (u32, u32) {
    match product_type {
        // iPhone 15 Pro, iPhone 15
        "iPhone16,2" | "iPhone16,1" => (393, 852),
        // iPhone 14 Plus, 13 Pro Max, 12 Pro Max
        "iPhone15,5" | "iPhone14,3" | "iPhone13,4" => (428, 926),
        // iPhone 14, 13 Pro, 12 Pro
        "iPhone15,4" | "iPhone14,2" | "iPhone13,3" => (390, 844),
        // iPad Air (5th gen), iPad Pro 12.9"
        "iPad14,6" | "iPad13,11" => (1024, 1366),
        _ => DEFAULT_SCREEN_SIZE,
    }
}
