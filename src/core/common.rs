//! Type definition of Float, otherwise constants and functions which
//! can be used almost everywhere else in the code.

pub type Float = f32;

pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Conservative bound on the relative error accumulated by *n*
/// floating-point operations.
pub fn gamma(n: i32) -> Float {
    (n as Float * MACHINE_EPSILON) / (1.0 - n as Float * MACHINE_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_grows_with_n() {
        assert!(gamma(3) > 0.0);
        assert!(gamma(5) > gamma(3));
    }
}
