//! Build-time channel sample type.
//!
//! Exactly one quantum exists per build. The features are additive in Cargo,
//! so when several are enabled the widest one wins: `q16-hdri` over `q16`
//! over `q8`.

#[cfg(feature = "q16-hdri")]
pub type Quantum = f32;
#[cfg(all(feature = "q16", not(feature = "q16-hdri")))]
pub type Quantum = u16;
#[cfg(not(any(feature = "q16", feature = "q16-hdri")))]
pub type Quantum = u8;

#[cfg(any(feature = "q16", feature = "q16-hdri"))]
pub const QUANTUM_DEPTH: u32 = 16;
#[cfg(not(any(feature = "q16", feature = "q16-hdri")))]
pub const QUANTUM_DEPTH: u32 = 8;

pub const QUANTUM_IS_HDRI: bool = cfg!(feature = "q16-hdri");

/// Largest channel value (fully saturated).
pub const QUANTUM_RANGE: f64 = ((1u32 << QUANTUM_DEPTH) - 1) as f64;

/// Convert a value in `0.0..=QUANTUM_RANGE` to a quantum.
///
/// Integer quanta round and clamp; HDRI keeps the value as is.
#[inline]
pub fn from_f64(value: f64) -> Quantum {
    #[cfg(feature = "q16-hdri")]
    {
        value as f32
    }
    #[cfg(not(feature = "q16-hdri"))]
    {
        value.round().clamp(0.0, QUANTUM_RANGE) as Quantum
    }
}

#[inline]
pub fn to_f64(value: Quantum) -> f64 {
    f64::from(value)
}

/// Scale a sample with the given maximum into the quantum range.
#[inline]
pub fn scale_from(sample: u32, max: u32) -> Quantum {
    if max == 0 {
        return from_f64(0.0);
    }
    from_f64(f64::from(sample) * QUANTUM_RANGE / f64::from(max))
}

/// Scale a quantum into `0..=max`, rounding and clamping.
#[inline]
pub fn scale_to(value: Quantum, max: u32) -> u32 {
    let scaled = to_f64(value) * f64::from(max) / QUANTUM_RANGE;
    scaled.round().clamp(0.0, f64::from(max)) as u32
}

/// Fully opaque alpha.
#[inline]
pub fn opaque() -> Quantum {
    from_f64(QUANTUM_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_roundtrip_8bit() {
        for v in [0u32, 1, 127, 128, 254, 255] {
            assert_eq!(scale_to(scale_from(v, 255), 255), v);
        }
    }

    #[test]
    fn test_scale_extremes() {
        assert_eq!(to_f64(scale_from(255, 255)), QUANTUM_RANGE);
        assert_eq!(to_f64(scale_from(0, 255)), 0.0);
        assert_eq!(to_f64(opaque()), QUANTUM_RANGE);
    }

    #[test]
    fn test_zero_max_is_black() {
        assert_eq!(to_f64(scale_from(10, 0)), 0.0);
    }

    #[test]
    fn test_depth_matches_range() {
        assert_eq!(QUANTUM_RANGE, f64::from((1u32 << QUANTUM_DEPTH) - 1));
    }
}
