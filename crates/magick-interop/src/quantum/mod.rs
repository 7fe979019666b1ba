//! Channel sample types.
//!
//! The process quantum is chosen at build time by the `q8`, `q16` and
//! `q16-hdri` features (the widest enabled one wins) and must match the
//! native library, which is checked when the library is loaded. The
//! [`QuantumSample`] trait covers all three widths so generic code such as
//! the array converter can be exercised for each of them in any build.

pub mod converter;

pub use converter::{owned_to_array, to_array, to_byte_array, to_native_bytes};

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for f32 {}
}

/// A fixed-width channel sample that can be copied bit for bit from
/// native memory.
pub trait QuantumSample:
    bytemuck::Pod + PartialEq + std::fmt::Debug + Send + Sync + sealed::Sealed
{
    /// Depth the native library reports for this sample type.
    const BITS: u32;
    const IS_HDRI: bool;
    /// Fully saturated value.
    const MAX: f64;

    /// Convert from `0.0..=MAX`. Integer samples round and clamp.
    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;
}

impl QuantumSample for u8 {
    const BITS: u32 = 8;
    const IS_HDRI: bool = false;
    const MAX: f64 = 255.0;

    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, <Self as QuantumSample>::MAX) as u8
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl QuantumSample for u16 {
    const BITS: u32 = 16;
    const IS_HDRI: bool = false;
    const MAX: f64 = 65535.0;

    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, <Self as QuantumSample>::MAX) as u16
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl QuantumSample for f32 {
    const BITS: u32 = 16;
    const IS_HDRI: bool = true;
    const MAX: f64 = 65535.0;

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

#[cfg(feature = "q16-hdri")]
pub type Quantum = f32;
#[cfg(all(feature = "q16", not(feature = "q16-hdri")))]
pub type Quantum = u16;
#[cfg(not(any(feature = "q16", feature = "q16-hdri")))]
pub type Quantum = u8;

pub const QUANTUM_DEPTH: u32 = <Quantum as QuantumSample>::BITS;
pub const QUANTUM_IS_HDRI: bool = <Quantum as QuantumSample>::IS_HDRI;
pub const QUANTUM_MAX: f64 = <Quantum as QuantumSample>::MAX;

/// Scale an 8-bit value into the process quantum.
pub fn from_u8(value: u8) -> Quantum {
    Quantum::from_f64(f64::from(value) * QUANTUM_MAX / 255.0)
}

/// Scale a process quantum down to 8 bits, rounding and clamping.
pub fn to_u8(value: Quantum) -> u8 {
    (value.to_f64() * 255.0 / QUANTUM_MAX)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_scaling_round_trips() {
        for value in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(to_u8(from_u8(value)), value);
        }
        assert_eq!(from_u8(255), Quantum::from_f64(QUANTUM_MAX));
    }

    #[test]
    fn test_integer_samples_clamp() {
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u16::from_f64(-4.0), 0);
        assert_eq!(f32::from_f64(70000.0), 70000.0);
    }

    #[test]
    fn test_build_quantum_matches_features() {
        if cfg!(feature = "q16-hdri") {
            assert!(QUANTUM_IS_HDRI);
        } else if cfg!(feature = "q16") {
            assert_eq!(QUANTUM_DEPTH, 16);
        } else {
            assert_eq!(QUANTUM_DEPTH, 8);
        }
    }
}
