//! Bulk copies of sample buffers across the native boundary.
//!
//! NULL means "no data" and is reported as `None`; a non-null pointer with a
//! zero length is an empty array. Samples are copied bit for bit, never
//! rescaled between widths.

use std::slice;

use crate::native::{NativeApi, NativeBuffer};
use crate::quantum::QuantumSample;

/// Copy `len` samples out of native memory.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `len` samples of `T`.
pub unsafe fn to_array<T: QuantumSample>(ptr: *const T, len: usize) -> Option<Vec<T>> {
    if ptr.is_null() {
        return None;
    }
    if len == 0 {
        return Some(Vec::new());
    }
    Some(unsafe { slice::from_raw_parts(ptr, len) }.to_vec())
}

/// Copy `len` bytes out of native memory (profiles, encoded blobs).
///
/// # Safety
/// Same contract as [`to_array`].
pub unsafe fn to_byte_array(ptr: *const u8, len: usize) -> Option<Vec<u8>> {
    unsafe { to_array(ptr, len) }
}

/// Native byte view of samples, for passing a buffer in without widening.
pub fn to_native_bytes<T: QuantumSample>(values: &[T]) -> &[u8] {
    bytemuck::cast_slice(values)
}

/// Copy an acquired native buffer and release it.
///
/// # Safety
/// A non-null `ptr` must have been acquired by the native library for the
/// caller and hold `len` samples of `T`. Ownership passes to this function.
pub unsafe fn owned_to_array<T: QuantumSample>(
    api: &'static NativeApi,
    ptr: *mut T,
    len: usize,
) -> Option<Vec<T>> {
    let buffer = unsafe { NativeBuffer::from_raw(api, ptr, len) }?;
    Some(buffer.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn copies_bit_for_bit<T: QuantumSample>(values: &[T]) {
        for len in 0..=values.len() {
            let copied = unsafe { to_array(values.as_ptr(), len) }.unwrap();
            assert_eq!(copied.len(), len);
            assert_eq!(to_native_bytes(&copied), to_native_bytes(&values[..len]));
        }
    }

    #[test]
    fn test_every_width_copies_exactly() {
        copies_bit_for_bit(&[0u8, 1, 128, 255]);
        copies_bit_for_bit(&[0u16, 1, 0x8000, 0xFFFF]);
        copies_bit_for_bit(&[0.0f32, -0.0, 1.5, f32::MAX, 65535.0]);
    }

    #[test]
    fn test_nan_payload_survives() {
        let nan = f32::from_bits(0x7FC0_1234);
        let copied = unsafe { to_array(&nan as *const f32, 1) }.unwrap();
        assert_eq!(copied[0].to_bits(), 0x7FC0_1234);
    }

    #[test]
    fn test_null_is_no_data_for_any_length() {
        for len in [0, 1, 1024] {
            assert!(unsafe { to_array::<u16>(ptr::null(), len) }.is_none());
            assert!(unsafe { to_byte_array(ptr::null(), len) }.is_none());
        }
    }

    #[test]
    fn test_zero_length_is_empty_not_none() {
        let value = 7u8;
        assert_eq!(unsafe { to_byte_array(&value, 0) }, Some(Vec::new()));
    }

    #[test]
    fn test_native_bytes_do_not_widen() {
        assert_eq!(to_native_bytes(&[1u16, 2]).len(), 4);
        assert_eq!(to_native_bytes(&[1u8, 2]).len(), 2);
        assert_eq!(to_native_bytes(&[1.0f32]).len(), 4);
    }
}
