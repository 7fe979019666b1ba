//! Reference native image engine behind a C ABI.
//!
//! This crate plays the role of the native processing library that
//! `magick-interop` binds to. It exposes opaque handles, typed field
//! accessors, an exception tree and a tracking allocator through
//! `extern "C"` functions (see [`ffi`]), following the same ownership
//! conventions as the real engine:
//!
//! - `*_create` / `read_*` / `clone` / `remove` hand out OWNED handles that
//!   must be released with the matching `*_dispose`
//! - `get` style functions return BORROWED pointers that stay valid while
//!   their owner lives and must never be released
//! - strings and buffers returned as `*mut` were acquired for the caller and
//!   must be released with `magick_memory_relinquish`
//!
//! # Supported formats
//!
//! | Format | Read | Write |
//! |---|---|---|
//! | `XC` / `CANVAS` | `xc:<color>` with the settings extent | no |
//! | PNM (`P2`, `P3`, `P5`, `P6`) | yes, multi-frame | `P6` |
//! | PAM (`P7`) | yes, multi-frame | yes |
//! | JPEG | structure, dimensions and profiles only | no |
//!
//! JPEG entropy-coded data is not decoded, so JPEG images carry no pixel
//! cache.

pub mod color;
pub mod exception;
pub mod ffi;
pub mod geometry;
pub mod image;
pub mod memory;
pub mod quantum;
pub mod settings;

mod coders;

pub use quantum::{Quantum, QUANTUM_DEPTH, QUANTUM_IS_HDRI, QUANTUM_RANGE};
