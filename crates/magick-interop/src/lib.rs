//! # Magick Interop
//!
//! Safe binding layer over the magick native engine:
//! - **native**: owned and borrowed handles, the symbol table, library
//!   loading and native memory release
//! - **quantum**: build-time channel sample type and buffer copies
//! - **exception**: translation of native exception trees, warning delivery
//! - **color**, **geometry**, **settings**: value types backed by short-lived
//!   native handles
//! - **image**, **pixels**, **collection**, **profile**: image wrappers
//! - **config**, **logging**, **error**: ambient setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use magick_interop::{MagickImage, ReadSettings};
//!
//! magick_interop::logging::init();
//! let image = MagickImage::read_file("photo.jpg", &ReadSettings::new())?;
//! for warning in image.take_warnings() {
//!     eprintln!("{warning}");
//! }
//! ```
//!
//! The native engine is loaded on first use with the default
//! [`InteropConfig`]; call [`MagickNative::initialize`] first to choose a
//! library path or warning policy.

pub mod cancellation;
pub mod collection;
pub mod color;
pub mod config;
pub mod error;
pub mod exception;
pub mod geometry;
pub mod image;
pub mod logging;
pub mod native;
pub mod pixels;
pub mod profile;
pub mod quantum;
pub mod settings;

pub use cancellation::{CancellationToken, Stop, StopReason, Unstoppable};
pub use collection::{MagickFrame, MagickImageCollection};
pub use color::MagickColor;
pub use config::{InteropConfig, WarningPolicy};
pub use error::{Error, Result};
pub use exception::{ExceptionKind, MagickException, Severity};
pub use geometry::{GeometryFlag, MagickGeometry};
pub use image::MagickImage;
pub use native::MagickNative;
pub use pixels::PixelCollection;
pub use profile::{EightBimProfile, ImageProfile, IptcProfile, IptcTag};
pub use quantum::{Quantum, QUANTUM_DEPTH, QUANTUM_IS_HDRI};
pub use settings::ReadSettings;
