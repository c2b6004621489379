//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | per-format [`Codec`] adapters (`image`, `avif-parse` + `rav1d`) |
//! | **Resize** | cover-fit math + `image::imageops::resize` (Lanczos3) |
//! | **Transform** | decode → resize → encode, see [`transform`] |
//!
//! The module is split into:
//! - **Buffer / Format**: [`ImageBuffer`] and the closed [`ImageFormat`] set
//! - **Codecs**: one adapter per format behind the [`Codec`] trait
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod avif;
pub mod backend;
mod buffer;
mod calculations;
pub mod codec;
mod format;
pub mod operations;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use buffer::ImageBuffer;
pub use calculations::{MAX_OUTPUT_PIXELS, cover_dimensions, needs_resize, within_pixel_budget};
pub use codec::{Codec, CodecError};
pub use format::{ImageFormat, SUPPORTED_TOKENS};
pub use operations::{TransformError, TransformSpec, resize, transcode, transform};
pub use rust_backend::RustBackend;
