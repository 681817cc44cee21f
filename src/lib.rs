// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Bitmap Library
//!
//! This library exposes pixel storage through a lockable bitmap protocol
//! consumed by rendering, imaging and text-layout pipelines. A single
//! [`Bitmap`] type unifies two physically different storage backends:
//!
//! - **Display textures**: shared, possibly GPU-resident images with their
//!   own lock/unlock primitives, such as a [`dma::DmaTexture`] allocated from
//!   the DMA heap or a CPU-resident [`MemoryTexture`].
//! - **CPU buffers**: memory allocated and owned by the bitmap, or adopted
//!   from the caller without taking ownership.
//!
//! Pixels are reached through a [`BitmapLock`], an exclusive, scoped view
//! that releases its backing resource when dropped. Locks always cover the
//! whole bitmap; palettes, codecs and color conversion are out of scope.
//!
//! ## Example
//!
//! ```
//! use edgefirst_bitmap::{format, Bitmap, BitmapSource, LockFlags, MemoryTexture};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Texture with a GPU-style 64 byte row pitch
//! let texture = Arc::new(MemoryTexture::with_row_alignment(10, 4, format::PBGRA, 64)?);
//! let bitmap = Bitmap::with_texture(texture, 10, 4, format::PBGRA);
//!
//! let lock = bitmap.lock(None, LockFlags::READ)?;
//! assert_eq!(lock.stride(), 64);
//! assert_eq!(lock.data_size(), 256);
//! drop(lock);
//!
//! let mut pixels = vec![0u8; 256];
//! bitmap.copy_pixels(None, 64, &mut pixels)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## C ABI
//!
//! The [`capi`] module exports the same protocol to C callers with
//! HRESULT-style status codes.
//!
//! ## Safety
//!
//! Raw pixel memory, DMA mappings and the C ABI require `unsafe` code. All
//! unsafe operations are isolated to the storage, lock, texture and `capi`
//! modules and wrapped with safe APIs.

pub mod bitmap;
pub mod capi;
#[cfg(target_os = "linux")]
pub mod dma;
pub mod error;
pub mod format;
pub mod lock;
pub mod texture;

pub use bitmap::{Bitmap, BitmapSource, DEFAULT_DPI};
pub use error::{BitmapError, Status};
pub use format::{Palette, PixelFormat, PixelFormatProperties, Rect};
pub use lock::{BitmapLock, LockFlags};
pub use texture::{DisplayTexture, DisplayTextureSource, MemoryTexture, TextureMapping};
