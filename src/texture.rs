// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{error::BitmapError, format::PixelFormat};
use std::{
    cell::UnsafeCell,
    fmt,
    ptr::NonNull,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::debug;

/// CPU view of a locked display texture.
#[derive(Clone, Copy, Debug)]
pub struct TextureMapping {
    /// First byte of the first row
    pub data: NonNull<u8>,
    /// Byte distance between the start of consecutive rows
    pub stride: usize,
    /// Number of bytes valid from `data`
    pub len: usize,
}

/// Display texture backing a bitmap.
///
/// A display texture is an externally owned, possibly GPU-resident image
/// resource that can be mapped into CPU memory with [`lock`](Self::lock) and
/// released with [`unlock`](Self::unlock). Textures are shared as
/// `Arc<dyn DisplayTexture>` between every bitmap and lock that refers to them
/// and are destroyed when the last holder drops its reference.
///
/// # Safety
///
/// Implementors must guarantee that a successful `lock` returns a mapping
/// valid for reads and writes of `len` bytes from `data` until the matching
/// `unlock` call. They must also reject, or otherwise serialize, a second
/// `lock` while a mapping is outstanding.
pub unsafe trait DisplayTexture: Send + Sync {
    fn lock(&self) -> Result<TextureMapping, BitmapError>;

    /// Releases the mapping returned by the last successful `lock`.
    fn unlock(&self);
}

/// Capability to retrieve the display texture behind an image.
///
/// Renderers use this to bypass the lock protocol and hand the texture to the
/// GPU directly. Buffer-backed images return `None`.
pub trait DisplayTextureSource {
    fn display_texture(&self) -> Option<Arc<dyn DisplayTexture>>;
}

/// Display texture resident in CPU memory.
///
/// Used as the software fallback where no DMA heap is available, and to model
/// GPU row pitch: with a row alignment larger than one byte the texture stride
/// is padded past the packed row size.
pub struct MemoryTexture {
    pixels: UnsafeCell<Box<[u8]>>,
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
    locked: AtomicBool,
}

// Pixel access only happens through a mapping, and `locked` admits at most one.
unsafe impl Sync for MemoryTexture {}

impl MemoryTexture {
    /// Allocates a zeroed texture with tightly packed rows.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, BitmapError> {
        Self::with_row_alignment(width, height, format, 1)
    }

    /// Allocates a zeroed texture whose stride is rounded up to `alignment`
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is not in the property table or the
    /// alignment is zero.
    pub fn with_row_alignment(
        width: u32,
        height: u32,
        format: PixelFormat,
        alignment: usize,
    ) -> Result<Self, BitmapError> {
        if alignment == 0 {
            return Err(BitmapError::InvalidArgument(
                "row alignment must be non-zero".to_owned(),
            ));
        }
        let packed = format
            .bytes_per_row(width)
            .ok_or(BitmapError::UnknownFormat(format))?;
        let stride = packed.div_ceil(alignment) * alignment;
        let pixels = vec![0u8; stride * height as usize].into_boxed_slice();
        debug!("memory texture {}x{} stride {} alloc'd", width, height, stride);
        Ok(Self {
            pixels: UnsafeCell::new(pixels),
            width,
            height,
            format,
            stride,
            locked: AtomicBool::new(false),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

unsafe impl DisplayTexture for MemoryTexture {
    fn lock(&self) -> Result<TextureMapping, BitmapError> {
        if self.locked.swap(true, Ordering::AcqRel) {
            return Err(BitmapError::AlreadyLocked);
        }
        // SAFETY: the flag above grants this caller the only mapping.
        let pixels = unsafe { &mut *self.pixels.get() };
        match NonNull::new(pixels.as_mut_ptr()) {
            Some(data) => Ok(TextureMapping {
                data,
                stride: self.stride,
                len: pixels.len(),
            }),
            None => {
                self.locked.store(false, Ordering::Release);
                Err(BitmapError::Unexpected("texture storage is null"))
            }
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl fmt::Debug for MemoryTexture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("stride", &self.stride)
            .field("locked", &self.is_locked())
            .finish()
    }
}
