// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::BitmapError,
    format::{PixelFormat, Rect},
    texture::{DisplayTexture, TextureMapping},
};
use std::{
    ptr::NonNull,
    slice::{from_raw_parts, from_raw_parts_mut},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::debug;

/// Access intent passed to [`Bitmap::lock`](crate::Bitmap::lock).
///
/// Flags are accepted for protocol compatibility and have no effect: every
/// lock grants read and write access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockFlags(u32);

impl LockFlags {
    pub const NONE: LockFlags = LockFlags(0);
    pub const READ: LockFlags = LockFlags(0x1);
    pub const WRITE: LockFlags = LockFlags(0x2);

    pub const fn from_bits(bits: u32) -> Self {
        LockFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for LockFlags {
    type Output = LockFlags;

    fn bitor(self, rhs: LockFlags) -> LockFlags {
        LockFlags(self.0 | rhs.0)
    }
}

/// Claim on a bitmap's single lock slot, released on drop.
#[derive(Debug)]
pub(crate) struct Exclusive<'a>(&'a AtomicBool);

impl<'a> Exclusive<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, BitmapError> {
        if flag.swap(true, Ordering::Acquire) {
            return Err(BitmapError::AlreadyLocked);
        }
        Ok(Exclusive(flag))
    }
}

impl Drop for Exclusive<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Backing {
    Texture(Arc<dyn DisplayTexture>),
    Buffer,
}

/// An exclusive view over a bitmap's pixel memory.
///
/// A `BitmapLock` borrows the bitmap it was taken from and cannot outlive it.
/// Dropping the lock releases it; for texture-backed bitmaps this issues the
/// texture's unlock exactly once, whichever path the lock goes out of scope
/// on. Buffer-backed locks only narrow a pointer into the bitmap's buffer and
/// release nothing but the bitmap's lock slot.
///
/// The lock always covers the whole bitmap.
///
/// # Example
///
/// ```
/// use edgefirst_bitmap::{format, Bitmap, LockFlags};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bitmap = Bitmap::new(4, 2, format::BGRA);
/// let mut lock = bitmap.lock(None, LockFlags::WRITE)?;
///
/// assert_eq!(lock.stride(), 16);
/// assert_eq!(lock.data_size(), 32);
/// lock.as_mut_slice().fill(0xff);
/// # Ok(())
/// # }
/// ```
pub struct BitmapLock<'a> {
    format: PixelFormat,
    rect: Rect,
    data: NonNull<u8>,
    stride: usize,
    len: usize,
    backing: Backing,
    _exclusive: Exclusive<'a>,
}

impl<'a> BitmapLock<'a> {
    /// Locks `texture` and records the pointer and stride it reports.
    ///
    /// The mapping must hold `rect.height` rows of at least the packed row
    /// size; a texture smaller than the bitmap is unlocked again and
    /// rejected. If the texture refuses the lock, or is rejected, the
    /// bitmap's lock slot is released before the error is returned.
    pub(crate) fn from_texture(
        texture: Arc<dyn DisplayTexture>,
        rect: Rect,
        format: PixelFormat,
        exclusive: Exclusive<'a>,
    ) -> Result<Self, BitmapError> {
        let mapping = texture.lock()?;
        let len = match Self::texture_extent(&mapping, &rect, format) {
            Ok(len) => len,
            Err(e) => {
                texture.unlock();
                return Err(e);
            }
        };
        debug!("texture locked stride {}", mapping.stride);
        Ok(Self {
            format,
            rect,
            data: mapping.data,
            stride: mapping.stride,
            len,
            backing: Backing::Texture(texture),
            _exclusive: exclusive,
        })
    }

    /// Bytes the lock spans over `mapping`, checked against the mapping.
    fn texture_extent(
        mapping: &TextureMapping,
        rect: &Rect,
        format: PixelFormat,
    ) -> Result<usize, BitmapError> {
        let rows = usize::try_from(rect.height)
            .map_err(|_| BitmapError::InvalidArgument(format!("lock height {}", rect.height)))?;
        let width = u32::try_from(rect.width)
            .map_err(|_| BitmapError::InvalidArgument(format!("lock width {}", rect.width)))?;

        if let Some(packed) = format.bytes_per_row(width) {
            if rows > 0 && mapping.stride < packed {
                return Err(BitmapError::InvalidArgument(format!(
                    "texture stride {} is narrower than {} byte rows",
                    mapping.stride, packed
                )));
            }
        }

        match rows.checked_mul(mapping.stride) {
            Some(len) if len <= mapping.len => Ok(len),
            _ => Err(BitmapError::InvalidArgument(format!(
                "texture maps {} bytes, {} rows of stride {} do not fit",
                mapping.len, rows, mapping.stride
            ))),
        }
    }

    /// `len` is the full extent of the bitmap's buffer, which holds
    /// `rect.height` rows of `stride` bytes.
    pub(crate) fn from_buffer(
        data: NonNull<u8>,
        len: usize,
        rect: Rect,
        stride: usize,
        format: PixelFormat,
        exclusive: Exclusive<'a>,
    ) -> Self {
        Self {
            format,
            rect,
            data,
            stride,
            len,
            backing: Backing::Buffer,
            _exclusive: exclusive,
        }
    }

    /// Dimensions of the locked rectangle.
    pub fn size(&self) -> (u32, u32) {
        (self.rect.width as u32, self.rect.height as u32)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row of the locked memory.
    ///
    /// For texture-backed bitmaps this is the pitch reported by the texture,
    /// which may exceed the packed row size.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of bytes reachable through the lock: rows times stride.
    pub fn data_size(&self) -> usize {
        self.len
    }

    /// Size and raw address of the locked memory.
    pub fn data_pointer(&self) -> (usize, *mut u8) {
        (self.data_size(), self.data.as_ptr())
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the bitmap buffer or texture mapping covers data_size()
        // bytes while this lock lives, and the lock slot excludes writers.
        unsafe { from_raw_parts(self.data.as_ptr(), self.data_size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as for as_slice; &mut self makes this the only live view.
        unsafe { from_raw_parts_mut(self.data.as_ptr(), self.data_size()) }
    }
}

impl Drop for BitmapLock<'_> {
    fn drop(&mut self) {
        if let Backing::Texture(texture) = &self.backing {
            texture.unlock();
            debug!("texture unlocked");
        }
    }
}
