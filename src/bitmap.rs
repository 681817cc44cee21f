// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::BitmapError,
    format::{Palette, PixelFormat, Rect},
    lock::{BitmapLock, Exclusive, LockFlags},
    texture::{DisplayTexture, DisplayTextureSource},
};
use core::fmt;
use std::{
    ptr::{self, NonNull},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, trace, warn};

/// Resolution reported by a freshly created bitmap, in dots per inch.
pub const DEFAULT_DPI: f64 = 96.0;

/// Read-only side of the bitmap protocol.
///
/// This is what imaging and text-layout consumers program against; it does not
/// expose locking, so any image that can produce its pixels on demand can
/// implement it.
pub trait BitmapSource {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    fn pixel_format(&self) -> PixelFormat;

    /// Horizontal and vertical resolution in dots per inch.
    fn resolution(&self) -> (f64, f64);

    /// Copies the pixels covered by `rect` into `buffer`.
    ///
    /// `stride` is the caller's intended destination stride. Pixels are
    /// copied with the source stride, so the destination must hold
    /// `height * source stride` bytes.
    fn copy_pixels(
        &self,
        rect: Option<&Rect>,
        stride: u32,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError>;

    fn copy_palette(&self, palette: &mut Palette) -> Result<(), BitmapError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ownership {
    Owned,
    Borrowed,
}

/// CPU pixel memory, either allocated by the bitmap or adopted from a caller.
struct PixelBuffer {
    data: NonNull<u8>,
    len: usize,
    bytes_per_row: usize,
    ownership: Ownership,
}

// The buffer is only reached through a bitmap lock, and a bitmap admits one
// lock at a time.
unsafe impl Send for PixelBuffer {}
unsafe impl Sync for PixelBuffer {}

impl PixelBuffer {
    fn allocate(len: usize, bytes_per_row: usize) -> Self {
        let pixels = Box::into_raw(vec![0u8; len].into_boxed_slice());
        // SAFETY: Box::into_raw never returns null.
        let data = unsafe { NonNull::new_unchecked(pixels.cast::<u8>()) };
        debug!("bitmap buffer of {} bytes alloc'd", len);
        Self {
            data,
            len,
            bytes_per_row,
            ownership: Ownership::Owned,
        }
    }

    fn borrowed(data: NonNull<u8>, len: usize, bytes_per_row: usize) -> Self {
        Self {
            data,
            len,
            bytes_per_row,
            ownership: Ownership::Borrowed,
        }
    }

    /// Frees the buffer if this bitmap allocated it. Safe to call repeatedly.
    fn release(&mut self) {
        if self.ownership == Ownership::Owned {
            // SAFETY: data and len came from Box::into_raw in allocate() and
            // the ownership flag guarantees this runs once.
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.data.as_ptr(),
                    self.len,
                )));
            }
            self.ownership = Ownership::Borrowed;
            debug!("bitmap buffer of {} bytes freed", self.len);
        }
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

enum Storage {
    Texture(Arc<dyn DisplayTexture>),
    Buffer(PixelBuffer),
}

/// Lockable bitmap over a display texture or a CPU buffer.
///
/// A `Bitmap` has fixed dimensions and pixel format and exactly one storage
/// mode for its whole life:
///
/// - **Texture-backed** bitmaps share an `Arc<dyn DisplayTexture>`; the stride
///   is whatever the texture reports when locked. Dropping the bitmap only
///   drops its reference to the texture.
/// - **Buffer-backed** bitmaps use CPU memory with a packed stride of
///   `bits_per_pixel / 8 * width`. The memory is either allocated and freed
///   by the bitmap or adopted from the caller and left alone on drop.
///
/// Pixels are reached through [`Bitmap::lock`], which only supports locking
/// the whole bitmap. One lock may be live at a time in either storage mode.
///
/// # Example
///
/// ```
/// use edgefirst_bitmap::{format, Bitmap, BitmapSource, LockFlags};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bitmap = Bitmap::new(4, 2, format::PBGRA);
/// {
///     let mut lock = bitmap.lock(None, LockFlags::WRITE)?;
///     lock.as_mut_slice().fill(0x80);
/// }
///
/// let mut pixels = vec![0u8; 32];
/// bitmap.copy_pixels(None, 16, &mut pixels)?;
/// assert!(pixels.iter().all(|&b| b == 0x80));
/// # Ok(())
/// # }
/// ```
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    dpi_x: AtomicU64,
    dpi_y: AtomicU64,
    storage: Storage,
    lock_slot: AtomicBool,
}

/// Packed stride and total size of a CPU buffer for the given geometry.
///
/// # Panics
///
/// Panics if `format` is missing from the property table.
fn buffer_layout(format: PixelFormat, width: u32, height: u32) -> (usize, usize) {
    let bytes_per_row = match format.bytes_per_row(width) {
        Some(bpr) => bpr,
        None => panic!("pixel format {} is missing from the property table", format),
    };
    (bytes_per_row, bytes_per_row * height as usize)
}

impl Bitmap {
    fn with_storage(storage: Storage, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            dpi_x: AtomicU64::new(DEFAULT_DPI.to_bits()),
            dpi_y: AtomicU64::new(DEFAULT_DPI.to_bits()),
            storage,
            lock_slot: AtomicBool::new(false),
        }
    }

    /// Creates a bitmap over a shared display texture.
    ///
    /// The texture should be at least `width` by `height` pixels of `format`;
    /// [`Bitmap::lock`] rejects a texture whose mapping is smaller.
    pub fn with_texture(
        texture: Arc<dyn DisplayTexture>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        Self::with_storage(Storage::Texture(texture), width, height, format)
    }

    /// Allocates a zeroed buffer-backed bitmap.
    ///
    /// # Panics
    ///
    /// Panics if `format` is missing from the property table.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let (bytes_per_row, len) = buffer_layout(format, width, height);
        let buffer = PixelBuffer::allocate(len, bytes_per_row);
        Self::with_storage(Storage::Buffer(buffer), width, height, format)
    }

    /// Creates a buffer-backed bitmap over caller-provided memory.
    ///
    /// A null `data` pointer makes the bitmap allocate and own its buffer,
    /// exactly as [`Bitmap::new`]. Otherwise the memory is adopted without
    /// taking ownership and is never freed by the bitmap.
    ///
    /// # Safety
    ///
    /// A non-null `data` must be valid for reads and writes of
    /// `bits_per_pixel / 8 * width * height` bytes for the whole life of the
    /// bitmap, and must not be accessed by anything else while a lock on the
    /// bitmap is live.
    ///
    /// # Panics
    ///
    /// Panics if `format` is missing from the property table.
    pub unsafe fn from_raw_parts(
        data: *mut u8,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        let (bytes_per_row, len) = buffer_layout(format, width, height);
        let buffer = match NonNull::new(data) {
            Some(data) => PixelBuffer::borrowed(data, len, bytes_per_row),
            None => PixelBuffer::allocate(len, bytes_per_row),
        };
        Self::with_storage(Storage::Buffer(buffer), width, height, format)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_resolution(&self, dpi_x: f64, dpi_y: f64) {
        self.dpi_x.store(dpi_x.to_bits(), Ordering::Relaxed);
        self.dpi_y.store(dpi_y.to_bits(), Ordering::Relaxed);
    }

    /// Packed stride of a buffer-backed bitmap; `None` for textures, whose
    /// stride is only known once locked.
    pub fn bytes_per_row(&self) -> Option<usize> {
        match &self.storage {
            Storage::Texture(_) => None,
            Storage::Buffer(buffer) => Some(buffer.bytes_per_row),
        }
    }

    pub fn is_texture_backed(&self) -> bool {
        matches!(self.storage, Storage::Texture(_))
    }

    /// Whether the bitmap allocated its buffer and will free it on drop.
    pub fn owns_buffer(&self) -> bool {
        match &self.storage {
            Storage::Texture(_) => false,
            Storage::Buffer(buffer) => buffer.ownership == Ownership::Owned,
        }
    }

    /// Whether a [`BitmapLock`] on this bitmap is currently live.
    pub fn is_locked(&self) -> bool {
        self.lock_slot.load(Ordering::Acquire)
    }

    /// Locks the bitmap's pixel memory.
    ///
    /// `region` defaults to the whole bitmap. A supplied region must cover
    /// exactly the whole bitmap. `flags` is accepted and ignored.
    ///
    /// # Errors
    ///
    /// - [`BitmapError::NotImplemented`] if `region` is offset from the
    ///   origin or smaller than the bitmap in either dimension.
    /// - [`BitmapError::InvalidArgument`] if `region` is larger than the
    ///   bitmap, a dimension exceeds `i32::MAX`, or the texture mapping does
    ///   not hold the whole bitmap.
    /// - [`BitmapError::AlreadyLocked`] if a lock on this bitmap, or on its
    ///   texture, is still live.
    /// - Any error reported by the texture's own lock.
    pub fn lock(
        &self,
        region: Option<&Rect>,
        flags: LockFlags,
    ) -> Result<BitmapLock<'_>, BitmapError> {
        let rect = self.lock_rect(region)?;
        let exclusive = Exclusive::acquire(&self.lock_slot)?;
        trace!("lock {:?} flags {:#x}", rect, flags.bits());

        match &self.storage {
            Storage::Texture(texture) => {
                BitmapLock::from_texture(texture.clone(), rect, self.format, exclusive)
            }
            Storage::Buffer(buffer) => Ok(BitmapLock::from_buffer(
                buffer.data,
                buffer.len,
                rect,
                buffer.bytes_per_row,
                self.format,
                exclusive,
            )),
        }
    }

    fn lock_rect(&self, region: Option<&Rect>) -> Result<Rect, BitmapError> {
        let full = Rect::full(self.width, self.height).ok_or_else(|| {
            BitmapError::InvalidArgument(format!(
                "bitmap {}x{} exceeds the lockable range",
                self.width, self.height
            ))
        })?;
        let region = match region {
            Some(region) => region,
            None => return Ok(full),
        };

        let width = i64::from(self.width);
        let height = i64::from(self.height);
        let region_width = i64::from(region.width);
        let region_height = i64::from(region.height);

        // TODO: support locking sub-regions, then drop the origin check.
        if region.x != 0 || region.y != 0 || region_height < height || region_width < width {
            return Err(BitmapError::NotImplemented(
                "locking a sub-region of a bitmap",
            ));
        }
        if region_width > width || region_height > height {
            return Err(BitmapError::InvalidArgument(format!(
                "lock region {}x{} exceeds bitmap {}x{}",
                region.width, region.height, self.width, self.height
            )));
        }

        Ok(*region)
    }

    pub fn set_palette(&self, _palette: &Palette) -> Result<(), BitmapError> {
        warn!("set_palette called on {}: palettes are not supported", self);
        Err(BitmapError::NotImplemented("bitmap palettes"))
    }
}

impl BitmapSource for Bitmap {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn resolution(&self) -> (f64, f64) {
        (
            f64::from_bits(self.dpi_x.load(Ordering::Relaxed)),
            f64::from_bits(self.dpi_y.load(Ordering::Relaxed)),
        )
    }

    fn copy_pixels(
        &self,
        rect: Option<&Rect>,
        stride: u32,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError> {
        let lock = self.lock(rect, LockFlags::READ)?;
        if stride as usize != lock.stride() {
            trace!(
                "copy_pixels stride {} ignored, source stride is {}",
                stride,
                lock.stride()
            );
        }

        let source = lock.as_slice();
        if source.len() > buffer.len() {
            return Err(BitmapError::InvalidArgument(format!(
                "destination holds {} bytes but {} are required",
                buffer.len(),
                source.len()
            )));
        }

        let destination = buffer
            .get_mut(..source.len())
            .ok_or(BitmapError::Unexpected("copy destination out of range"))?;
        destination.copy_from_slice(source);
        Ok(())
    }

    fn copy_palette(&self, _palette: &mut Palette) -> Result<(), BitmapError> {
        warn!("copy_palette called on {}: palettes are not supported", self);
        Err(BitmapError::NotImplemented("bitmap palettes"))
    }
}

impl DisplayTextureSource for Bitmap {
    fn display_texture(&self) -> Option<Arc<dyn DisplayTexture>> {
        match &self.storage {
            Storage::Texture(texture) => Some(texture.clone()),
            Storage::Buffer(_) => None,
        }
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.storage {
            Storage::Texture(_) => {
                write!(f, "{}x{} {} texture", self.width, self.height, self.format)
            }
            Storage::Buffer(buffer) => write!(
                f,
                "{}x{} {} buffer stride:{} owned:{}",
                self.width,
                self.height,
                self.format,
                buffer.bytes_per_row,
                buffer.ownership == Ownership::Owned
            ),
        }
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("resolution", &self.resolution())
            .field("texture", &self.is_texture_backed())
            .field("bytes_per_row", &self.bytes_per_row())
            .field("owns_buffer", &self.owns_buffer())
            .finish()
    }
}
