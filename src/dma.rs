// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::BitmapError,
    format::PixelFormat,
    texture::{DisplayTexture, TextureMapping},
};
use core::fmt;
use dma_buf::DmaBuf;
use dma_heap::{Heap, HeapKind};
use libc::{ioctl, mmap, munmap, MAP_FAILED, MAP_SHARED, PROT_READ, PROT_WRITE};
use std::{
    io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
    ptr::{null_mut, NonNull},
    sync::Mutex,
};
use tracing::{debug, warn};

const DMA_BUF_SYNC_READ: u64 = 1 << 0;
const DMA_BUF_SYNC_WRITE: u64 = 1 << 1;
const DMA_BUF_SYNC_RW: u64 = DMA_BUF_SYNC_READ | DMA_BUF_SYNC_WRITE;
const DMA_BUF_SYNC_START: u64 = 0;
const DMA_BUF_SYNC_END: u64 = 1 << 2;

// _IOW('b', 0, struct dma_buf_sync)
const DMA_BUF_IOCTL_SYNC: u64 = 0x4008_6200;

#[repr(C)]
struct DmaBufSync {
    flags: u64,
}

struct Mapping {
    data: NonNull<u8>,
    len: usize,
}

// The mapping is process-wide memory; the pointer is only stored here.
unsafe impl Send for Mapping {}

/// Display texture allocated from the CMA DMA heap.
///
/// The texture lives in physically contiguous DMA memory which GPUs, display
/// controllers and the 2D engine can consume directly through its DMA-BUF
/// file descriptor. Locking maps the buffer into the process and brackets
/// CPU access with DMA-BUF cache synchronization; unlocking unmaps it.
///
/// # Example
///
/// ```no_run
/// use edgefirst_bitmap::{dma::DmaTexture, format, Bitmap, LockFlags};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let texture = Arc::new(DmaTexture::new(1920, 1080, format::PBGRA)?);
/// let bitmap = Bitmap::with_texture(texture.clone(), 1920, 1080, format::PBGRA);
///
/// let lock = bitmap.lock(None, LockFlags::READ)?;
/// assert_eq!(lock.stride(), 1920 * 4);
/// # Ok(())
/// # }
/// ```
pub struct DmaTexture {
    fd: OwnedFd,
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
    mapping: Mutex<Option<Mapping>>,
}

impl DmaTexture {
    /// Allocates a new DMA texture.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pixel format is not in the property table
    /// - The dimensions describe an empty buffer
    /// - The DMA heap device is not accessible or allocation fails
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, BitmapError> {
        let stride = Self::packed_stride(width, height, format)?;
        let heap = Heap::new(HeapKind::Cma).map_err(|e| io::Error::other(e.to_string()))?;
        let fd = heap
            .allocate(stride * height as usize)
            .map_err(|e| io::Error::other(e.to_string()))?;
        debug!("DMA texture {}x{} alloc'd fd:{}", width, height, fd.as_raw_fd());
        Ok(Self::with_fd(fd, width, height, format, stride))
    }

    /// Adopts an existing DMA-BUF, for example one exported by a camera or
    /// a GPU, with tightly packed rows.
    pub fn from_fd(
        fd: OwnedFd,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, BitmapError> {
        let stride = Self::packed_stride(width, height, format)?;
        Ok(Self::with_fd(fd, width, height, format, stride))
    }

    fn packed_stride(width: u32, height: u32, format: PixelFormat) -> Result<usize, BitmapError> {
        let stride = format
            .bytes_per_row(width)
            .ok_or(BitmapError::UnknownFormat(format))?;
        if stride == 0 || height == 0 {
            return Err(BitmapError::InvalidArgument(format!(
                "cannot map an empty {}x{} texture",
                width, height
            )));
        }
        Ok(stride)
    }

    fn with_fd(fd: OwnedFd, width: u32, height: u32, format: PixelFormat, stride: usize) -> Self {
        Self {
            fd,
            width,
            height,
            format,
            stride,
            mapping: Mutex::new(None),
        }
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub fn raw_fd(&self) -> i32 {
        self.fd.as_raw_fd()
    }

    /// Exports a new DMA-BUF handle sharing this texture's memory.
    pub fn dmabuf(&self) -> io::Result<DmaBuf> {
        Ok(DmaBuf::from(self.fd.try_clone()?))
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

    pub fn size(&self) -> usize {
        self.stride * self.height as usize
    }

    fn sync(&self, flags: u64) -> io::Result<()> {
        let sync = DmaBufSync { flags };
        let ret = unsafe {
            ioctl(
                self.fd.as_raw_fd(),
                DMA_BUF_IOCTL_SYNC as _,
                &sync as *const DmaBufSync,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

unsafe impl DisplayTexture for DmaTexture {
    fn lock(&self) -> Result<TextureMapping, BitmapError> {
        let mut mapping = self
            .mapping
            .lock()
            .map_err(|_| BitmapError::Unexpected("DMA texture mapping state poisoned"))?;
        if mapping.is_some() {
            return Err(BitmapError::AlreadyLocked);
        }

        let len = self.size();
        let ptr = unsafe {
            mmap(
                null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                self.fd.as_raw_fd(),
                0,
            )
        };
        if ptr == MAP_FAILED {
            return Err(io::Error::last_os_error().into());
        }
        let data = NonNull::new(ptr.cast::<u8>())
            .ok_or(BitmapError::Unexpected("mmap returned null"))?;

        // Heaps without cache maintenance reject the ioctl; the mapping is
        // still coherent in that case.
        if let Err(e) = self.sync(DMA_BUF_SYNC_START | DMA_BUF_SYNC_RW) {
            debug!("DMA-BUF sync start skipped: {}", e);
        }

        *mapping = Some(Mapping { data, len });
        debug!("DMA texture fd:{} mapped {} bytes", self.raw_fd(), len);
        Ok(TextureMapping {
            data,
            stride: self.stride,
            len,
        })
    }

    fn unlock(&self) {
        let mut mapping = match self.mapping.lock() {
            Ok(mapping) => mapping,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(Mapping { data, len }) = mapping.take() else {
            warn!("unlock of DMA texture fd:{} without a mapping", self.raw_fd());
            return;
        };

        if let Err(e) = self.sync(DMA_BUF_SYNC_END | DMA_BUF_SYNC_RW) {
            debug!("DMA-BUF sync end skipped: {}", e);
        }
        if unsafe { munmap(data.as_ptr().cast(), len) } != 0 {
            warn!("unmap failed: {}", io::Error::last_os_error());
        }
        debug!("DMA texture fd:{} unmapped", self.raw_fd());
    }
}

impl Drop for DmaTexture {
    fn drop(&mut self) {
        let mapped = match self.mapping.get_mut() {
            Ok(mapping) => mapping.is_some(),
            Err(poisoned) => poisoned.get_ref().is_some(),
        };
        if mapped {
            self.unlock();
        }
        debug!("DMA texture fd:{} freed", self.fd.as_raw_fd());
    }
}

impl fmt::Display for DmaTexture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} {} stride:{} fd:{:?}",
            self.width, self.height, self.format, self.stride, self.fd
        )
    }
}
