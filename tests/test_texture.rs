// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_bitmap::{
    format, Bitmap, BitmapError, BitmapSource, DisplayTexture, DisplayTextureSource, LockFlags,
    MemoryTexture, PixelFormat, Rect, TextureMapping,
};
use std::{
    error::Error,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// Memory texture that counts lock and unlock calls.
struct CountingTexture {
    inner: MemoryTexture,
    locks: AtomicUsize,
    unlocks: AtomicUsize,
}

impl CountingTexture {
    fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            inner: MemoryTexture::new(width, height, format).unwrap(),
            locks: AtomicUsize::new(0),
            unlocks: AtomicUsize::new(0),
        }
    }

    fn locks(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }
}

unsafe impl DisplayTexture for CountingTexture {
    fn lock(&self) -> Result<TextureMapping, BitmapError> {
        let mapping = self.inner.lock()?;
        self.locks.fetch_add(1, Ordering::SeqCst);
        Ok(mapping)
    }

    fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        self.inner.unlock();
    }
}

/// Texture whose lock always fails.
struct BrokenTexture {
    unlocks: AtomicUsize,
}

unsafe impl DisplayTexture for BrokenTexture {
    fn lock(&self) -> Result<TextureMapping, BitmapError> {
        Err(BitmapError::Unexpected("device lost"))
    }

    fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_texture_stride() -> Result<(), Box<dyn Error>> {
    let texture = Arc::new(MemoryTexture::with_row_alignment(10, 3, format::PBGRA, 64)?);
    assert_eq!(texture.stride(), 64);

    let bitmap = Bitmap::with_texture(texture.clone(), 10, 3, format::PBGRA);
    assert!(bitmap.is_texture_backed());
    assert_eq!(bitmap.bytes_per_row(), None);

    let lock = bitmap.lock(None, LockFlags::NONE)?;
    assert_eq!(lock.stride(), 64);
    assert_eq!(lock.data_size(), 192);
    assert_eq!(lock.size(), (10, 3));
    assert!(texture.is_locked());
    drop(lock);
    assert!(!texture.is_locked());

    Ok(())
}

#[test]
fn test_unlock_on_drop() -> Result<(), Box<dyn Error>> {
    let texture = Arc::new(CountingTexture::new(4, 4, format::BGRA));
    let bitmap = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);

    let lock = bitmap.lock(None, LockFlags::READ)?;
    assert_eq!(texture.locks(), 1);
    assert_eq!(texture.unlocks(), 0);
    drop(lock);
    assert_eq!(texture.unlocks(), 1);

    let mut pixels = vec![0u8; 64];
    bitmap.copy_pixels(None, 16, &mut pixels)?;
    assert_eq!(texture.locks(), 2);
    assert_eq!(texture.unlocks(), 2);

    Ok(())
}

#[test]
fn test_unlock_on_error_path() {
    let texture = Arc::new(CountingTexture::new(4, 4, format::BGRA));
    let bitmap = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);

    let read_header = |bitmap: &Bitmap| -> Result<u8, BitmapError> {
        let lock = bitmap.lock(None, LockFlags::READ)?;
        if lock.as_slice()[0] == 0 {
            return Err(BitmapError::InvalidArgument("blank header".to_owned()));
        }
        Ok(lock.as_slice()[0])
    };
    assert!(read_header(&bitmap).is_err());
    assert_eq!(texture.locks(), 1);
    assert_eq!(texture.unlocks(), 1);

    // copy failure after the texture was locked
    let mut pixels = vec![0u8; 63];
    assert!(matches!(
        bitmap.copy_pixels(None, 16, &mut pixels),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert_eq!(texture.locks(), 2);
    assert_eq!(texture.unlocks(), 2);
    assert!(!bitmap.is_locked());
}

#[test]
fn test_unlock_on_panic() {
    let texture = Arc::new(CountingTexture::new(4, 4, format::BGRA));
    let bitmap = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _lock = bitmap.lock(None, LockFlags::WRITE).unwrap();
        panic!("consumer failed while holding the lock");
    }));
    assert!(result.is_err());
    assert_eq!(texture.unlocks(), 1);
    assert!(!bitmap.is_locked());
}

#[test]
fn test_failed_texture_lock() {
    let texture = Arc::new(BrokenTexture {
        unlocks: AtomicUsize::new(0),
    });
    let bitmap = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);

    assert!(matches!(
        bitmap.lock(None, LockFlags::NONE),
        Err(BitmapError::Unexpected(_))
    ));
    assert!(!bitmap.is_locked());
    assert_eq!(texture.unlocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_region_checked_before_texture_lock() {
    let texture = Arc::new(CountingTexture::new(4, 4, format::BGRA));
    let bitmap = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);

    assert!(bitmap
        .lock(Some(&Rect::new(0, 0, 5, 4)), LockFlags::NONE)
        .is_err());
    assert!(bitmap
        .lock(Some(&Rect::new(2, 2, 2, 2)), LockFlags::NONE)
        .is_err());
    assert_eq!(texture.locks(), 0);
    assert_eq!(texture.unlocks(), 0);
}

#[test]
fn test_shared_texture() -> Result<(), Box<dyn Error>> {
    let texture = Arc::new(MemoryTexture::new(4, 4, format::BGRA)?);
    let first = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);
    let second = Bitmap::with_texture(texture.clone(), 4, 4, format::BGRA);
    assert_eq!(Arc::strong_count(&texture), 3);

    // the texture serializes locks across bitmaps
    let lock = first.lock(None, LockFlags::WRITE)?;
    assert!(matches!(
        second.lock(None, LockFlags::READ),
        Err(BitmapError::AlreadyLocked)
    ));
    assert!(!second.is_locked());
    drop(lock);

    {
        let mut lock = first.lock(None, LockFlags::WRITE)?;
        lock.as_mut_slice().fill(0x42);
    }
    let mut pixels = vec![0u8; 64];
    second.copy_pixels(None, 16, &mut pixels)?;
    assert!(pixels.iter().all(|&b| b == 0x42));

    let exported = first.display_texture().unwrap();
    assert_eq!(Arc::strong_count(&texture), 4);

    drop(first);
    drop(second);
    assert_eq!(Arc::strong_count(&texture), 2);
    drop(exported);
    assert_eq!(Arc::strong_count(&texture), 1);

    Ok(())
}

#[test]
fn test_texture_round_trip() -> Result<(), Box<dyn Error>> {
    let texture = Arc::new(MemoryTexture::with_row_alignment(3, 4, format::RGB24, 16)?);
    let bitmap = Bitmap::with_texture(texture, 3, 4, format::RGB24);

    let pattern: Vec<u8> = (0..64).collect();
    {
        let mut lock = bitmap.lock(None, LockFlags::WRITE)?;
        assert_eq!(lock.stride(), 16);
        lock.as_mut_slice().copy_from_slice(&pattern);
    }

    let mut dest = vec![0u8; 64];
    bitmap.copy_pixels(None, 9, &mut dest)?;
    assert_eq!(dest, pattern);

    Ok(())
}

#[test]
fn test_memory_texture_errors() {
    assert!(matches!(
        MemoryTexture::with_row_alignment(4, 4, format::BGRA, 0),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert!(matches!(
        MemoryTexture::new(4, 4, format::INDEXED1),
        Err(BitmapError::UnknownFormat(f)) if f == format::INDEXED1
    ));
}

#[test]
fn test_texture_smaller_than_bitmap() {
    let texture = Arc::new(CountingTexture::new(1, 1, format::BGRA));
    let bitmap = Bitmap::with_texture(texture.clone(), 1, 4096, format::BGRA);

    assert!(matches!(
        bitmap.lock(None, LockFlags::READ),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert_eq!(texture.locks(), 1);
    assert_eq!(texture.unlocks(), 1);
    assert!(!texture.inner.is_locked());
    assert!(!bitmap.is_locked());

    let mut pixels = vec![0xaau8; 4 * 4096];
    assert!(matches!(
        bitmap.copy_pixels(None, 4, &mut pixels),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert!(pixels.iter().all(|&b| b == 0xaa));
    assert_eq!(texture.unlocks(), 2);
}

#[test]
fn test_texture_narrower_than_bitmap() {
    // 4 rows of 4 bytes hold 16 bytes, but a 2 pixel BGRA row needs 8
    let texture = Arc::new(MemoryTexture::new(1, 4, format::BGRA).unwrap());
    let bitmap = Bitmap::with_texture(texture.clone(), 2, 2, format::BGRA);

    assert!(matches!(
        bitmap.lock(None, LockFlags::READ),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert!(!texture.is_locked());
}

#[test]
fn test_texture_larger_than_bitmap() -> Result<(), Box<dyn Error>> {
    let texture = Arc::new(MemoryTexture::new(4, 4, format::BGRA)?);
    let bitmap = Bitmap::with_texture(texture, 2, 2, format::BGRA);

    let lock = bitmap.lock(None, LockFlags::READ)?;
    assert_eq!(lock.stride(), 16);
    assert_eq!(lock.data_size(), 32);
    assert_eq!(lock.as_slice().len(), 32);

    Ok(())
}

#[test]
fn test_dimensions_beyond_i32() {
    let texture = Arc::new(CountingTexture::new(1, 1, format::GRAY8));

    let tall = Bitmap::with_texture(texture.clone(), 1, 0x8000_0000, format::GRAY8);
    assert!(matches!(
        tall.lock(None, LockFlags::READ),
        Err(BitmapError::InvalidArgument(_))
    ));
    let wide = Bitmap::with_texture(texture.clone(), u32::MAX, 1, format::GRAY8);
    assert!(matches!(
        wide.lock(Some(&Rect::new(0, 0, i32::MAX, 1)), LockFlags::READ),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert_eq!(texture.locks(), 0);
    assert!(!tall.is_locked() && !wide.is_locked());

    // the largest lockable height still has to fit the mapping
    let edge = Bitmap::with_texture(texture.clone(), 1, i32::MAX as u32, format::GRAY8);
    assert!(matches!(
        edge.lock(None, LockFlags::READ),
        Err(BitmapError::InvalidArgument(_))
    ));
    assert_eq!(texture.locks(), 1);
    assert_eq!(texture.unlocks(), 1);
}
