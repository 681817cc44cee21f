// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_bitmap::{
    capi::*,
    format::{self, Guid},
    Bitmap, DisplayTexture, MemoryTexture, PixelFormat, Rect, Status,
};
use std::{
    ptr::{null, null_mut},
    sync::Arc,
};

fn create(width: u32, height: u32, format: PixelFormat) -> *mut Bitmap {
    let guid = Guid::from(format);
    let mut bitmap = null_mut();
    let status = unsafe { bitmap_create(null_mut(), &guid, width, height, &mut bitmap) };
    assert_eq!(status, Status::Ok.code());
    assert!(!bitmap.is_null());
    bitmap
}

#[test]
fn test_create_null_arguments() {
    let guid = Guid::from(format::BGRA);
    let mut bitmap = null_mut();
    unsafe {
        assert_eq!(
            bitmap_create(null_mut(), &guid, 4, 4, null_mut()),
            Status::Pointer.code()
        );
        assert_eq!(
            bitmap_create(null_mut(), null(), 4, 4, &mut bitmap),
            Status::Pointer.code()
        );
        assert!(bitmap.is_null());
        assert_eq!(bitmap_release(null_mut()), Status::Pointer.code());
    }
}

#[test]
fn test_accessors() {
    let bitmap = create(4, 2, format::BGRA);
    unsafe {
        let (mut width, mut height) = (0u32, 0u32);
        assert_eq!(bitmap_get_size(bitmap, &mut width, &mut height), 0);
        assert_eq!((width, height), (4, 2));
        assert_eq!(
            bitmap_get_size(bitmap, null_mut(), &mut height),
            Status::Pointer.code()
        );
        assert_eq!(
            bitmap_get_size(null(), &mut width, &mut height),
            Status::Pointer.code()
        );

        let mut guid = Guid::default();
        assert_eq!(bitmap_get_pixel_format(bitmap, &mut guid), 0);
        assert_eq!(PixelFormat::from(guid), format::BGRA);
        assert_eq!(
            bitmap_get_pixel_format(bitmap, null_mut()),
            Status::Pointer.code()
        );

        let (mut dpi_x, mut dpi_y) = (0.0, 0.0);
        assert_eq!(bitmap_get_resolution(bitmap, &mut dpi_x, &mut dpi_y), 0);
        assert_eq!((dpi_x, dpi_y), (96.0, 96.0));
        assert_eq!(bitmap_set_resolution(bitmap, 120.0, 240.0), 0);
        assert_eq!(bitmap_get_resolution(bitmap, &mut dpi_x, &mut dpi_y), 0);
        assert_eq!((dpi_x, dpi_y), (120.0, 240.0));
        assert_eq!(
            bitmap_get_resolution(bitmap, &mut dpi_x, null_mut()),
            Status::Pointer.code()
        );

        assert_eq!(bitmap_release(bitmap), 0);
    }
}

#[test]
fn test_lock() {
    let bitmap = create(4, 2, format::BGRA);
    unsafe {
        assert_eq!(
            bitmap_lock(bitmap, null(), 0, null_mut()),
            Status::Pointer.code()
        );

        let mut lock = null_mut();
        let offset = Rect::new(1, 0, 4, 2);
        assert_eq!(
            bitmap_lock(bitmap, &offset, 0, &mut lock),
            Status::NotImplemented.code()
        );
        let oversize = Rect::new(0, 0, 5, 2);
        assert_eq!(
            bitmap_lock(bitmap, &oversize, 0, &mut lock),
            Status::InvalidArgument.code()
        );
        assert!(lock.is_null());

        assert_eq!(bitmap_lock(bitmap, null(), 0, &mut lock), 0);
        assert!(!lock.is_null());

        let mut second = null_mut();
        assert_eq!(
            bitmap_lock(bitmap, null(), 0, &mut second),
            Status::AlreadyLocked.code()
        );

        let (mut width, mut height, mut stride) = (0u32, 0u32, 0u32);
        assert_eq!(lock_get_size(lock, &mut width, &mut height), 0);
        assert_eq!((width, height), (4, 2));
        assert_eq!(lock_get_stride(lock, &mut stride), 0);
        assert_eq!(stride, 16);
        assert_eq!(lock_get_stride(lock, null_mut()), Status::Pointer.code());

        let mut size = 0u32;
        let mut data = null_mut();
        assert_eq!(lock_get_data_pointer(lock, &mut size, &mut data), 0);
        assert_eq!(size, 32);
        assert!(!data.is_null());
        assert_eq!(
            lock_get_data_pointer(lock, &mut size, null_mut()),
            Status::Pointer.code()
        );

        let mut guid = Guid::default();
        assert_eq!(lock_get_pixel_format(lock, &mut guid), 0);
        assert_eq!(PixelFormat::from(guid), format::BGRA);

        for i in 0..size as usize {
            *data.add(i) = i as u8;
        }
        assert_eq!(lock_release(lock), 0);
        assert_eq!(lock_release(null_mut()), Status::Pointer.code());

        let mut pixels = [0u8; 32];
        assert_eq!(
            bitmap_copy_pixels(bitmap, null(), 16, 32, pixels.as_mut_ptr()),
            0
        );
        assert!(pixels.iter().enumerate().all(|(i, &b)| b == i as u8));

        assert_eq!(bitmap_release(bitmap), 0);
    }
}

#[test]
fn test_copy_pixels() {
    let bitmap = create(4, 2, format::BGRA);
    unsafe {
        assert_eq!(
            bitmap_copy_pixels(bitmap, null(), 16, 32, null_mut()),
            Status::Pointer.code()
        );

        let mut pixels = [0xaau8; 32];
        assert_eq!(
            bitmap_copy_pixels(bitmap, null(), 16, 31, pixels.as_mut_ptr()),
            Status::InvalidArgument.code()
        );
        assert!(pixels.iter().all(|&b| b == 0xaa));

        let region = Rect::new(0, 0, 2, 2);
        assert_eq!(
            bitmap_copy_pixels(bitmap, &region, 16, 32, pixels.as_mut_ptr()),
            Status::NotImplemented.code()
        );

        assert_eq!(
            bitmap_copy_pixels(bitmap, null(), 16, 32, pixels.as_mut_ptr()),
            0
        );
        assert!(pixels.iter().all(|&b| b == 0));

        assert_eq!(bitmap_release(bitmap), 0);
    }
}

#[test]
fn test_palette() {
    let bitmap = create(2, 2, format::GRAY8);
    unsafe {
        assert_eq!(
            bitmap_set_palette(bitmap, null()),
            Status::NotImplemented.code()
        );
        assert_eq!(
            bitmap_copy_palette(bitmap, null_mut()),
            Status::NotImplemented.code()
        );
        assert_eq!(
            bitmap_set_palette(null(), null()),
            Status::NotImplemented.code()
        );
        assert_eq!(bitmap_release(bitmap), 0);
    }
}

#[test]
fn test_display_texture() {
    let texture = Arc::new(MemoryTexture::new(2, 2, format::BGRA).unwrap());
    let textured = Box::into_raw(Box::new(Bitmap::with_texture(
        texture.clone(),
        2,
        2,
        format::BGRA,
    )));
    let buffered = create(2, 2, format::BGRA);

    unsafe {
        let mut handle = null_mut();
        assert_eq!(bitmap_get_display_texture(textured, &mut handle), 0);
        assert!(!handle.is_null());
        assert_eq!(Arc::strong_count(&texture), 3);
        assert!((*handle).texture().lock().is_ok());
        (*handle).texture().unlock();
        assert_eq!(texture_release(handle), 0);
        assert_eq!(Arc::strong_count(&texture), 2);

        let mut handle = null_mut();
        assert_eq!(bitmap_get_display_texture(buffered, &mut handle), 0);
        assert!(handle.is_null());
        assert_eq!(
            bitmap_get_display_texture(buffered, null_mut()),
            Status::Pointer.code()
        );
        assert_eq!(texture_release(null_mut()), Status::Pointer.code());

        assert_eq!(bitmap_release(textured), 0);
        assert_eq!(bitmap_release(buffered), 0);
    }
    assert_eq!(Arc::strong_count(&texture), 1);
}

#[test]
fn test_adopted_buffer() {
    let mut external = vec![7u8; 12];
    let guid = Guid::from(format::RGB24);
    let mut bitmap = null_mut();
    unsafe {
        assert_eq!(
            bitmap_create(external.as_mut_ptr().cast(), &guid, 2, 2, &mut bitmap),
            0
        );
        assert!(!(*bitmap).owns_buffer());

        let mut pixels = [0u8; 12];
        assert_eq!(
            bitmap_copy_pixels(bitmap, null(), 6, 12, pixels.as_mut_ptr()),
            0
        );
        assert_eq!(pixels, [7u8; 12]);
        assert_eq!(bitmap_release(bitmap), 0);
    }
    assert_eq!(external, vec![7u8; 12]);
}

#[test]
fn test_lock_small_texture() {
    let texture = Arc::new(MemoryTexture::new(1, 1, format::BGRA).unwrap());
    let bitmap = Box::into_raw(Box::new(Bitmap::with_texture(
        texture.clone(),
        1,
        4096,
        format::BGRA,
    )));
    unsafe {
        let mut lock = null_mut();
        assert_eq!(
            bitmap_lock(bitmap, null(), 0, &mut lock),
            Status::InvalidArgument.code()
        );
        assert!(lock.is_null());
        assert!(!texture.is_locked());

        let mut pixels = [0u8; 64];
        assert_eq!(
            bitmap_copy_pixels(bitmap, null(), 4, 64, pixels.as_mut_ptr()),
            Status::InvalidArgument.code()
        );
        assert_eq!(bitmap_release(bitmap), 0);
    }
}
