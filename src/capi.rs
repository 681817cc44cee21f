// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! C ABI for bitmap and lock objects.
//!
//! Every function returns an HRESULT-style [`Status`] code and writes results
//! through caller-provided output pointers. A null handle or output pointer
//! yields [`Status::Pointer`] without side effects.
//!
//! # Safety
//!
//! Non-null handles must come from the matching create or lock call and must
//! not be used after release. A lock must be released before the bitmap it
//! was taken from. Output pointers must be valid for writes and buffers valid
//! for their stated size.
#![allow(clippy::missing_safety_doc)]

use crate::{
    bitmap::{Bitmap, BitmapSource},
    error::{BitmapError, Status},
    format::{Guid, Palette, PixelFormat, Rect},
    lock::{BitmapLock, LockFlags},
    texture::{DisplayTexture, DisplayTextureSource},
};
use std::{ffi::c_void, ptr::null_mut, slice::from_raw_parts_mut, sync::Arc};

/// Lock handle handed across the C ABI.
///
/// The borrow of the bitmap is not tracked by the compiler on this side of
/// the boundary; callers uphold it by releasing locks first.
pub type RawBitmapLock = BitmapLock<'static>;

/// Shared reference to a bitmap's display texture.
pub struct TextureHandle(Arc<dyn DisplayTexture>);

impl TextureHandle {
    pub fn texture(&self) -> &Arc<dyn DisplayTexture> {
        &self.0
    }
}

fn status<T>(result: Result<T, BitmapError>) -> i32 {
    Status::from(result).code()
}

fn to_u32(value: usize, what: &str) -> Result<u32, BitmapError> {
    u32::try_from(value)
        .map_err(|_| BitmapError::InvalidArgument(format!("{} {} exceeds u32", what, value)))
}

/// Creates a bitmap over `data`, or over a new owned buffer when `data` is
/// null. Aborts the process if `format` is not a registered pixel format.
#[no_mangle]
pub unsafe extern "C" fn bitmap_create(
    data: *mut c_void,
    format: *const Guid,
    width: u32,
    height: u32,
    out: *mut *mut Bitmap,
) -> i32 {
    if out.is_null() || format.is_null() {
        return Status::Pointer.code();
    }
    let bitmap = Bitmap::from_raw_parts(data.cast(), width, height, PixelFormat::from(*format));
    *out = Box::into_raw(Box::new(bitmap));
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn bitmap_release(bitmap: *mut Bitmap) -> i32 {
    if bitmap.is_null() {
        return Status::Pointer.code();
    }
    drop(Box::from_raw(bitmap));
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn bitmap_get_size(
    bitmap: *const Bitmap,
    width: *mut u32,
    height: *mut u32,
) -> i32 {
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    if width.is_null() || height.is_null() {
        return Status::Pointer.code();
    }
    (*width, *height) = bitmap.size();
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn bitmap_get_pixel_format(bitmap: *const Bitmap, format: *mut Guid) -> i32 {
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    if format.is_null() {
        return Status::Pointer.code();
    }
    *format = bitmap.pixel_format().into();
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn bitmap_get_resolution(
    bitmap: *const Bitmap,
    dpi_x: *mut f64,
    dpi_y: *mut f64,
) -> i32 {
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    if dpi_x.is_null() || dpi_y.is_null() {
        return Status::Pointer.code();
    }
    (*dpi_x, *dpi_y) = bitmap.resolution();
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn bitmap_set_resolution(bitmap: *const Bitmap, dpi_x: f64, dpi_y: f64) -> i32 {
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    bitmap.set_resolution(dpi_x, dpi_y);
    Status::Ok.code()
}

/// Locks the bitmap. `region` may be null to lock the whole bitmap; `flags`
/// is ignored.
#[no_mangle]
pub unsafe extern "C" fn bitmap_lock(
    bitmap: *const Bitmap,
    region: *const Rect,
    flags: u32,
    out: *mut *mut RawBitmapLock,
) -> i32 {
    if out.is_null() {
        return Status::Pointer.code();
    }
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    match bitmap.lock(region.as_ref(), LockFlags::from_bits(flags)) {
        Ok(lock) => {
            *out = Box::into_raw(Box::new(lock));
            Status::Ok.code()
        }
        Err(e) => e.status().code(),
    }
}

/// Copies the whole bitmap into `buffer`. `stride` is accepted and ignored.
#[no_mangle]
pub unsafe extern "C" fn bitmap_copy_pixels(
    bitmap: *const Bitmap,
    rect: *const Rect,
    stride: u32,
    buffer_size: u32,
    buffer: *mut u8,
) -> i32 {
    if buffer.is_null() {
        return Status::Pointer.code();
    }
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    let buffer = from_raw_parts_mut(buffer, buffer_size as usize);
    status(bitmap.copy_pixels(rect.as_ref(), stride, buffer))
}

/// Always fails with `NotImplemented`, even for a null bitmap.
#[no_mangle]
pub unsafe extern "C" fn bitmap_set_palette(bitmap: *const Bitmap, _palette: *const c_void) -> i32 {
    match bitmap.as_ref() {
        Some(bitmap) => status(bitmap.set_palette(&Palette::default())),
        None => Status::NotImplemented.code(),
    }
}

/// Always fails with `NotImplemented`, even for a null bitmap.
#[no_mangle]
pub unsafe extern "C" fn bitmap_copy_palette(bitmap: *const Bitmap, _palette: *mut c_void) -> i32 {
    match bitmap.as_ref() {
        Some(bitmap) => status(bitmap.copy_palette(&mut Palette::default())),
        None => Status::NotImplemented.code(),
    }
}

/// Retrieves the bitmap's display texture. Buffer-backed bitmaps store null
/// in `out` and succeed.
#[no_mangle]
pub unsafe extern "C" fn bitmap_get_display_texture(
    bitmap: *const Bitmap,
    out: *mut *mut TextureHandle,
) -> i32 {
    if out.is_null() {
        return Status::Pointer.code();
    }
    let Some(bitmap) = bitmap.as_ref() else {
        return Status::Pointer.code();
    };
    *out = match bitmap.display_texture() {
        Some(texture) => Box::into_raw(Box::new(TextureHandle(texture))),
        None => null_mut(),
    };
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn texture_release(texture: *mut TextureHandle) -> i32 {
    if texture.is_null() {
        return Status::Pointer.code();
    }
    drop(Box::from_raw(texture));
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn lock_get_size(
    lock: *const RawBitmapLock,
    width: *mut u32,
    height: *mut u32,
) -> i32 {
    let Some(lock) = lock.as_ref() else {
        return Status::Pointer.code();
    };
    if width.is_null() || height.is_null() {
        return Status::Pointer.code();
    }
    (*width, *height) = lock.size();
    Status::Ok.code()
}

#[no_mangle]
pub unsafe extern "C" fn lock_get_stride(lock: *const RawBitmapLock, stride: *mut u32) -> i32 {
    let Some(lock) = lock.as_ref() else {
        return Status::Pointer.code();
    };
    if stride.is_null() {
        return Status::Pointer.code();
    }
    match to_u32(lock.stride(), "stride") {
        Ok(value) => {
            *stride = value;
            Status::Ok.code()
        }
        Err(e) => e.status().code(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn lock_get_data_pointer(
    lock: *const RawBitmapLock,
    size: *mut u32,
    data: *mut *mut u8,
) -> i32 {
    let Some(lock) = lock.as_ref() else {
        return Status::Pointer.code();
    };
    if size.is_null() || data.is_null() {
        return Status::Pointer.code();
    }
    let (len, ptr) = lock.data_pointer();
    match to_u32(len, "data size") {
        Ok(len) => {
            *size = len;
            *data = ptr;
            Status::Ok.code()
        }
        Err(e) => e.status().code(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn lock_get_pixel_format(lock: *const RawBitmapLock, format: *mut Guid) -> i32 {
    let Some(lock) = lock.as_ref() else {
        return Status::Pointer.code();
    };
    if format.is_null() {
        return Status::Pointer.code();
    }
    *format = lock.pixel_format().into();
    Status::Ok.code()
}

/// Releases a lock, unlocking the bitmap's texture if it has one.
#[no_mangle]
pub unsafe extern "C" fn lock_release(lock: *mut RawBitmapLock) -> i32 {
    if lock.is_null() {
        return Status::Pointer.code();
    }
    drop(Box::from_raw(lock));
    Status::Ok.code()
}
