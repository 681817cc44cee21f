// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::format::PixelFormat;

/// Errors returned by bitmap, lock and texture operations.
#[derive(Debug, thiserror::Error)]
pub enum BitmapError {
    /// A required handle or output location was null.
    #[error("null pointer")]
    Pointer,

    /// The operation is outside the supported feature set.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Geometry or capacity arguments do not fit the bitmap.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Another lock over the same pixel memory is still live.
    #[error("pixel memory is already locked")]
    AlreadyLocked,

    /// The pixel format has no entry in the property table.
    #[error("unknown pixel format {0}")]
    UnknownFormat(PixelFormat),

    /// A lower-level invariant broke while touching pixel memory.
    #[error("unexpected failure: {0}")]
    Unexpected(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BitmapError {
    pub fn status(&self) -> Status {
        match self {
            BitmapError::Pointer => Status::Pointer,
            BitmapError::NotImplemented(_) => Status::NotImplemented,
            BitmapError::InvalidArgument(_) => Status::InvalidArgument,
            BitmapError::AlreadyLocked => Status::AlreadyLocked,
            BitmapError::UnknownFormat(_) => Status::UnknownFormat,
            BitmapError::Unexpected(_) => Status::Unexpected,
            BitmapError::Io(_) => Status::Fail,
        }
    }
}

/// HRESULT-style status codes reported through the C ABI.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    NotImplemented = 0x8000_4001_u32 as i32,
    Pointer = 0x8000_4003_u32 as i32,
    Fail = 0x8000_4005_u32 as i32,
    Unexpected = 0x8000_ffff_u32 as i32,
    InvalidArgument = 0x8007_0057_u32 as i32,
    UnknownFormat = 0x8898_2f80_u32 as i32,
    AlreadyLocked = 0x8898_2f0d_u32 as i32,
}

impl Status {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl<T> From<Result<T, BitmapError>> for Status {
    fn from(result: Result<T, BitmapError>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }
}
