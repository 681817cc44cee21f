// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use core::fmt;

/// Opaque pixel format identifier.
///
/// Pixel formats are 128-bit GUIDs compatible with the Windows Imaging
/// Component format identifiers, so values can be passed unchanged between
/// this crate and WIC-style consumers. Layout facts such as bits per pixel are
/// resolved through [`PixelFormat::properties`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat(u128);

impl PixelFormat {
    pub const fn from_u128(guid: u128) -> Self {
        Self(guid)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    /// Looks up the layout properties of this format.
    ///
    /// Returns `None` for formats missing from the property table, which
    /// includes every sub-byte and indexed format.
    pub fn properties(&self) -> Option<&'static PixelFormatProperties> {
        FORMAT_TABLE
            .iter()
            .find(|(format, _)| format == self)
            .map(|(_, props)| props)
    }

    pub fn bits_per_pixel(&self) -> Option<u32> {
        self.properties().map(|p| p.bits_per_pixel)
    }

    /// Row stride in bytes for a tightly packed image `width` pixels wide.
    pub fn bytes_per_row(&self, width: u32) -> Option<usize> {
        self.bits_per_pixel()
            .map(|bpp| (bpp >> 3) as usize * width as usize)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let g = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (g >> 96) as u32,
            (g >> 80) as u16,
            (g >> 64) as u16,
            (g >> 48) as u16,
            g & 0xffff_ffff_ffff
        )
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PixelFormat({{{}}})", self)
    }
}

/// 8-bit grayscale
pub const GRAY8: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc908);

/// 8-bit alpha only
pub const ALPHA8: PixelFormat = PixelFormat(0xe6cd0116_eeba_4161_aa85_27dd9fb3a895);

/// 16-bit grayscale
pub const GRAY16: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc90b);

/// 16-bit BGR, 5 bits per channel
pub const BGR555: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc909);

/// 16-bit BGR, 5-6-5 bits per channel
pub const BGR565: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc90a);

/// 24-bit BGR, 8 bits per channel
pub const BGR24: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc90c);

/// 24-bit RGB, 8 bits per channel
pub const RGB24: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc90d);

/// 32-bit BGR with an unused fourth byte
pub const BGRX: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc90e);

/// 32-bit BGRA, straight alpha
pub const BGRA: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc90f);

/// 32-bit BGRA, premultiplied alpha (the native display texture format)
pub const PBGRA: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc910);

/// 32-bit RGB with an unused fourth byte
pub const RGBX: PixelFormat = PixelFormat(0xd98c6b95_3efe_47d6_bb25_eb1748ab0cf1);

/// 32-bit RGBA, straight alpha
pub const RGBA: PixelFormat = PixelFormat(0xf5c7ad2d_6a8d_43dd_a7a8_a29935261ae9);

/// 32-bit RGBA, premultiplied alpha
pub const PRGBA: PixelFormat = PixelFormat(0x3cc4a650_a527_4d37_a916_3142c7ebedba);

/// 48-bit RGB, 16 bits per channel
pub const RGB48: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc915);

/// 64-bit RGBA, 16 bits per channel
pub const RGBA64: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc916);

/// 64-bit RGBA, 16 bits per channel, premultiplied alpha
pub const PRGBA64: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc917);

/// 1 bit per pixel, palette indexed (not in the property table)
pub const INDEXED1: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc901);

/// 8 bits per pixel, palette indexed (not in the property table)
pub const INDEXED8: PixelFormat = PixelFormat(0x6fddc324_4e03_4bfe_b185_3d77768dc904);

/// Layout facts for a registered pixel format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelFormatProperties {
    pub bits_per_pixel: u32,
    pub channels: u32,
    pub has_alpha: bool,
    pub premultiplied: bool,
}

const fn props(
    bits_per_pixel: u32,
    channels: u32,
    has_alpha: bool,
    premultiplied: bool,
) -> PixelFormatProperties {
    PixelFormatProperties {
        bits_per_pixel,
        channels,
        has_alpha,
        premultiplied,
    }
}

static FORMAT_TABLE: &[(PixelFormat, PixelFormatProperties)] = &[
    (GRAY8, props(8, 1, false, false)),
    (ALPHA8, props(8, 1, true, false)),
    (GRAY16, props(16, 1, false, false)),
    (BGR555, props(16, 3, false, false)),
    (BGR565, props(16, 3, false, false)),
    (BGR24, props(24, 3, false, false)),
    (RGB24, props(24, 3, false, false)),
    (BGRX, props(32, 3, false, false)),
    (BGRA, props(32, 4, true, false)),
    (PBGRA, props(32, 4, true, true)),
    (RGBX, props(32, 3, false, false)),
    (RGBA, props(32, 4, true, false)),
    (PRGBA, props(32, 4, true, true)),
    (RGB48, props(48, 3, false, false)),
    (RGBA64, props(64, 4, true, false)),
    (PRGBA64, props(64, 4, true, true)),
];

/// C-layout GUID used to pass pixel formats across the C ABI.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl From<Guid> for PixelFormat {
    fn from(guid: Guid) -> Self {
        PixelFormat(
            (guid.data1 as u128) << 96
                | (guid.data2 as u128) << 80
                | (guid.data3 as u128) << 64
                | u64::from_be_bytes(guid.data4) as u128,
        )
    }
}

impl From<PixelFormat> for Guid {
    fn from(format: PixelFormat) -> Self {
        let g = format.0;
        Guid {
            data1: (g >> 96) as u32,
            data2: (g >> 80) as u16,
            data3: (g >> 64) as u16,
            data4: (g as u64).to_be_bytes(),
        }
    }
}

/// Rectangle in pixel coordinates.
///
/// Laid out like `WICRect` so it can be read directly from C callers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: i32,
    /// Y coordinate of top-left corner
    pub y: i32,
    /// Width of the rectangle in pixels
    pub width: i32,
    /// Height of the rectangle in pixels
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole image of the given dimensions, or `None`
    /// if a dimension does not fit in an `i32`.
    pub fn full(width: u32, height: u32) -> Option<Self> {
        Some(Rect::new(
            0,
            0,
            i32::try_from(width).ok()?,
            i32::try_from(height).ok()?,
        ))
    }
}

/// Color table for indexed formats.
///
/// Palettes are carried for API completeness only; bitmaps reject every
/// palette operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<u32>,
}

impl Palette {
    pub fn new(colors: Vec<u32>) -> Self {
        Self { colors }
    }

    /// Colors as packed 0xAARRGGBB values.
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }
}
