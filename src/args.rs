// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_bitmap::{format, PixelFormat};
use std::path::PathBuf;

/// Pixel storage behind the bitmap.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum Backend {
    /// CPU buffer allocated and owned by the bitmap
    Buffer,
    /// CPU-resident display texture (software fallback)
    Memory,
    /// Display texture allocated from the CMA DMA heap
    Dma,
}

/// Pixel formats selectable from the command line.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum FormatArg {
    /// 8-bit grayscale
    Gray8,
    /// 24-bit BGR
    Bgr24,
    /// 24-bit RGB
    Rgb24,
    /// 32-bit BGRA, straight alpha
    Bgra,
    /// 32-bit BGRA, premultiplied alpha
    Pbgra,
    /// 32-bit RGBA, straight alpha
    Rgba,
    /// 32-bit RGBA, premultiplied alpha
    Prgba,
    /// 64-bit RGBA, 16 bits per channel
    Rgba64,
}

impl FormatArg {
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            FormatArg::Gray8 => format::GRAY8,
            FormatArg::Bgr24 => format::BGR24,
            FormatArg::Rgb24 => format::RGB24,
            FormatArg::Bgra => format::BGRA,
            FormatArg::Pbgra => format::PBGRA,
            FormatArg::Rgba => format::RGBA,
            FormatArg::Prgba => format::PRGBA,
            FormatArg::Rgba64 => format::RGBA64,
        }
    }
}

/// Test pattern written through the bitmap lock.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum Pattern {
    /// Bytes increase along each row and down the image
    Gradient,
    /// 8x8 pixel black and white checkerboard
    Checker,
    /// All bytes zero
    Zero,
}

/// Command-line arguments for the EdgeFirst bitmap tool.
///
/// The tool creates a bitmap on the selected backend, writes a test pattern
/// through a lock, copies the pixels back out and reports the result.
/// Arguments can be specified via command line or environment variables.
///
/// # Example
///
/// ```bash
/// # Via command line
/// edgefirst-bitmap --size 1920 1080 --backend dma --output frame.raw
///
/// # Via environment variables
/// export BITMAP_BACKEND=memory
/// export ROW_ALIGNMENT=256
/// edgefirst-bitmap --json
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Bitmap size in pixels (width height)
    #[arg(
        long,
        env = "BITMAP_SIZE",
        default_value = "640 480",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub size: Vec<u32>,

    /// Bitmap pixel format
    #[arg(long, env = "BITMAP_FORMAT", default_value = "pbgra", value_enum)]
    pub format: FormatArg,

    /// Pixel storage backend
    #[arg(long, env = "BITMAP_BACKEND", default_value = "buffer", value_enum)]
    pub backend: Backend,

    /// Row pitch alignment in bytes for the memory texture backend
    #[arg(long, env = "ROW_ALIGNMENT", default_value = "1")]
    pub row_alignment: usize,

    /// Test pattern to write into the bitmap
    #[arg(long, default_value = "gradient", value_enum)]
    pub pattern: Pattern,

    /// Bitmap resolution in dots per inch (x y)
    #[arg(
        long,
        env = "DPI",
        default_value = "96 96",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub dpi: Vec<f64>,

    /// Write the copied pixels to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}
