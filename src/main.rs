// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use args::{Args, Backend, Pattern};
use clap::Parser;
use edgefirst_bitmap::{
    Bitmap, BitmapLock, BitmapSource, DisplayTextureSource, LockFlags, MemoryTexture, PixelFormat,
};
use serde_json::{json, Value};
use std::{error::Error, fs, sync::Arc, time::Instant};
use tracing::{info, info_span, level_filters::LevelFilter};
use tracing_subscriber::{prelude::*, Layer};

mod args;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args)?;

    let (width, height) = (args.size[0], args.size[1]);
    let format = args.format.pixel_format();
    let bitmap = create_bitmap(&args, width, height, format)?;
    bitmap.set_resolution(args.dpi[0], args.dpi[1]);
    info!("created bitmap {}", bitmap);

    let now = Instant::now();
    let stride = {
        let _span = info_span!("fill").entered();
        let mut lock = bitmap.lock(None, LockFlags::WRITE)?;
        fill(&mut lock, args.pattern);
        lock.stride()
    };
    let fill_elapsed = now.elapsed();

    let mut pixels = vec![0u8; stride * height as usize];
    let now = Instant::now();
    {
        let _span = info_span!("copy_pixels").entered();
        bitmap.copy_pixels(None, stride as u32, &mut pixels)?;
    }
    let copy_elapsed = now.elapsed();

    if let Some(path) = &args.output {
        fs::write(path, &pixels)?;
        info!("saved {} bytes to {}", pixels.len(), path.display());
    }

    let summary = summarize(&bitmap, stride, &pixels);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} stride: {} size: {} checksum: {:016x} fill: {:.2?} copy: {:.2?}",
            bitmap, stride, pixels.len(), checksum(&pixels), fill_elapsed, copy_elapsed
        );
    }

    Ok(())
}

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error>> {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stdout_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(level);

    let journald = match tracing_journald::layer() {
        Ok(journald) => Some(journald.with_filter(level)),
        Err(_) => None,
    };

    let tracy = if args.tracy {
        tracy_client::Client::start();
        Some(tracing_tracy::TracyLayer::default().with_filter(level))
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry()
        .with(stdout_log)
        .with(journald)
        .with(tracy);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    Ok(())
}

fn create_bitmap(
    args: &Args,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Bitmap, Box<dyn Error>> {
    match args.backend {
        Backend::Buffer => Ok(Bitmap::new(width, height, format)),
        Backend::Memory => {
            let texture =
                MemoryTexture::with_row_alignment(width, height, format, args.row_alignment)?;
            Ok(Bitmap::with_texture(Arc::new(texture), width, height, format))
        }
        Backend::Dma => dma_bitmap(width, height, format),
    }
}

#[cfg(target_os = "linux")]
fn dma_bitmap(width: u32, height: u32, format: PixelFormat) -> Result<Bitmap, Box<dyn Error>> {
    let texture = edgefirst_bitmap::dma::DmaTexture::new(width, height, format)?;
    info!("allocated DMA texture {}", texture);
    Ok(Bitmap::with_texture(Arc::new(texture), width, height, format))
}

#[cfg(not(target_os = "linux"))]
fn dma_bitmap(_width: u32, _height: u32, _format: PixelFormat) -> Result<Bitmap, Box<dyn Error>> {
    Err("DMA textures are only available on Linux".into())
}

fn fill(lock: &mut BitmapLock, pattern: Pattern) {
    let stride = lock.stride();
    if stride == 0 {
        return;
    }
    let (width, _) = lock.size();
    let bytes_per_pixel = lock
        .pixel_format()
        .bits_per_pixel()
        .map_or(1, |bpp| (bpp as usize / 8).max(1));
    let row_bytes = width as usize * bytes_per_pixel;

    for (y, row) in lock.as_mut_slice().chunks_mut(stride).enumerate() {
        for (i, byte) in row.iter_mut().take(row_bytes).enumerate() {
            let x = i / bytes_per_pixel;
            *byte = match pattern {
                Pattern::Gradient => (x + y) as u8,
                Pattern::Checker if (x / 8 + y / 8) % 2 == 0 => 0xff,
                Pattern::Checker | Pattern::Zero => 0,
            };
        }
    }
}

fn checksum(pixels: &[u8]) -> u64 {
    // FNV-1a
    pixels.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn summarize<B>(bitmap: &B, stride: usize, pixels: &[u8]) -> Value
where
    B: BitmapSource + DisplayTextureSource,
{
    let (width, height) = bitmap.size();
    let (dpi_x, dpi_y) = bitmap.resolution();
    let format = bitmap.pixel_format();
    json!({
        "width": width,
        "height": height,
        "format": format.to_string(),
        "bits_per_pixel": format.bits_per_pixel(),
        "dpi": [dpi_x, dpi_y],
        "stride": stride,
        "size": pixels.len(),
        "texture": bitmap.display_texture().is_some(),
        "checksum": format!("{:016x}", checksum(pixels)),
    })
}
