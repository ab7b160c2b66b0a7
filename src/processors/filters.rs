//! Pixel filters for the enhancement chain.
//!
//! Bilateral smoothing and 3x3 sharpening come straight from
//! `imageproc::filter`. What lives here is either missing from `imageproc`
//! (tiled CLAHE, gamma tables, Gaussian adaptive thresholding) or needs
//! different edge handling: `imageproc`'s rotations fill uncovered pixels
//! with a constant, while deskewing replicates the nearest edge pixel.

use image::{GrayImage, Luma};
use imageproc::contrast::stretch_contrast;
use imageproc::filter::gaussian_blur_f32;
use imageproc::stats::min_max;

#[inline]
fn clamp_index(i: i64, n: i64) -> usize {
    i.clamp(0, n - 1) as usize
}

/// Locates a pixel between tile centers: the two neighboring tiles and the
/// weight of the second one.
#[inline]
fn tile_neighbors(pos: u32, tile_size: u32, tiles: u32) -> (usize, usize, f32) {
    let g = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    if g <= 0.0 {
        return (0, 0, 0.0);
    }
    let t0 = g.floor() as u32;
    if t0 >= tiles - 1 {
        let last = (tiles - 1) as usize;
        return (last, last, 0.0);
    }
    (t0 as usize, t0 as usize + 1, g - t0 as f32)
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid.0 x grid.1` grid of tiles. Each tile's
/// histogram is clipped at `clip_limit` times its mean bin height, the excess
/// is spread evenly over all bins, and the resulting equalization curves are
/// blended bilinearly between tile centers.
pub fn clahe(image: &GrayImage, clip_limit: f32, grid: (u32, u32)) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let tile_w = w.div_ceil(grid.0.clamp(1, w));
    let tile_h = h.div_ceil(grid.1.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(w), (y0 + tile_h).min(h));
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            if clip_limit > 0.0 {
                clip_histogram(&mut hist, ((clip_limit * area as f32 / 256.0) as u32).max(1));
            }
            let scale = 255.0 / area as f32;
            let mut lut = [0u8; 256];
            let mut cdf = 0u32;
            for (level, count) in hist.iter().enumerate() {
                cdf += count;
                lut[level] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
            luts.push(lut);
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, fx) = tile_neighbors(x, tile_w, tiles_x);
        let (ty0, ty1, fy) = tile_neighbors(y, tile_h, tiles_y);
        let at = |tx: usize, ty: usize| luts[ty * tiles_x as usize + tx][v] as f32;
        let top = at(tx0, ty0) * (1.0 - fx) + at(tx1, ty0) * fx;
        let bottom = at(tx0, ty1) * (1.0 - fx) + at(tx1, ty1) * fx;
        Luma([(top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8])
    })
}

fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let batch = excess / 256;
    let residual = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }
}

/// Builds the power-law lookup table `255 * (i / 255)^gamma`, truncated.
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = ((i as f32 / 255.0).powf(gamma) * 255.0).clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Applies a 256-entry lookup table to every pixel.
pub fn apply_lut(image: &GrayImage, lut: &[u8; 256]) -> GrayImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        p[0] = lut[p[0] as usize];
    }
    out
}

/// Stretches intensities linearly so the darkest pixel becomes 0 and the
/// brightest 255. A flat image maps to all zeros.
pub fn normalize_min_max(image: &GrayImage) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let range = min_max(image)[0];
    if range.max <= range.min {
        return GrayImage::new(image.width(), image.height());
    }
    stretch_contrast(image, range.min, range.max, 0, 255)
}

/// Binarizes against a Gaussian-weighted local mean: a pixel becomes 255
/// when it is brighter than the mean of its `block_size` neighborhood minus
/// `offset`, otherwise 0.
pub fn adaptive_threshold_gaussian(image: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let block_size = block_size.max(3) | 1;
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(image, sigma);
    let mut out = image.clone();
    for (p, m) in out.pixels_mut().zip(local_mean.pixels()) {
        p[0] = if p[0] as f32 > m[0] as f32 - offset { 255 } else { 0 };
    }
    out
}

/// Bicubic kernel with `a = -0.75`.
#[inline]
fn cubic_weight(t: f32) -> f32 {
    const A: f32 = -0.75;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

/// Rotates about the image center (integer halves of the dimensions) by
/// `angle_deg`, positive values turning the content counter-clockwise as
/// displayed. Output keeps the input size; samples outside the source
/// replicate the nearest edge pixel.
pub fn rotate_bicubic(image: &GrayImage, angle_deg: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let (beta, alpha) = angle_deg.to_radians().sin_cos();
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let (wi, hi) = (w as i64, h as i64);

    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = alpha * dx - beta * dy + cx;
        let sy = beta * dx + alpha * dy + cy;

        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let wx = [cubic_weight(1.0 + fx), cubic_weight(fx), cubic_weight(1.0 - fx), cubic_weight(2.0 - fx)];
        let wy = [cubic_weight(1.0 + fy), cubic_weight(fy), cubic_weight(1.0 - fy), cubic_weight(2.0 - fy)];

        let mut acc = 0.0f32;
        for (j, wyj) in wy.iter().enumerate() {
            let py = clamp_index(y0 as i64 + j as i64 - 1, hi) as u32;
            let mut row = 0.0f32;
            for (i, wxi) in wx.iter().enumerate() {
                let px = clamp_index(x0 as i64 + i as i64 - 1, wi) as u32;
                row += wxi * image.get_pixel(px, py)[0] as f32;
            }
            acc += wyj * row;
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}
