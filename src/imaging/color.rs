//! Prominent colour extraction.
//!
//! Pixels are bucketed by the top four bits of each channel (4096 buckets).
//! The fullest bucket wins and its members are averaged, which gives a stable
//! placeholder colour without running k-means. Ties resolve to the lowest
//! bucket index so the result is deterministic.

use image::RgbImage;

/// Most common quantized colour of `img` as lower-case `rrggbb`.
///
/// Returns `None` for an image with no pixels.
pub fn prominent_color(img: &RgbImage) -> Option<String> {
    let mut counts = vec![0u32; 4096];
    let mut sums = vec![[0u64; 3]; 4096];

    for pixel in img.pixels() {
        let [r, g, b] = pixel.0;
        let bucket = ((r as usize >> 4) << 8) | ((g as usize >> 4) << 4) | (b as usize >> 4);
        counts[bucket] += 1;
        sums[bucket][0] += r as u64;
        sums[bucket][1] += g as u64;
        sums[bucket][2] += b as u64;
    }

    let (best, &count) = counts
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
    if count == 0 {
        return None;
    }

    let n = count as u64;
    let [r, g, b] = sums[best];
    Some(format!("{:02x}{:02x}{:02x}", r / n, g / n, b / n))
}
