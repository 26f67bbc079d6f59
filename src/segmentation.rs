//! Background segmentation and region erasure
//!
//! Pixels whose RGB channels all lie within a [`Tolerance`] of pure white are
//! "background-like". Maximal 4-connected components of such pixels are
//! discovered with a breadth-first flood fill and, depending on the
//! [`SegmentationStrategy`], erased by zeroing their alpha channel.
//!
//! Both strategies share one traversal: they differ only in where flood fills
//! are seeded and in which completed regions get erased.
//!
//! - [`SegmentationStrategy::BorderSeeded`] seeds from the four image edges and
//!   erases every region it reaches. Enclosed white areas survive.
//! - [`SegmentationStrategy::AreaFiltered`] seeds from every pixel in row-major
//!   order and erases a region only when its size strictly exceeds the area
//!   threshold, wherever it lies.

use crate::{
    config::{SegmentationStrategy, Tolerance},
    types::{PixelBuffer, SegmentationStats},
};
use tracing::{debug, trace};

/// Erases background pixels of a buffer in place
pub trait BackgroundEraser {
    /// Zero the alpha of every pixel classified as background and report what was done.
    ///
    /// Only the alpha channel is written. Dimensions and RGB values are untouched.
    fn erase_background(&self, buffer: &mut PixelBuffer, tolerance: Tolerance)
        -> SegmentationStats;
}

impl BackgroundEraser for SegmentationStrategy {
    fn erase_background(
        &self,
        buffer: &mut PixelBuffer,
        tolerance: Tolerance,
    ) -> SegmentationStats {
        let (width, height) = buffer.dimensions();
        let stats = match *self {
            Self::BorderSeeded => {
                erase_regions(buffer, tolerance, border_indices(width, height), |_| true)
            },
            Self::AreaFiltered {
                min_area_percentage,
            } => {
                let threshold = area_threshold(buffer.pixel_count(), min_area_percentage);
                let seeds = 0..buffer.pixel_count();
                erase_regions(buffer, tolerance, seeds, |size| size as f64 > threshold)
            },
        };

        debug!(
            strategy = %self,
            tolerance = %tolerance,
            regions_found = stats.regions_found,
            regions_erased = stats.regions_erased,
            pixels_erased = stats.pixels_erased,
            "Background erased"
        );
        stats
    }
}

/// Erase the background of `buffer` using `strategy`
pub fn erase_background(
    buffer: &mut PixelBuffer,
    tolerance: Tolerance,
    strategy: &SegmentationStrategy,
) -> SegmentationStats {
    strategy.erase_background(buffer, tolerance)
}

/// Minimum region size (exclusive) for the area-filtered strategy
#[must_use]
pub fn area_threshold(pixel_count: usize, min_area_percentage: f64) -> f64 {
    pixel_count as f64 * min_area_percentage / 100.0
}

/// One flag per pixel, set once the pixel has been queued by a flood fill
#[derive(Debug, Clone)]
pub struct VisitedMask {
    flags: Vec<bool>,
}

impl VisitedMask {
    #[must_use]
    pub fn new(pixel_count: usize) -> Self {
        Self {
            flags: vec![false; pixel_count],
        }
    }

    #[must_use]
    pub fn is_visited(&self, idx: usize) -> bool {
        self.flags.get(idx).copied().unwrap_or(false)
    }

    /// Mark `idx` visited; returns `false` if it already was
    pub fn mark(&mut self, idx: usize) -> bool {
        match self.flags.get_mut(idx) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            },
            _ => false,
        }
    }

    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }
}

/// Breadth-first flood fill over background-like pixels.
///
/// The region vector doubles as the FIFO queue: a read cursor walks it while
/// newly discovered neighbours are appended, so popping is O(1) and the
/// finished vector is the whole region.
struct FloodFill<'a> {
    buffer: &'a PixelBuffer,
    tolerance: Tolerance,
    width: usize,
    height: usize,
    visited: &'a mut VisitedMask,
}

impl FloodFill<'_> {
    /// Collect the region containing `seed` into `region` (cleared first).
    ///
    /// `seed` must be background-like and already marked visited.
    fn collect(&mut self, seed: usize, region: &mut Vec<usize>) {
        region.clear();
        region.push(seed);

        let mut head = 0;
        while let Some(&idx) = region.get(head) {
            head += 1;
            let x = idx % self.width;
            let y = idx / self.width;

            if x > 0 {
                self.enqueue(idx - 1, region);
            }
            if x + 1 < self.width {
                self.enqueue(idx + 1, region);
            }
            if y > 0 {
                self.enqueue(idx - self.width, region);
            }
            if y + 1 < self.height {
                self.enqueue(idx + self.width, region);
            }
        }
    }

    /// Queue an in-bounds neighbour if it is unvisited and background-like.
    /// Non-background neighbours stay unvisited.
    #[inline]
    fn enqueue(&mut self, idx: usize, region: &mut Vec<usize>) {
        if !self.visited.is_visited(idx) && self.buffer.is_background_like(idx, self.tolerance) {
            self.visited.mark(idx);
            region.push(idx);
        }
    }
}

/// Flood-fill from each unvisited background-like seed and erase the regions
/// for which `should_erase(region_size)` holds.
fn erase_regions<I, F>(
    buffer: &mut PixelBuffer,
    tolerance: Tolerance,
    seeds: I,
    should_erase: F,
) -> SegmentationStats
where
    I: IntoIterator<Item = usize>,
    F: Fn(usize) -> bool,
{
    let (width, height) = buffer.dimensions();
    let mut visited = VisitedMask::new(buffer.pixel_count());
    let mut region = Vec::new();
    let mut stats = SegmentationStats::default();

    for seed in seeds {
        if visited.is_visited(seed) || !buffer.is_background_like(seed, tolerance) {
            continue;
        }
        visited.mark(seed);

        FloodFill {
            buffer: &*buffer,
            tolerance,
            width: width as usize,
            height: height as usize,
            visited: &mut visited,
        }
        .collect(seed, &mut region);
        stats.regions_found += 1;

        if should_erase(region.len()) {
            for &idx in &region {
                buffer.erase(idx);
            }
            stats.regions_erased += 1;
            stats.pixels_erased += region.len();
        } else {
            trace!(seed, size = region.len(), "Keeping background-like region");
        }
    }

    stats
}

/// Linear indices of the border pixels, each listed once
fn border_indices(width: u32, height: u32) -> impl Iterator<Item = usize> {
    let w = width as usize;
    let h = height as usize;

    let top = 0..w;
    let bottom = (h > 1)
        .then(|| (h - 1) * w..h * w)
        .into_iter()
        .flatten();
    let sides = (1..h.saturating_sub(1)).flat_map(move |y| {
        let left = y * w;
        let right = (w > 1).then_some(y * w + w - 1);
        std::iter::once(left).chain(right)
    });

    top.chain(bottom).chain(sides)
}
