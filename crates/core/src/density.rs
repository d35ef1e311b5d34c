//! Node-count estimation over a precomputed density raster.
//!
//! The raster covers the whole world at one reference zoom level. Each pixel
//! stores a 16-bit element count: the red channel carries the high byte and
//! green the low byte. Counts for other zoom levels are derived on the fly,
//! summing blocks of cells for coarser zooms and subdividing a cell uniformly
//! for finer ones.

use std::cmp::Ordering;
use std::collections::HashSet;

use image::ImageFormat;

use crate::geometry::Geometry;
use crate::tilecover::{self, Tile};

/// Highest zoom the estimator will cover a geometry at.
pub const MAX_ESTIMATE_ZOOM: u8 = 14;

/// The estimator stops refining once a covering has more tiles than this.
pub const MAX_COVERING_TILES: usize = 256;

/// Scale factor from summed raster density to an element count.
pub const NODE_CALIBRATION: f64 = 32.0;

#[derive(Debug, thiserror::Error)]
pub enum DensityError {
    #[error("Failed to decode density raster: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Density raster must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    #[error("Density raster side {0} is not a power of two")]
    NotPowerOfTwo(u32),

    #[error("Density raster has {actual} cells, expected {expected}")]
    CellCount { expected: usize, actual: usize },
}

/// Immutable world density raster.
///
/// Loaded once at startup and shared read-only (behind an `Arc`) by every
/// request that needs an estimate.
#[derive(Debug)]
pub struct DensityRaster {
    zoom: u8,
    side: u32,
    counts: Vec<u16>,
}

impl DensityRaster {
    /// Decode a red/green encoded PNG. The side length fixes the reference
    /// zoom: a 4096px raster is zoom 12.
    pub fn from_png(bytes: &[u8]) -> Result<Self, DensityError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgb8();
        let (width, height) = image.dimensions();
        if width != height {
            return Err(DensityError::NotSquare { width, height });
        }
        let counts = image
            .pixels()
            .map(|p| u16::from_be_bytes([p[0], p[1]]))
            .collect();
        Self::from_counts(width, counts)
    }

    /// Build a raster from row-major counts.
    pub fn from_counts(side: u32, counts: Vec<u16>) -> Result<Self, DensityError> {
        if !side.is_power_of_two() {
            return Err(DensityError::NotPowerOfTwo(side));
        }
        let expected = side as usize * side as usize;
        if counts.len() != expected {
            return Err(DensityError::CellCount {
                expected,
                actual: counts.len(),
            });
        }
        Ok(Self {
            zoom: side.trailing_zeros() as u8,
            side,
            counts,
        })
    }

    pub fn reference_zoom(&self) -> u8 {
        self.zoom
    }

    fn raw(&self, x: u64, y: u64) -> u64 {
        let side = u64::from(self.side);
        if x >= side || y >= side {
            return 0;
        }
        u64::from(self.counts[(y * side + x) as usize])
    }

    /// Estimated element count of tile `(zoom, x, y)`.
    ///
    /// Any zoom is accepted; very fine zooms just approach zero.
    pub fn density_at(&self, zoom: u8, x: u32, y: u32) -> f64 {
        let (x, y) = (u64::from(x), u64::from(y));
        match zoom.cmp(&self.zoom) {
            Ordering::Less => {
                let scale = 1u64 << (self.zoom - zoom);
                let (x0, y0) = (x * scale, y * scale);
                let mut total = 0u64;
                for iy in y0..y0 + scale {
                    for ix in x0..x0 + scale {
                        total += self.raw(ix, iy);
                    }
                }
                total as f64
            }
            Ordering::Equal => self.raw(x, y) as f64,
            Ordering::Greater => {
                let shift = u32::from(zoom - self.zoom);
                let parent = |c: u64| c.checked_shr(shift).unwrap_or(0);
                let scale = 2f64.powi(shift as i32);
                self.raw(parent(x), parent(y)) as f64 / (scale * scale)
            }
        }
    }

    /// Approximate number of elements inside `geometry`.
    ///
    /// Covers the geometry at increasing zoom levels until the covering gets
    /// larger than [`MAX_COVERING_TILES`] or [`MAX_ESTIMATE_ZOOM`] is
    /// reached, then sums the density of that covering.
    pub fn estimate(&self, geometry: &Geometry) -> u64 {
        let covering = estimation_cover(geometry);
        let total: f64 = covering
            .iter()
            .map(|t| self.density_at(t.z, t.x, t.y))
            .sum();
        (total * NODE_CALIBRATION) as u64
    }
}

fn estimation_cover(geometry: &Geometry) -> HashSet<Tile> {
    let mut covering = HashSet::new();
    for zoom in 0..=MAX_ESTIMATE_ZOOM {
        covering = tilecover::cover(geometry, zoom);
        if covering.len() > MAX_COVERING_TILES {
            break;
        }
    }
    covering
}
