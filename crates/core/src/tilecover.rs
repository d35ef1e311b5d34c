//! Geometry to Web Mercator tile covering.
//!
//! Lines are traced with a grid walk over fractional tile coordinates; polygon
//! rings are traced the same way and their interiors filled row by row
//! between boundary crossings.

use std::collections::HashSet;
use std::f64::consts::PI;

use crate::geometry::{Geometry, Position, Ring};

/// Web Mercator latitude limit.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// A slippy-map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }
}

/// Tiles at `zoom` that together cover `geometry`.
pub fn cover(geometry: &Geometry, zoom: u8) -> HashSet<Tile> {
    let mut cover = Cover::new(zoom);
    cover.add_geometry(geometry);
    cover.tiles
}

/// Fractional tile coordinates of a position at `zoom`, clamped to the
/// world so every derived tile index is in `[0, 2^zoom)`.
fn tile_fraction(p: Position, zoom: u8) -> (f64, f64) {
    let n = f64::from(1u32 << zoom);
    let lon = p.lon.clamp(-180.0, 180.0);
    let lat = p.lat.clamp(-MAX_LAT, MAX_LAT);
    let sin = lat.to_radians().sin();
    let x = n * (lon / 360.0 + 0.5);
    let y = n * (0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI);
    let upper = n - 1e-9;
    (x.clamp(0.0, upper), y.clamp(0.0, upper))
}

struct Cover {
    zoom: u8,
    tiles: HashSet<Tile>,
}

impl Cover {
    fn new(zoom: u8) -> Self {
        Self {
            zoom,
            tiles: HashSet::new(),
        }
    }

    fn insert(&mut self, x: i64, y: i64) {
        let n = 1i64 << self.zoom;
        if (0..n).contains(&x) && (0..n).contains(&y) {
            self.tiles.insert(Tile::new(x as u32, y as u32, self.zoom));
        }
    }

    fn add_geometry(&mut self, geometry: &Geometry) {
        match geometry {
            Geometry::Point { coordinates } => self.add_point(*coordinates),
            Geometry::MultiPoint { coordinates } => {
                for p in coordinates {
                    self.add_point(*p);
                }
            }
            Geometry::LineString { coordinates } => {
                self.trace(coordinates, None);
            }
            Geometry::MultiLineString { coordinates } => {
                for line in coordinates {
                    self.trace(line, None);
                }
            }
            Geometry::Polygon { coordinates } => self.add_polygon(coordinates),
            Geometry::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    self.add_polygon(polygon);
                }
            }
            Geometry::GeometryCollection { geometries } => {
                for g in geometries {
                    self.add_geometry(g);
                }
            }
        }
    }

    fn add_point(&mut self, p: Position) {
        let (x, y) = tile_fraction(p, self.zoom);
        self.insert(x.floor() as i64, y.floor() as i64);
    }

    fn add_polygon(&mut self, rings: &[Ring]) {
        let mut crossings: Vec<(i64, i64)> = Vec::new();

        for ring in rings {
            let mut row_changes = Vec::new();
            self.trace(ring, Some(&mut row_changes));

            // Keep a boundary tile as a crossing unless it sits on a local
            // extremum of the ring or repeats the next row.
            let len = row_changes.len();
            for j in 0..len {
                let (_, y) = row_changes[j];
                let (_, prev_y) = row_changes[(j + len - 1) % len];
                let (_, next_y) = row_changes[(j + 1) % len];
                let not_min = y > prev_y || y > next_y;
                let not_max = y < prev_y || y < next_y;
                if not_min && not_max && y != next_y {
                    crossings.push(row_changes[j]);
                }
            }
        }

        crossings.sort_by_key(|&(x, y)| (y, x));
        for pair in crossings.chunks_exact(2) {
            let ((x0, y), (x1, _)) = (pair[0], pair[1]);
            for x in (x0 + 1)..x1 {
                self.insert(x, y);
            }
        }
    }

    /// Walk every tile touched by the polyline. When `rows` is given, also
    /// record each tile at which the walk enters a new row.
    fn trace(&mut self, coords: &[Position], mut rows: Option<&mut Vec<(i64, i64)>>) {
        let mut prev: Option<(i64, i64)> = None;

        if coords.len() == 1 {
            self.add_point(coords[0]);
            return;
        }

        for segment in coords.windows(2) {
            let (x0, y0) = tile_fraction(segment[0], self.zoom);
            let (x1, y1) = tile_fraction(segment[1], self.zoom);
            let (dx, dy) = (x1 - x0, y1 - y0);
            if dx == 0.0 && dy == 0.0 {
                continue;
            }

            let sx: i64 = if dx > 0.0 { 1 } else { -1 };
            let sy: i64 = if dy > 0.0 { 1 } else { -1 };
            let mut x = x0.floor() as i64;
            let mut y = y0.floor() as i64;

            let edge_x = if dx > 0.0 { 1.0 } else { 0.0 };
            let edge_y = if dy > 0.0 { 1.0 } else { 0.0 };
            let mut t_max_x = if dx == 0.0 {
                f64::INFINITY
            } else {
                ((edge_x + x as f64 - x0) / dx).abs()
            };
            let mut t_max_y = if dy == 0.0 {
                f64::INFINITY
            } else {
                ((edge_y + y as f64 - y0) / dy).abs()
            };
            let t_dx = (1.0 / dx).abs();
            let t_dy = (1.0 / dy).abs();

            if prev != Some((x, y)) {
                self.visit(x, y, &mut prev, rows.as_deref_mut());
            }

            while t_max_x < 1.0 || t_max_y < 1.0 {
                if t_max_x < t_max_y {
                    t_max_x += t_dx;
                    x += sx;
                } else {
                    t_max_y += t_dy;
                    y += sy;
                }
                self.visit(x, y, &mut prev, rows.as_deref_mut());
            }
        }

        // A closed ring ends on the row it started on; drop the duplicate.
        if let (Some(rows), Some((_, last_y))) = (rows, prev) {
            if rows.first().is_some_and(|&(_, first_y)| first_y == last_y) {
                rows.pop();
            }
        }
    }

    fn visit(
        &mut self,
        x: i64,
        y: i64,
        prev: &mut Option<(i64, i64)>,
        rows: Option<&mut Vec<(i64, i64)>>,
    ) {
        self.insert(x, y);
        if let Some(rows) = rows {
            if prev.map(|(_, py)| py) != Some(y) {
                rows.push((x, y));
            }
        }
        *prev = Some((x, y));
    }
}
