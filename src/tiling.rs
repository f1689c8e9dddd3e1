//! Bounding-box partitioning ("chunking").
//!
//! Large areas are split into a grid of tiles so each Overpass query stays
//! within the server's size and timeout budget.

use tracing::debug;

use crate::error::{DetectiveError, Result};
use crate::models::GeoArea;

/// Areas at or below this many square degrees are queried in one request.
pub const SINGLE_QUERY_AREA: f64 = 1.0;

/// Default upper bound on tiles per investigation.
pub const DEFAULT_MAX_TILES: usize = 16;

const ASPECT_EPSILON: f64 = 1e-9;

/// Grid partitioner with a configurable single-query threshold.
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    single_query_area: f64,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self {
            single_query_area: SINGLE_QUERY_AREA,
        }
    }
}

impl Partitioner {
    pub fn new(single_query_area: f64) -> Result<Self> {
        if !single_query_area.is_finite() || single_query_area <= 0.0 {
            return Err(DetectiveError::InvalidArea(format!(
                "single-query threshold must be positive, got {}",
                single_query_area
            )));
        }
        Ok(Self { single_query_area })
    }

    pub fn single_query_area(&self) -> f64 {
        self.single_query_area
    }

    /// Split `area` into at most `max_tiles` tiles.
    ///
    /// Returns the area itself when it is small enough for one query. Tiles
    /// are ordered row by row from the south-west corner, and adjacent tiles
    /// share bit-identical edge coordinates.
    pub fn partition(&self, area: &GeoArea, max_tiles: usize) -> Result<Vec<GeoArea>> {
        if max_tiles < 1 {
            return Err(DetectiveError::InvalidArea(
                "max_tiles must be at least 1".to_string(),
            ));
        }
        let extent = area.extent();
        if extent <= 0.0 {
            return Err(DetectiveError::InvalidArea(format!(
                "area {} has zero extent",
                area
            )));
        }

        if extent <= self.single_query_area {
            return Ok(vec![*area]);
        }

        let wanted = ((extent / self.single_query_area).ceil() as usize).min(max_tiles);
        let (rows, cols) = choose_grid(area.lat_span(), area.lon_span(), wanted, max_tiles);

        debug!(
            "Partitioning {} ({:.2} sq deg) into {}x{} tiles",
            area, extent, rows, cols
        );

        let lat_edges = edges(area.south(), area.north(), rows);
        let lon_edges = edges(area.west(), area.east(), cols);
        if lat_edges.len() - 1 < rows || lon_edges.len() - 1 < cols {
            debug!(
                "Span of {} too narrow for {}x{}; using {}x{}",
                area,
                rows,
                cols,
                lat_edges.len() - 1,
                lon_edges.len() - 1
            );
        }

        let mut tiles = Vec::with_capacity(rows * cols);
        for lat in lat_edges.windows(2) {
            for lon in lon_edges.windows(2) {
                tiles.push(GeoArea::new(lat[0], lon[0], lat[1], lon[1])?);
            }
        }
        Ok(tiles)
    }
}

/// Partition with the default single-query threshold.
pub fn partition(area: &GeoArea, max_tiles: usize) -> Result<Vec<GeoArea>> {
    Partitioner::default().partition(area, max_tiles)
}

/// Pick rows x cols with `wanted <= rows * cols <= max_tiles` whose tiles are
/// closest to square. Among equally square grids the one with fewer tiles
/// wins, and only then the one with more rows, so a square area needing 5
/// tiles gets 3x3 rather than 4x4.
///
/// The short side of any allowed grid is at most `sqrt(max_tiles)`, and with
/// one side fixed the skew only grows away from the ideal length of the
/// other, so a few candidates per short side cover every grid.
fn choose_grid(lat_span: f64, lon_span: f64, wanted: usize, max_tiles: usize) -> (usize, usize) {
    let mut best: Option<(f64, usize, usize)> = None;
    let mut consider = |rows: usize, cols: usize| {
        let count = rows * cols;
        // |ln(tile_height / tile_width)|, zero for a perfect square
        let skew = ((lat_span / rows as f64) / (lon_span / cols as f64)).ln().abs();

        let better = match best {
            None => true,
            Some((best_skew, best_rows, best_cols)) => {
                if skew < best_skew - ASPECT_EPSILON {
                    true
                } else if skew > best_skew + ASPECT_EPSILON {
                    false
                } else {
                    let best_count = best_rows * best_cols;
                    count < best_count || (count == best_count && rows > best_rows)
                }
            }
        };
        if better {
            best = Some((skew, rows, cols));
        }
    };

    let mut short = 1;
    while short <= max_tiles / short {
        for cols in side_candidates(short, lon_span / lat_span, wanted, max_tiles)
            .into_iter()
            .flatten()
        {
            consider(short, cols);
        }
        for rows in side_candidates(short, lat_span / lon_span, wanted, max_tiles)
            .into_iter()
            .flatten()
        {
            consider(rows, short);
        }
        short += 1;
    }

    best.map(|(_, rows, cols)| (rows, cols)).unwrap_or((1, 1))
}

/// Lengths worth trying for the other side of a grid whose one side is
/// `fixed`: the fewest that reach `wanted` tiles and the two either side of
/// `fixed * ratio`, all within the budget. `None` when no length fits.
fn side_candidates(fixed: usize, ratio: f64, wanted: usize, max_tiles: usize) -> Option<[usize; 3]> {
    let fewest = wanted.div_ceil(fixed).max(1);
    let most = max_tiles / fixed;
    if fewest > most {
        return None;
    }
    let ideal = fixed as f64 * ratio;
    let within = |length: f64| (length.max(1.0) as usize).clamp(fewest, most);
    Some([fewest, within(ideal.floor()), within(ideal.ceil())])
}

/// Edge coordinates from `start` to `end` splitting the span into at most
/// `parts` pieces. The outer edges are the inputs themselves, never
/// recomputed. Edges that round onto their neighbour are dropped, so a span
/// only a few ULPs wide yields fewer pieces instead of empty ones.
fn edges(start: f64, end: f64, parts: usize) -> Vec<f64> {
    let step = (end - start) / parts as f64;
    let mut edges: Vec<f64> = (0..=parts)
        .map(|i| match i {
            0 => start,
            i if i == parts => end,
            i => (start + step * i as f64).min(end),
        })
        .collect();
    edges.dedup();
    edges
}
