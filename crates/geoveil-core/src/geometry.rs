//! Metric geometry: area, inward offset and simplification in projected meters

use cavalier_contours::polyline::{
    seg_arc_radius_and_center, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};
use geo::{Area, Coord, LineString, Polygon, SimplifyVwPreserve};

use crate::projection::ProjectedRing;
use crate::winding::find_crossing;
use crate::{Error, PipelineConfig, Result};

const SQ_METERS_PER_HECTARE: f64 = 10_000.0;

/// Largest gap, in meters, between an offset arc and the chords replacing it
const ARC_SAGITTA_M: f64 = 0.01;

/// Area of a projected ring in hectares, rounded to 6 decimal places
pub fn area_hectares(ring: &ProjectedRing) -> Result<f64> {
    if ring.len() < 4 {
        return Err(Error::GeometryError(format!("ring has only {} points", ring.len())));
    }
    if find_crossing(&ring.coords).is_some() {
        return Err(Error::GeometryError("projected ring is not simple".into()));
    }
    let sq_m = to_polygon(ring).unsigned_area();
    if !sq_m.is_finite() {
        return Err(Error::GeometryError("area is not finite".into()));
    }
    Ok(round6(sq_m / SQ_METERS_PER_HECTARE))
}

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Move every edge of a counter-clockwise ring `distance` meters inward
///
/// Concave corners are joined by arcs in the offset. Each arc is replaced by
/// points on it spaced so the chords stay within [`ARC_SAGITTA_M`] of the
/// arc. A result that is empty, splits into several pieces, or has no area
/// is reported as [`Error::ShrinkCollapsed`].
pub fn shrink(ring: &ProjectedRing, distance: f64) -> Result<ProjectedRing> {
    if distance == 0.0 {
        return Ok(ring.clone());
    }

    let original_area = to_polygon(ring).signed_area();
    if original_area <= 0.0 {
        return Err(Error::GeometryError("shrink expects a counter-clockwise ring".into()));
    }

    let mut pline: Polyline<f64> = Polyline::new();
    for c in &ring.coords[..ring.coords.len() - 1] {
        pline.add(c.x, c.y, 0.0);
    }
    pline.set_is_closed(true);

    let mut pieces = pline.parallel_offset(distance);
    if pieces.len() != 1 {
        tracing::debug!(pieces = pieces.len(), distance, "offset did not yield a single ring");
        return Err(Error::ShrinkCollapsed { distance });
    }
    let piece = pieces.remove(0);

    let shrunk_area = piece.area();
    if !(shrunk_area > 0.0) || piece.vertex_count() < 3 {
        return Err(Error::ShrinkCollapsed { distance });
    }
    if shrunk_area >= original_area {
        return Err(Error::GeometryError(format!(
            "offset by {distance} m did not reduce the area"
        )));
    }

    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(piece.vertex_count() + 1);
    for (v1, v2) in piece.iter_segments() {
        coords.push(Coord { x: v1.x, y: v1.y });
        if !v1.bulge_is_zero() {
            densify_arc(v1, v2, &mut coords);
        }
    }
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }

    Ok(ProjectedRing {
        zone: ring.zone,
        coords,
    })
}

/// Push the interior points of the arc from `v1` to `v2`
fn densify_arc(v1: PlineVertex<f64>, v2: PlineVertex<f64>, out: &mut Vec<Coord<f64>>) {
    let (radius, center) = seg_arc_radius_and_center(v1, v2);
    // bulge = tan(sweep / 4), signed counter-clockwise
    let sweep = 4.0 * v1.bulge.atan();
    let max_step = if radius > ARC_SAGITTA_M {
        2.0 * (1.0 - ARC_SAGITTA_M / radius).acos()
    } else {
        std::f64::consts::FRAC_PI_2
    };
    let steps = (sweep.abs() / max_step).ceil().max(1.0) as usize;
    let start = (v1.y - center.y).atan2(v1.x - center.x);

    for k in 1..steps {
        let a = start + sweep * k as f64 / steps as f64;
        out.push(Coord {
            x: center.x + radius * a.cos(),
            y: center.y + radius * a.sin(),
        });
    }
}

/// Escalating-tolerance simplification settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifyOptions {
    /// Cap on closed-ring points
    pub max_points: usize,
    /// First tolerance tried, in meters
    pub initial_tolerance: f64,
    /// Multiplier applied after each pass that misses the cap
    pub growth: f64,
    /// Number of escalations before giving up
    pub max_retries: u32,
}

impl From<&PipelineConfig> for SimplifyOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_points: config.max_points,
            initial_tolerance: config.initial_tolerance,
            growth: config.tolerance_growth,
            max_retries: config.max_simplify_retries,
        }
    }
}

/// Reduce a ring to at most `opts.max_points` points without introducing
/// self-intersections
///
/// Uses topology-preserving Visvalingam-Whyatt. Tolerances are lengths; the
/// area threshold handed to the algorithm is the tolerance squared. Rings
/// already within the cap come back unchanged.
pub fn simplify(ring: &ProjectedRing, opts: &SimplifyOptions) -> Result<ProjectedRing> {
    if ring.len() <= opts.max_points {
        return Ok(ring.clone());
    }

    let polygon = to_polygon(ring);
    let mut tolerance = opts.initial_tolerance;
    let mut last_count = ring.len();

    for attempt in 0..=opts.max_retries {
        let simplified = polygon.simplify_vw_preserve(&(tolerance * tolerance));
        let exterior = simplified.exterior();
        last_count = exterior.0.len();

        if last_count <= opts.max_points {
            if last_count < 4 {
                return Err(Error::GeometryError(format!(
                    "simplification collapsed the ring to {last_count} points"
                )));
            }
            tracing::debug!(attempt, tolerance, points = last_count, "ring simplified");
            return Ok(ProjectedRing {
                zone: ring.zone,
                coords: exterior.0.clone(),
            });
        }
        tolerance *= opts.growth;
    }

    Err(Error::SimplifyDidNotConverge {
        max_points: opts.max_points,
        retries: opts.max_retries,
        last_count,
    })
}

fn to_polygon(ring: &ProjectedRing) -> Polygon<f64> {
    Polygon::new(LineString::new(ring.coords.clone()), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{Hemisphere, UtmZone};
    use std::f64::consts::PI;

    const ZONE: UtmZone = UtmZone { zone: 31, hemisphere: Hemisphere::North };

    fn ring(coords: &[(f64, f64)]) -> ProjectedRing {
        let mut coords: Vec<Coord<f64>> = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
        coords.push(coords[0]);
        ProjectedRing { zone: ZONE, coords }
    }

    fn square(side: f64) -> ProjectedRing {
        ring(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)])
    }

    fn circle(n: usize, radius: f64) -> ProjectedRing {
        let pts: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / n as f64;
                (radius * a.cos(), radius * a.sin())
            })
            .collect();
        ring(&pts)
    }

    fn opts(max_points: usize, max_retries: u32) -> SimplifyOptions {
        SimplifyOptions {
            max_points,
            initial_tolerance: 0.01,
            growth: 1.5,
            max_retries,
        }
    }

    #[test]
    fn test_area_hectares() {
        assert_eq!(area_hectares(&square(100.0)).unwrap(), 1.0);
        assert_eq!(area_hectares(&square(1000.0)).unwrap(), 100.0);
        // 1/3 ha rounds at the sixth decimal
        let r = ring(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0 / 3.0), (0.0, 100.0 / 3.0)]);
        assert_eq!(area_hectares(&r).unwrap(), 0.333333);
    }

    #[test]
    fn test_area_rejects_bowtie() {
        let bowtie = ring(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        assert!(matches!(area_hectares(&bowtie), Err(Error::GeometryError(_))));
    }

    #[test]
    fn test_shrink_square() {
        let original = square(1000.0);
        let shrunk = shrink(&original, 10.0).unwrap();
        assert_eq!(shrunk.coords.first(), shrunk.coords.last());

        let area = to_polygon(&shrunk).unsigned_area();
        assert!((area - 980.0 * 980.0).abs() < 1.0, "area {area}");

        for c in &shrunk.coords {
            assert!(c.x >= 10.0 - 1e-6 && c.x <= 990.0 + 1e-6);
            assert!(c.y >= 10.0 - 1e-6 && c.y <= 990.0 + 1e-6);
        }
    }

    #[test]
    fn test_shrink_decreases_area_of_convex_polygon() {
        let original = circle(36, 500.0);
        let before = to_polygon(&original).unsigned_area();
        let after = to_polygon(&shrink(&original, 10.0).unwrap()).unsigned_area();
        assert!(after < before);
    }

    #[test]
    fn test_shrink_concave_polygon_stays_single() {
        let l_shape = ring(&[
            (0.0, 0.0),
            (200.0, 0.0),
            (200.0, 100.0),
            (100.0, 100.0),
            (100.0, 200.0),
            (0.0, 200.0),
        ]);
        let shrunk = shrink(&l_shape, 10.0).unwrap();
        assert!(to_polygon(&shrunk).unsigned_area() < to_polygon(&l_shape).unsigned_area());
    }

    fn distance_to_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len2 = dx * dx + dy * dy;
        let t = if len2 == 0.0 {
            0.0
        } else {
            (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
        };
        ((p.x - a.x - t * dx).powi(2) + (p.y - a.y - t * dy).powi(2)).sqrt()
    }

    fn distance_to_ring(p: Coord<f64>, ring: &ProjectedRing) -> f64 {
        ring.coords
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_shrink_keeps_distance_at_concave_corner() {
        let l_shape = ring(&[
            (0.0, 0.0),
            (200.0, 0.0),
            (200.0, 100.0),
            (100.0, 100.0),
            (100.0, 200.0),
            (0.0, 200.0),
        ]);
        let shrunk = shrink(&l_shape, 10.0).unwrap();

        let d = distance_to_ring(Coord { x: 100.0, y: 100.0 }, &shrunk);
        assert!(d >= 10.0 - 2.0 * ARC_SAGITTA_M, "corner distance {d}");
        assert!(d <= 10.0 + 1e-6, "corner distance {d}");
        // The quarter-circle join is densified, not a single chord
        assert!(shrunk.len() > 8, "{} points", shrunk.len());
        assert!(find_crossing(&shrunk.coords).is_none());
    }

    #[test]
    fn test_shrink_collapse() {
        let tiny = square(15.0);
        assert!(matches!(shrink(&tiny, 10.0), Err(Error::ShrinkCollapsed { .. })));
    }

    #[test]
    fn test_shrink_zero_distance_is_identity() {
        let original = square(50.0);
        assert_eq!(shrink(&original, 0.0).unwrap(), original);
    }

    #[test]
    fn test_simplify_within_cap_is_identity() {
        let original = square(100.0);
        assert_eq!(simplify(&original, &opts(20, 60)).unwrap(), original);
    }

    #[test]
    fn test_simplify_reaches_cap() {
        let original = circle(200, 1000.0);
        let simplified = simplify(&original, &opts(20, 60)).unwrap();
        assert!(simplified.len() <= 20);
        assert!(simplified.len() >= 4);
        assert_eq!(simplified.coords.first(), simplified.coords.last());
        assert!(find_crossing(&simplified.coords).is_none());
    }

    #[test]
    fn test_simplify_gives_up_after_retry_bound() {
        let original = circle(200, 1000.0);
        let err = simplify(&original, &opts(20, 0)).unwrap_err();
        assert!(matches!(
            err,
            Error::SimplifyDidNotConverge { max_points: 20, retries: 0, .. }
        ));
    }
}
