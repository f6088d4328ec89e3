//! Winding normalization: exterior rings counter-clockwise (RFC 7946 right-hand rule)

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, Line};

use crate::types::{GeoPoint, GeoRing};
use crate::{Error, Result};

/// Return `ring` with counter-clockwise orientation
///
/// Consecutive duplicate vertices are collapsed first. Fails with
/// [`Error::MalformedGeometry`] when fewer than three distinct vertices
/// remain, the enclosed area is zero, or two edges cross.
pub fn normalize(ring: &GeoRing) -> Result<GeoRing> {
    let ring = dedup_consecutive(ring)?;

    if ring.distinct_vertex_count() < 3 {
        return Err(Error::MalformedGeometry(format!(
            "ring has {} distinct vertices, need at least 3",
            ring.distinct_vertex_count()
        )));
    }

    if let Some((a, b)) = find_crossing(&ring.to_line_string().0) {
        return Err(Error::MalformedGeometry(format!(
            "ring is self-intersecting (edges {a} and {b})"
        )));
    }

    let signed = ring.to_polygon().signed_area();
    if signed == 0.0 || !signed.is_finite() {
        return Err(Error::MalformedGeometry("ring encloses no area".into()));
    }

    if signed > 0.0 {
        Ok(ring)
    } else {
        Ok(ring.reversed())
    }
}

/// True if the ring is already counter-clockwise
pub fn is_ccw(ring: &GeoRing) -> bool {
    ring.to_polygon().signed_area() > 0.0
}

fn dedup_consecutive(ring: &GeoRing) -> Result<GeoRing> {
    let mut points: Vec<GeoPoint> = Vec::with_capacity(ring.len());
    for p in ring.points() {
        if points.last() != Some(p) {
            points.push(*p);
        }
    }
    GeoRing::new(points)
}

/// Index pair of the first two edges that cross, if any
///
/// `points` is a closed ring. Neighbouring edges share an endpoint and only
/// count as crossing when they overlap along a segment (a spike).
pub(crate) fn find_crossing(points: &[Coord<f64>]) -> Option<(usize, usize)> {
    let edges: Vec<Line<f64>> = points
        .windows(2)
        .map(|w| Line::new(w[0], w[1]))
        .collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return Some((i, j)),
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::SinglePoint { .. }) => return Some((i, j)),
            }
        }
    }
    None
}
