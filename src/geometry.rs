use crate::vec2::Vec2;

pub(crate) const EPSILON: f64 = 1e-12;

/// Cramer's rule for 2x2 system; `None` when |det| is within `$tol`
macro_rules! cramer2x2 {
    ($tol:expr; $a11:expr, $a12:expr, $c1:expr, $a21:expr, $a22:expr, $c2:expr) => {{
        let det = ($a11) * ($a22) - ($a12) * ($a21);
        if det.abs() <= $tol {
            None
        } else {
            Some((
                (($c1) * ($a22) - ($c2) * ($a12)) / det,
                (($c2) * ($a11) - ($c1) * ($a21)) / det,
            ))
        }
    }};
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Circumcircle {
    pub(crate) center: Vec2,
    pub(crate) radius_squared: f64,
}

/// Twice the signed area of triangle (a, b, c); positive when counter-clockwise
pub(crate) fn signed_area2(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b - a).cross(c - a)
}

pub(crate) fn area(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    signed_area2(a, b, c) * 0.5
}

pub(crate) fn centroid(a: Vec2, b: Vec2, c: Vec2) -> Vec2 {
    (a + b + c) * (1.0 / 3.0)
}

/// Circle through three points, by intersecting two perpendicular bisectors
///
/// Returns `None` when the points are collinear.
pub(crate) fn circumcircle(a: Vec2, b: Vec2, c: Vec2) -> Option<Circumcircle> {
    //   { (o.x - A.x)^2 + (o.y - A.y)^2 = r^2
    //   { (o.x - B.x)^2 + (o.y - B.y)^2 = r^2
    //   { (o.x - C.x)^2 + (o.y - C.y)^2 = r^2
    //
    //   { o.x 2 (A.x - B.x) + o.y 2 (A.y - B.y) = |A|^2 - |B|^2
    //   { o.x 2 (B.x - C.x) + o.y 2 (B.y - C.y) = |B|^2 - |C|^2
    //
    // The system is solved relative to A to keep the magnitudes small.
    let b = b - a;
    let c = c - a;
    let scale = b.length_squared().max(c.length_squared());
    if scale == 0. || b.cross(c).abs() <= EPSILON * scale {
        return None;
    }
    let (x, y) = cramer2x2!(
        0.0;
        b.x * 2.0,
        b.y * 2.0,
        b.length_squared(),
        c.x * 2.0,
        c.y * 2.0,
        c.length_squared()
    )?;
    let offset = Vec2::new(x, y);
    Some(Circumcircle {
        center: a + offset,
        radius_squared: offset.length_squared(),
    })
}

/// Circumcircle, or for a degenerate triangle a circle at its centroid that contains everything
pub(crate) fn circumcircle_or_centroid(a: Vec2, b: Vec2, c: Vec2) -> Circumcircle {
    circumcircle(a, b, c).unwrap_or_else(|| Circumcircle {
        center: centroid(a, b, c),
        radius_squared: f64::MAX,
    })
}

/// Parameters at which two infinite lines cross
///
/// ```text
///       a1
///      /
/// b1__/_______ b2
///    /
///   a2
///
/// { c = a1 + (a2 - a1) * d1
/// { c = b1 + (b2 - b1) * d2
///
///  { (ax2 - ax1) d1  +  (bx1 - bx2) d2  =  bx1 - ax1
///  { (ay2 - ay1) d1  +  (by1 - by2) d2  =  by1 - ay1
/// ```
///
/// Returns `None` for parallel lines. The tolerance scales with both
/// segment lengths so the answer does not depend on the units.
pub(crate) fn lines_cross_args(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<(f64, f64)> {
    let aa1 = a2.x - a1.x;
    let bb1 = b1.x - b2.x;
    let aa2 = a2.y - a1.y;
    let bb2 = b1.y - b2.y;
    let cc1 = b1.x - a1.x;
    let cc2 = b1.y - a1.y;
    let tol = EPSILON * (a2 - a1).length() * (b2 - b1).length();
    cramer2x2!(tol; aa1, bb1, cc1, aa2, bb2, cc2)
}

/// True when the open segments (a1, a2) and (b1, b2) cross at an interior point of both
pub(crate) fn segments_cross(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    match lines_cross_args(a1, a2, b1, b2) {
        Some((s, t)) => s > EPSILON && s < 1. - EPSILON && t > EPSILON && t < 1. - EPSILON,
        None => false,
    }
}

/// Shoelace area of a closed loop; positive for counter-clockwise loops
pub(crate) fn loop_area(points: &[Vec2]) -> f64 {
    let Some(&last) = points.last() else {
        return 0.;
    };
    let mut prev = last;
    let mut sum = 0.;
    for &pt in points {
        sum += prev.cross(pt);
        prev = pt;
    }
    sum * 0.5
}

/// Number of loop edges crossed by a ray cast from `point` towards -x
///
/// An odd count means the point is inside the loop.
pub(crate) fn evenodd_count(point: Vec2, points: &[Vec2]) -> usize {
    let Some(&last) = points.last() else {
        return 0;
    };
    let mut counter = 0;
    let mut prev = last;
    for &pt in points {
        let (u, b) = if pt.y > prev.y { (pt, prev) } else { (prev, pt) };
        //            u
        //      edge /
        //          / <-- dx --> .
        //         /            point
        //        b
        if point.y <= u.y && point.y > b.y {
            let dy = u.y - b.y;
            let dx = point.x - (point.y - b.y) / dy * (u.x - b.x) - b.x;
            if dx >= 0. {
                counter += 1;
            }
        }
        prev = pt;
    }
    counter
}
