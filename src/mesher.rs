use std::{collections::HashMap, ops::Range};

use tracing::{debug, trace, warn};

use crate::{
    config::GridConfig,
    geometry::{self, Circumcircle},
    grid::GridError,
    vec2::Vec2,
};

/// Where a point's position comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Parents {
    /// Supplied by the caller
    Boundary,
    /// One of the four points of the initial quadrilateral
    Hull,
    /// Centroid of the three vertices of the triangle it was proposed in
    Field([usize; 3]),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Point {
    pub(crate) pos: Vec2,
    /// Target edge length around this point
    pub(crate) spacing: f64,
    pub(crate) parents: Parents,
}

/// What lies across one side of a triangle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Neighbor {
    /// Not linked yet, or the outer side of the hull
    Unset,
    /// A recovered boundary edge; the other side is not part of the mesh
    Boundary,
    Triangle(usize),
}

/// Counter-clockwise triangle; `t[i]` lies across the side opposite `p[i]`
///
/// A negative `cc.radius_squared` marks a deleted slot waiting to be reused.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Triangle {
    pub(crate) p: [usize; 3],
    pub(crate) t: [Neighbor; 3],
    pub(crate) cc: Circumcircle,
}

impl Triangle {
    pub(crate) fn is_deleted(&self) -> bool {
        self.cc.radius_squared < 0.
    }

    /// Directed side opposite `p[i]`
    pub(crate) fn edge(&self, i: usize) -> (usize, usize) {
        (self.p[(i + 1) % 3], self.p[(i + 2) % 3])
    }

    /// Index of the side running from `a` to `b`
    pub(crate) fn side_of(&self, a: usize, b: usize) -> Option<usize> {
        (0..3).find(|&i| self.edge(i) == (a, b))
    }

    pub(crate) fn index_of(&self, v: usize) -> Option<usize> {
        self.p.iter().position(|&p| p == v)
    }

    pub(crate) fn has_vertex(&self, v: usize) -> bool {
        self.p.contains(&v)
    }
}

/// Working state of one grid generation
pub(crate) struct Mesher {
    pub(crate) points: Vec<Point>,
    pub(crate) triangles: Vec<Triangle>,
    /// Deleted triangle slots available for reuse
    pub(crate) free: Vec<usize>,
    /// The first `nbnd` points are boundary points
    pub(crate) nbnd: usize,
    /// Point range of every boundary loop
    pub(crate) loops: Vec<Range<usize>>,
    pub(crate) config: GridConfig,
}

impl Mesher {
    /// Loads the boundary, estimates spacing and builds the two seed triangles
    pub(crate) fn new(
        boundary: &[[f64; 2]],
        loop_sizes: &[usize],
        config: GridConfig,
    ) -> Result<Self, GridError> {
        let nbnd = boundary.len();
        if nbnd < 3 {
            return Err(GridError::NumberOfPointMismatch {
                expected: 3,
                found: nbnd,
            });
        }
        let total: usize = loop_sizes.iter().sum();
        if total != nbnd {
            return Err(GridError::NumberOfPointMismatch {
                expected: nbnd,
                found: total,
            });
        }
        if let Some(&size) = loop_sizes.iter().find(|&&size| size < 3) {
            return Err(GridError::NumberOfPointMismatch {
                expected: 3,
                found: size,
            });
        }

        let mut points: Vec<Point> = Vec::new();
        points
            .try_reserve(nbnd * 4 + 4)
            .map_err(|_| GridError::MallocError)?;
        let mut triangles: Vec<Triangle> = Vec::new();
        triangles
            .try_reserve(nbnd * 8 + 2)
            .map_err(|_| GridError::MallocError)?;

        for &uv in boundary {
            points.push(Point {
                pos: uv.into(),
                spacing: 0.,
                parents: Parents::Boundary,
            });
        }

        // Every boundary point gets half of each incident loop edge
        let mut loops = Vec::with_capacity(loop_sizes.len());
        let mut start = 0;
        for &size in loop_sizes {
            let range = start..start + size;
            let mut prev = range.end - 1;
            for i in range.clone() {
                let half = points[prev].pos.distance(points[i].pos) * 0.5;
                points[prev].spacing += half;
                points[i].spacing += half;
                prev = i;
            }
            loops.push(range);
            start += size;
        }

        let mut mesher = Self {
            points,
            triangles,
            free: Vec::new(),
            nbnd,
            loops,
            config,
        };
        mesher.create_hull()?;
        Ok(mesher)
    }

    /// Surrounds the boundary with a right trapezoid split into two triangles
    ///
    /// ```text
    ///  h3 ________ h2
    ///    |      / \
    ///    |    /     \
    ///    |  /         \
    ///    |/____________\
    ///  h0               h1
    /// ```
    ///
    /// The slanted right side keeps the four points off a common circle, so
    /// the diagonal h0-h2 is the only Delaunay split.
    fn create_hull(&mut self) -> Result<(), GridError> {
        let boundary = &self.points[..self.nbnd];
        let mut min = boundary[0].pos;
        let mut max = boundary[0].pos;
        for pt in boundary {
            min.x = min.x.min(pt.pos.x);
            min.y = min.y.min(pt.pos.y);
            max.x = max.x.max(pt.pos.x);
            max.y = max.y.max(pt.pos.y);
        }
        let extent = max - min;
        let mut size = extent.x.max(extent.y);
        if size <= 0. {
            size = 1.;
        }
        let spacing = self.config.hull_spacing_factor * extent.length().max(size);

        let hull = [
            Vec2::new(min.x - size, min.y - size * 1.5),
            Vec2::new(max.x + size * 2., min.y - size * 1.5),
            Vec2::new(max.x + size, max.y + size),
            Vec2::new(min.x - size, max.y + size),
        ];
        let base = self.points.len();
        for pos in hull {
            self.push_point(Point {
                pos,
                spacing,
                parents: Parents::Hull,
            })?;
        }
        let t0 = self.create_triangle([base, base + 1, base + 2])?;
        let t1 = self.create_triangle([base, base + 2, base + 3])?;
        self.triangles[t0].t[1] = Neighbor::Triangle(t1);
        self.triangles[t1].t[2] = Neighbor::Triangle(t0);
        Ok(())
    }

    /// Runs the whole pipeline, leaving a compacted mesh behind
    pub(crate) fn process(&mut self) -> Result<(), GridError> {
        let mut skipped = 0;
        for ip in 0..self.nbnd {
            if !self.insert_point(ip)? {
                skipped += 1;
            }
        }
        debug!(
            points = self.nbnd,
            skipped,
            triangles = self.live_triangles(),
            "boundary inserted"
        );

        if self.config.refine {
            self.refine()?;
        }

        self.recover_boundary()?;
        self.mark_exterior()?;
        if self.config.optimize {
            self.optimize()?;
        }
        self.compact();
        debug!(
            points = self.points.len(),
            triangles = self.triangles.len(),
            "grid generated"
        );
        Ok(())
    }

    pub(crate) fn live_triangles(&self) -> usize {
        self.triangles.iter().filter(|t| !t.is_deleted()).count()
    }

    pub(crate) fn point(&self, index: usize) -> Result<Vec2, GridError> {
        self.points
            .get(index)
            .map(|pt| pt.pos)
            .ok_or(GridError::BadPointIndex {
                index,
                count: self.points.len(),
            })
    }

    pub(crate) fn triangle(&self, index: usize) -> Result<&Triangle, GridError> {
        self.triangles.get(index).ok_or(GridError::BadTriangleIndex {
            index,
            count: self.triangles.len(),
        })
    }

    /// Whether segment (p0, p1) crosses segment (p2, p3) away from their endpoints
    pub(crate) fn intersect(
        &self,
        p0: usize,
        p1: usize,
        p2: usize,
        p3: usize,
    ) -> Result<bool, GridError> {
        Ok(geometry::segments_cross(
            self.point(p0)?,
            self.point(p1)?,
            self.point(p2)?,
            self.point(p3)?,
        ))
    }

    pub(crate) fn push_point(&mut self, point: Point) -> Result<usize, GridError> {
        self.points
            .try_reserve(1)
            .map_err(|_| GridError::MallocError)?;
        self.points.push(point);
        Ok(self.points.len() - 1)
    }

    pub(crate) fn circumcircle_of(&self, p: [usize; 3]) -> Circumcircle {
        let [a, b, c] = p.map(|i| self.points[i].pos);
        geometry::circumcircle_or_centroid(a, b, c)
    }

    /// Stores a new triangle in the first free slot; neighbors are left unset
    pub(crate) fn create_triangle(&mut self, p: [usize; 3]) -> Result<usize, GridError> {
        let triangle = Triangle {
            p,
            t: [Neighbor::Unset; 3],
            cc: self.circumcircle_of(p),
        };
        if let Some(slot) = self.free.pop() {
            self.triangles[slot] = triangle;
            return Ok(slot);
        }
        self.triangles
            .try_reserve(1)
            .map_err(|_| GridError::MallocError)?;
        self.triangles.push(triangle);
        Ok(self.triangles.len() - 1)
    }

    pub(crate) fn delete_triangle(&mut self, index: usize) {
        let triangle = &mut self.triangles[index];
        if triangle.is_deleted() {
            return;
        }
        triangle.cc.radius_squared = -1.;
        self.free.push(index);
    }

    /// Bowyer-Watson insertion of an existing point
    ///
    /// The cavity grows from the triangle holding the point across every
    /// side whose far triangle has the point strictly inside its
    /// circumcircle. It then shrinks until each side of its outline has the
    /// point on its left and every vertex of the cavity lies on its outline,
    /// so the fan of new triangles neither folds over nor swallows a point.
    /// Returns `false` when the point lands on an existing vertex or edge
    /// it cannot be joined to.
    pub(crate) fn insert_point(&mut self, ip: usize) -> Result<bool, GridError> {
        let pos = self.point(ip)?;
        let Some(seed) = self.locate(pos) else {
            warn!(point = ip, "no triangle to insert into");
            return Ok(false);
        };

        let mut cavity = self.flood(seed, |tj| {
            let cc = self.triangles[tj].cc;
            pos.distance_squared(cc.center) < cc.radius_squared
        });
        let outline = loop {
            let outline = self.outline(&cavity);
            let mut folded: Vec<usize> = outline
                .iter()
                .filter(|side| {
                    let [a, b] = [side.a, side.b].map(|i| self.points[i].pos);
                    geometry::signed_area2(a, b, pos) <= 0.
                })
                .map(|side| side.owner)
                .collect();
            folded.extend(cavity.iter().copied().filter(|&ti| {
                ti != seed
                    && self.triangles[ti]
                        .p
                        .iter()
                        .any(|v| !outline.iter().any(|side| side.a == *v))
            }));
            if folded.is_empty() {
                break outline;
            }
            if folded.contains(&seed) {
                warn!(point = ip, "point cannot be joined to its triangle, skipped");
                return Ok(false);
            }
            cavity.retain(|t| !folded.contains(t));
            cavity = self.flood(seed, |tj| cavity.contains(&tj));
        };

        for &ti in &cavity {
            self.delete_triangle(ti);
        }
        let mut fan = Vec::with_capacity(outline.len());
        for side in &outline {
            let nt = self.create_triangle([side.a, side.b, ip])?;
            self.triangles[nt].t[2] = side.outer;
            self.relink(side.outer, side.b, side.a, nt);
            fan.push((side.a, nt));
        }
        let starts: HashMap<usize, usize> = fan.iter().copied().collect();
        for (side, &(_, nt)) in outline.iter().zip(&fan) {
            if let Some(&next) = starts.get(&side.b) {
                self.triangles[nt].t[0] = Neighbor::Triangle(next);
                self.triangles[next].t[1] = Neighbor::Triangle(nt);
            }
        }
        Ok(true)
    }

    /// Live triangle containing `pos`, or failing that the one it lies least outside of
    fn locate(&self, pos: Vec2) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (ti, triangle) in self.triangles.iter().enumerate() {
            if triangle.is_deleted() {
                continue;
            }
            let [a, b, c] = triangle.p.map(|i| self.points[i].pos);
            let inside = geometry::signed_area2(a, b, pos)
                .min(geometry::signed_area2(b, c, pos))
                .min(geometry::signed_area2(c, a, pos));
            if inside >= 0. {
                return Some(ti);
            }
            if best.map_or(true, |(_, score)| inside > score) {
                best = Some((ti, inside));
            }
        }
        best.map(|(ti, _)| ti)
    }

    /// Triangles reachable from `seed` through neighbors that pass `accept`
    fn flood(&self, seed: usize, accept: impl Fn(usize) -> bool) -> Vec<usize> {
        let mut reached = vec![seed];
        let mut visited = vec![seed];
        let mut next = 0;
        while next < reached.len() {
            let ti = reached[next];
            next += 1;
            for side in self.triangles[ti].t {
                let Neighbor::Triangle(tj) = side else {
                    continue;
                };
                if visited.contains(&tj) {
                    continue;
                }
                visited.push(tj);
                if accept(tj) {
                    reached.push(tj);
                }
            }
        }
        reached
    }

    /// Sides of the cavity with no cavity triangle across
    fn outline(&self, cavity: &[usize]) -> Vec<CavitySide> {
        let mut outline = Vec::new();
        for &ti in cavity {
            let triangle = &self.triangles[ti];
            for i in 0..3 {
                let outer = triangle.t[i];
                if matches!(outer, Neighbor::Triangle(tj) if cavity.contains(&tj)) {
                    continue;
                }
                let (a, b) = triangle.edge(i);
                outline.push(CavitySide { owner: ti, a, b, outer });
            }
        }
        outline
    }

    /// Adds centroids of existing triangles until a pass accepts none
    fn refine(&mut self) -> Result<(), GridError> {
        let near_vertex = self.config.vertex_spacing_factor;
        let near_accepted = self.config.accepted_spacing_factor;
        let max_passes = self.config.pass_factor * self.nbnd;
        let first_field = self.points.len();

        for pass in 0..max_passes {
            let mut accepted: Vec<Point> = Vec::new();
            for triangle in self.triangles.iter().filter(|t| !t.is_deleted()) {
                let vertices = triangle.p.map(|i| &self.points[i]);
                let pos = geometry::centroid(vertices[0].pos, vertices[1].pos, vertices[2].pos);
                let spacing = vertices.iter().map(|v| v.spacing).sum::<f64>() / 3.;
                if vertices
                    .iter()
                    .any(|v| pos.distance(v.pos) < near_vertex * v.spacing)
                {
                    continue;
                }
                if accepted
                    .iter()
                    .any(|other| pos.distance(other.pos) < near_accepted * spacing)
                {
                    continue;
                }
                accepted.push(Point {
                    pos,
                    spacing,
                    parents: Parents::Field(triangle.p),
                });
            }

            if accepted.is_empty() {
                break;
            }
            trace!(pass, accepted = accepted.len(), "refinement pass");
            for point in accepted {
                let ip = self.push_point(point)?;
                self.insert_point(ip)?;
            }
        }

        debug!(
            field_points = self.points.len() - first_field,
            triangles = self.live_triangles(),
            "interior refined"
        );
        Ok(())
    }

    /// Live triangle and side index holding the edge (a, b) in either direction
    pub(crate) fn find_edge(&self, a: usize, b: usize) -> Option<(usize, usize)> {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_deleted())
            .find_map(|(ti, t)| t.side_of(a, b).or_else(|| t.side_of(b, a)).map(|i| (ti, i)))
    }

    /// Swaps the diagonal of the quad formed by triangle `ti` and its neighbor across side `i`
    ///
    /// ```text
    ///        c                    c
    ///       /|\                  / \
    ///      / | \                /t1 \
    ///   a / t0|t1\ d   ->    a /_____\ d
    ///     \  |  /              \ t0  /
    ///      \ | /                \   /
    ///       \|/                  \ /
    ///        b                    b
    /// ```
    ///
    /// Both results keep their slots: `ti` becomes (a, b, d) and the
    /// neighbor becomes (a, d, c). Fails with `CannotSwap` when the quad is
    /// not strictly convex.
    pub(crate) fn flip(&mut self, ti: usize, i: usize) -> Result<usize, GridError> {
        let t0 = self.triangle(ti)?.clone();
        let cannot_swap = GridError::CannotSwap {
            triangle: ti,
            side: i,
        };
        let Neighbor::Triangle(tj) = t0.t[i] else {
            return Err(cannot_swap);
        };
        let t1 = self.triangle(tj)?.clone();
        let a = t0.p[i];
        let (b, c) = t0.edge(i);
        let Some(j) = t1.side_of(c, b) else {
            return Err(cannot_swap);
        };
        let d = t1.p[j];

        let [pa, pb, pc, pd] = [a, b, c, d].map(|v| self.points[v].pos);
        if geometry::signed_area2(pa, pb, pd) <= 0. || geometry::signed_area2(pa, pd, pc) <= 0. {
            return Err(cannot_swap);
        }

        let n_ab = t0.t[(i + 2) % 3];
        let n_ca = t0.t[(i + 1) % 3];
        let n_bd = t1.t[(j + 1) % 3];
        let n_dc = t1.t[(j + 2) % 3];

        self.triangles[ti] = Triangle {
            p: [a, b, d],
            t: [n_bd, Neighbor::Triangle(tj), n_ab],
            cc: self.circumcircle_of([a, b, d]),
        };
        self.triangles[tj] = Triangle {
            p: [a, d, c],
            t: [n_dc, n_ca, Neighbor::Triangle(ti)],
            cc: self.circumcircle_of([a, d, c]),
        };
        self.relink(n_bd, d, b, ti);
        self.relink(n_ca, a, c, tj);
        Ok(tj)
    }

    /// Points the side (from, to) of `neighbor` at triangle `target`
    fn relink(&mut self, neighbor: Neighbor, from: usize, to: usize, target: usize) {
        if let Neighbor::Triangle(k) = neighbor {
            if let Some(s) = self.triangles[k].side_of(from, to) {
                self.triangles[k].t[s] = Neighbor::Triangle(target);
            }
        }
    }
}

struct CavitySide {
    owner: usize,
    a: usize,
    b: usize,
    outer: Neighbor,
}
