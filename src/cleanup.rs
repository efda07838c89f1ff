use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::{
    geometry,
    grid::GridError,
    mesher::{Mesher, Neighbor, Parents},
    vec2::Vec2,
};

impl Mesher {
    /// For each loop, whether its interior lies to the right of its edges
    ///
    /// A loop nested in an odd number of other loops is a hole and should
    /// run clockwise; any other loop should run counter-clockwise. Loops given
    /// the other way round are flagged so their edges are read backwards.
    pub(crate) fn reversed_loops(&self) -> Vec<bool> {
        let outlines: Vec<Vec<Vec2>> = self
            .loops
            .iter()
            .map(|range| self.points[range.clone()].iter().map(|p| p.pos).collect())
            .collect();

        (0..outlines.len())
            .map(|l| {
                let probe = outlines[l][0];
                let depth = outlines
                    .iter()
                    .enumerate()
                    .filter(|&(other, outline)| {
                        other != l && geometry::evenodd_count(probe, outline) % 2 == 1
                    })
                    .count();
                let is_hole = depth % 2 == 1;
                let counter_clockwise = geometry::loop_area(&outlines[l]) > 0.;
                counter_clockwise == is_hole
            })
            .collect()
    }

    /// Deletes every triangle outside the loops
    ///
    /// Each boundary edge becomes a `Boundary` side of the triangle inside
    /// and condemns the triangle outside. Deletion then spreads across every
    /// side that is not a boundary side, which removes the hull and the
    /// inside of every hole.
    pub(crate) fn mark_exterior(&mut self) -> Result<(), GridError> {
        let mut sides: HashMap<(usize, usize), (usize, usize)> =
            HashMap::with_capacity(self.triangles.len() * 3);
        for (ti, triangle) in self.triangles.iter().enumerate() {
            if triangle.is_deleted() {
                continue;
            }
            for i in 0..3 {
                sides.insert(triangle.edge(i), (ti, i));
            }
        }

        let reversed = self.reversed_loops();
        let mut queue = VecDeque::new();
        for (range, reversed) in self.loops.clone().into_iter().zip(reversed) {
            let mut prev = range.end - 1;
            for ip in range {
                let (a, b) = if reversed { (ip, prev) } else { (prev, ip) };
                prev = ip;
                let (Some(&(inner, i)), Some(&(outer, o))) = (sides.get(&(a, b)), sides.get(&(b, a)))
                else {
                    return Err(GridError::CouldNotRecoverBoundary { p0: a, p1: b });
                };
                self.triangles[inner].t[i] = Neighbor::Boundary;
                self.triangles[outer].t[o] = Neighbor::Boundary;
                queue.push_back(outer);
            }
        }

        for &outer in &queue {
            self.delete_triangle(outer);
        }
        while let Some(ti) = queue.pop_front() {
            for side in self.triangles[ti].t {
                let Neighbor::Triangle(tj) = side else {
                    continue;
                };
                if self.triangles[tj].is_deleted() {
                    continue;
                }
                self.delete_triangle(tj);
                queue.push_back(tj);
            }
        }

        debug!(triangles = self.live_triangles(), "exterior removed");
        Ok(())
    }

    /// Drops deleted triangles and unreferenced points, renumbering everything
    ///
    /// A point survives when some triangle uses it or when it is a parent of
    /// a surviving field point.
    pub(crate) fn compact(&mut self) {
        let mut triangle_map = vec![None; self.triangles.len()];
        let mut count = 0;
        for (old, triangle) in self.triangles.iter().enumerate() {
            if !triangle.is_deleted() {
                triangle_map[old] = Some(count);
                count += 1;
            }
        }
        self.triangles.retain(|t| !t.is_deleted());
        self.free.clear();
        for triangle in &mut self.triangles {
            for side in &mut triangle.t {
                if let Neighbor::Triangle(old) = *side {
                    *side = match triangle_map[old] {
                        Some(new) => Neighbor::Triangle(new),
                        None => Neighbor::Boundary,
                    };
                }
            }
        }

        let mut keep = vec![false; self.points.len()];
        for triangle in &self.triangles {
            for p in triangle.p {
                keep[p] = true;
            }
        }
        // parents always precede their children
        for ip in (0..self.points.len()).rev() {
            if let (true, Parents::Field(parents)) = (keep[ip], self.points[ip].parents) {
                for p in parents {
                    keep[p] = true;
                }
            }
        }

        let mut point_map = vec![usize::MAX; self.points.len()];
        let mut count = 0;
        for (old, &kept) in keep.iter().enumerate() {
            if kept {
                point_map[old] = count;
                count += 1;
            }
        }
        let dropped = self.points.len() - count;

        let mut old = 0;
        self.points.retain(|_| {
            old += 1;
            keep[old - 1]
        });
        for point in &mut self.points {
            if let Parents::Field(parents) = &mut point.parents {
                *parents = parents.map(|p| point_map[p]);
            }
        }
        for triangle in &mut self.triangles {
            triangle.p = triangle.p.map(|p| point_map[p]);
        }
        self.nbnd = keep[..self.nbnd].iter().filter(|&&kept| kept).count();
        let mut start = 0;
        for range in &mut self.loops {
            let size = keep[range.clone()].iter().filter(|&&kept| kept).count();
            *range = start..start + size;
            start += size;
        }

        debug!(
            points = self.points.len(),
            dropped,
            triangles = self.triangles.len(),
            "grid compacted"
        );
    }
}
