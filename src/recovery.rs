use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::{
    grid::GridError,
    mesher::{Mesher, Neighbor},
};

impl Mesher {
    /// Makes every boundary loop edge a triangle side
    pub(crate) fn recover_boundary(&mut self) -> Result<(), GridError> {
        let mut swapped = 0;
        let mut marched = 0;
        for range in self.loops.clone() {
            let mut prev = range.end - 1;
            for ip in range {
                match self.recover_edge(prev, ip)? {
                    Recovery::Present => {}
                    Recovery::Swapped => swapped += 1,
                    Recovery::Marched => marched += 1,
                }
                prev = ip;
            }
        }
        debug!(swapped, marched, "boundary recovered");
        Ok(())
    }

    fn recover_edge(&mut self, ip0: usize, ip1: usize) -> Result<Recovery, GridError> {
        if self.find_edge(ip0, ip1).is_some() {
            return Ok(Recovery::Present);
        }
        if self.swap_diagonal(ip0, ip1)? {
            return Ok(Recovery::Swapped);
        }
        self.march(ip0, ip1)?;
        Ok(Recovery::Marched)
    }

    /// Handles the common case of two triangles splitting the quad the wrong way
    ///
    /// ```text
    ///        b                    b
    ///       /|\                  / \
    ///      / | \                /   \
    ///  ip0 \ | / ip1   ->   ip0 ----- ip1
    ///       \|/                 \   /
    ///        c                    c
    /// ```
    fn swap_diagonal(&mut self, ip0: usize, ip1: usize) -> Result<bool, GridError> {
        for ti in 0..self.triangles.len() {
            let triangle = &self.triangles[ti];
            if triangle.is_deleted() {
                continue;
            }
            let Some(i) = triangle.index_of(ip0) else {
                continue;
            };
            let Neighbor::Triangle(tj) = triangle.t[i] else {
                continue;
            };
            if !self.triangle(tj)?.has_vertex(ip1) {
                continue;
            }
            match self.flip(ti, i) {
                Ok(_) => return Ok(true),
                Err(GridError::CannotSwap { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// Flips every side crossed by segment (ip0, ip1) until the segment is an edge
    ///
    /// Crossed sides are kept in a queue. A side whose quad is not convex, or
    /// whose new diagonal still crosses the segment, goes back to the end of
    /// the queue. Sides next to either end point are tried first.
    fn march(&mut self, ip0: usize, ip1: usize) -> Result<(), GridError> {
        let mut queue = self.crossed_sides(ip0, ip1)?;
        let limit = self.triangles.len() * (queue.len() + 1);
        let mut attempts = 0;
        let mut stalled = 0;

        while let Some((a, b)) = queue.pop_front() {
            attempts += 1;
            if attempts > limit || stalled > queue.len() {
                break;
            }
            let Some((ti, i)) = self.find_edge(a, b) else {
                continue;
            };
            match self.flip(ti, i) {
                Ok(_) => {
                    stalled = 0;
                    // the new diagonal runs from p[0] to p[2] of the flipped triangle
                    let p = self.triangles[ti].p;
                    let (c, d) = (p[0], p[2]);
                    if ![ip0, ip1].contains(&c)
                        && ![ip0, ip1].contains(&d)
                        && self.intersect(ip0, ip1, c, d)?
                    {
                        queue.push_back((c, d));
                    }
                }
                Err(GridError::CannotSwap { .. }) => {
                    stalled += 1;
                    queue.push_back((a, b));
                }
                Err(e) => return Err(e),
            }
        }

        if self.find_edge(ip0, ip1).is_some() {
            return Ok(());
        }
        warn!(p0 = ip0, p1 = ip1, attempts, "boundary edge could not be recovered");
        Err(GridError::CouldNotRecoverBoundary { p0: ip0, p1: ip1 })
    }

    /// Every interior side crossed by segment (ip0, ip1), once per side
    fn crossed_sides(&self, ip0: usize, ip1: usize) -> Result<VecDeque<(usize, usize)>, GridError> {
        let mut near = VecDeque::new();
        let mut far = VecDeque::new();
        for triangle in self.triangles.iter().filter(|t| !t.is_deleted()) {
            for i in 0..3 {
                let (a, b) = triangle.edge(i);
                // each shared side is seen from both triangles; keep one
                let Neighbor::Triangle(tj) = triangle.t[i] else {
                    continue;
                };
                if a > b {
                    continue;
                }
                if [ip0, ip1].contains(&a) || [ip0, ip1].contains(&b) {
                    continue;
                }
                if !self.intersect(ip0, ip1, a, b)? {
                    continue;
                }
                let across = self.triangle(tj)?;
                let opposite = across.side_of(b, a).map(|j| across.p[j]);
                if [ip0, ip1].contains(&triangle.p[i])
                    || opposite.is_some_and(|v| [ip0, ip1].contains(&v))
                {
                    near.push_back((a, b));
                } else {
                    far.push_back((a, b));
                }
            }
        }
        near.extend(far);
        Ok(near)
    }

    /// Lawson flips of interior sides that fail the empty-circumcircle test
    ///
    /// Boundary sides are never flipped, so the result is constrained
    /// Delaunay over the recovered loops.
    pub(crate) fn optimize(&mut self) -> Result<usize, GridError> {
        let mut total = 0;
        for _ in 0..self.config.optimize_depth {
            let mut flips = 0;
            for ti in 0..self.triangles.len() {
                if self.triangles[ti].is_deleted() {
                    continue;
                }
                for i in 0..3 {
                    let triangle = &self.triangles[ti];
                    let Neighbor::Triangle(tj) = triangle.t[i] else {
                        continue;
                    };
                    let (b, c) = triangle.edge(i);
                    let Some(j) = self.triangles[tj].side_of(c, b) else {
                        continue;
                    };
                    let d = self.point(self.triangles[tj].p[j])?;
                    let cc = triangle.cc;
                    if d.distance_squared(cc.center) >= cc.radius_squared * (1. - 1e-9) {
                        continue;
                    }
                    match self.flip(ti, i) {
                        Ok(_) => {
                            flips += 1;
                            break;
                        }
                        Err(GridError::CannotSwap { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            total += flips;
            if flips == 0 {
                break;
            }
        }
        debug!(flips = total, "interior optimized");
        Ok(total)
    }
}

enum Recovery {
    Present,
    Swapped,
    Marched,
}
