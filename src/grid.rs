use std::cell::OnceCell;

use snafu::Snafu;

use crate::{
    config::GridConfig,
    geometry,
    mesher::{Mesher, Neighbor, Parents, Point, Triangle},
    vec2::Vec2,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GridError {
    #[snafu(display("could not allocate grid storage"))]
    MallocError,
    #[snafu(display("point index {index} out of range for {count} points"))]
    BadPointIndex { index: usize, count: usize },
    #[snafu(display("triangle index {index} out of range for {count} triangles"))]
    BadTriangleIndex { index: usize, count: usize },
    #[snafu(display("side {side} of triangle {triangle} cannot be swapped"))]
    CannotSwap { triangle: usize, side: usize },
    #[snafu(display("could not recover boundary edge ({p0}, {p1})"))]
    CouldNotRecoverBoundary { p0: usize, p1: usize },
    #[snafu(display("expected {expected} boundary points, found {found}"))]
    NumberOfPointMismatch { expected: usize, found: usize },
    #[snafu(display("grid i/o failed"))]
    Io { source: std::io::Error },
    #[snafu(display("line {line}: {message}"))]
    Parse { line: usize, message: String },
}

/// Triangulation of a region of the (u, v) plane bounded by point loops
///
/// The first [`boundary_count`](Grid::boundary_count) points are the
/// boundary points in the order they were supplied; every other point is a
/// field point placed at the centroid of three earlier points, its parents.
#[derive(Debug, Clone)]
pub struct Grid {
    pub(crate) points: Vec<Point>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) nbnd: usize,
    export: OnceCell<Export>,
}

#[derive(Debug, Clone)]
struct Export {
    uv: Vec<[f64; 2]>,
    parents: Vec<Option<[usize; 3]>>,
    triangles: Vec<[usize; 3]>,
}

/// Flat view of a grid returned by [`Grid::info`]
#[derive(Debug, Clone, Copy)]
pub struct GridInfo<'a> {
    pub points: usize,
    pub boundary_count: usize,
    pub uv: &'a [[f64; 2]],
    /// `None` for boundary points
    pub parents: &'a [Option<[usize; 3]>],
    pub triangles: usize,
    /// Counter-clockwise vertex indices of every triangle
    pub triangle_vertices: &'a [[usize; 3]],
}

impl Grid {
    /// Meshes the region enclosed by `boundary` with the default [`GridConfig`]
    ///
    /// `boundary` holds every loop back to back, `loop_sizes` the number of
    /// points in each loop. The outer loop runs counter-clockwise and holes
    /// clockwise; loops supplied the other way round are read backwards.
    pub fn generate(boundary: &[[f64; 2]], loop_sizes: &[usize]) -> Result<Self, GridError> {
        Self::generate_with(boundary, loop_sizes, &GridConfig::default())
    }

    pub fn generate_with(
        boundary: &[[f64; 2]],
        loop_sizes: &[usize],
        config: &GridConfig,
    ) -> Result<Self, GridError> {
        let mut mesher = Mesher::new(boundary, loop_sizes, config.clone())?;
        mesher.process()?;
        Ok(Self::from(mesher))
    }

    pub(crate) fn from_parts(points: Vec<Point>, triangles: Vec<Triangle>, nbnd: usize) -> Self {
        Self {
            points,
            triangles,
            nbnd,
            export: OnceCell::new(),
        }
    }

    /// Moves the boundary to `boundary` and carries the field points along
    ///
    /// Topology is kept as is: every field point is placed at the centroid of
    /// its parents' new positions. Returns the new grid together with the new
    /// position of every field point, in point order.
    pub fn morph(&self, boundary: &[[f64; 2]]) -> Result<(Self, Vec<[f64; 2]>), GridError> {
        if boundary.len() != self.nbnd {
            return Err(GridError::NumberOfPointMismatch {
                expected: self.nbnd,
                found: boundary.len(),
            });
        }

        let mut points = self.points.clone();
        let mut field = Vec::with_capacity(points.len() - self.nbnd);
        for (point, &uv) in points.iter_mut().zip(boundary) {
            point.pos = uv.into();
        }
        for ip in self.nbnd..points.len() {
            let Parents::Field(parents) = points[ip].parents else {
                continue;
            };
            let mut sum = Vec2::ZERO;
            for p in parents {
                let parent = points.get(p).ok_or(GridError::BadPointIndex {
                    index: p,
                    count: self.points.len(),
                })?;
                sum = sum + parent.pos;
            }
            points[ip].pos = sum * (1. / 3.);
            field.push(points[ip].pos.into());
        }

        let mut triangles = self.triangles.clone();
        for triangle in &mut triangles {
            let [a, b, c] = corners(&points, triangle)?;
            triangle.cc = geometry::circumcircle_or_centroid(a, b, c);
        }
        Ok((Self::from_parts(points, triangles, self.nbnd), field))
    }

    /// Point, parent and triangle tables, built on first use
    pub fn info(&self) -> GridInfo<'_> {
        let export = self.export.get_or_init(|| Export {
            uv: self.points.iter().map(|p| p.pos.into()).collect(),
            parents: self
                .points
                .iter()
                .map(|p| match p.parents {
                    Parents::Field(parents) => Some(parents),
                    Parents::Boundary | Parents::Hull => None,
                })
                .collect(),
            triangles: self.triangles.iter().map(|t| t.p).collect(),
        });
        GridInfo {
            points: self.points.len(),
            boundary_count: self.nbnd,
            uv: &export.uv,
            parents: &export.parents,
            triangles: self.triangles.len(),
            triangle_vertices: &export.triangles,
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn boundary_count(&self) -> usize {
        self.nbnd
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// `None` when `index` is out of range or names a point the grid does not have
    pub fn triangle_uv(&self, index: usize) -> Option<[[f64; 2]; 3]> {
        let triangle = self.triangles.get(index)?;
        let uv = corners(&self.points, triangle).ok()?;
        Some(uv.map(Into::into))
    }

    pub fn triangles_uv(&self) -> Vec<[[f64; 2]; 3]> {
        (0..self.triangles.len())
            .filter_map(|i| self.triangle_uv(i))
            .collect()
    }

    /// Sum of the triangle areas in the (u, v) plane
    pub fn area(&self) -> Result<f64, GridError> {
        let mut area = 0.;
        for triangle in &self.triangles {
            let [a, b, c] = corners(&self.points, triangle)?;
            area += geometry::area(a, b, c);
        }
        Ok(area)
    }

    /// Sides of the mesh with no triangle across, as directed point pairs
    pub fn boundary_edges(&self) -> Vec<[usize; 2]> {
        let mut edges = Vec::new();
        for triangle in &self.triangles {
            for i in 0..3 {
                if triangle.t[i] == Neighbor::Boundary {
                    let (a, b) = triangle.edge(i);
                    edges.push([a, b]);
                }
            }
        }
        edges
    }

    /// Releases the grid; dropping it has the same effect
    pub fn free(self) {}
}

fn corners(points: &[Point], triangle: &Triangle) -> Result<[Vec2; 3], GridError> {
    let corner = |i: usize| {
        points.get(i).map(|p| p.pos).ok_or(GridError::BadPointIndex {
            index: i,
            count: points.len(),
        })
    };
    Ok([corner(triangle.p[0])?, corner(triangle.p[1])?, corner(triangle.p[2])?])
}

impl From<Mesher> for Grid {
    fn from(mesher: Mesher) -> Self {
        Self::from_parts(mesher.points, mesher.triangles, mesher.nbnd)
    }
}
