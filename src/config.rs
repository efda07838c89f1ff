/// Density and iteration controls for [`Grid::generate_with`](crate::Grid::generate_with).
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// A refinement candidate is rejected when it lies closer than this
    /// fraction of a vertex's spacing to any vertex of its triangle.
    pub vertex_spacing_factor: f64,

    /// A refinement candidate is rejected when it lies closer than this
    /// multiple of its own spacing to a point accepted earlier in the same pass.
    pub accepted_spacing_factor: f64,

    /// Refinement stops after `pass_factor * boundary point count` passes.
    pub pass_factor: usize,

    /// Spacing given to the four hull points, as a multiple of the boundary
    /// bounding-box diagonal.
    pub hull_spacing_factor: f64,

    /// Whether interior points are added at all.
    pub refine: bool,

    /// Whether interior edges are flipped towards the Delaunay condition
    /// after the boundary has been recovered.
    pub optimize: bool,

    /// Maximum number of optimization passes.
    pub optimize_depth: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            vertex_spacing_factor: 0.80,
            accepted_spacing_factor: 5.00,
            pass_factor: 10,
            hull_spacing_factor: 10.0,
            refine: true,
            optimize: true,
            optimize_depth: 128,
        }
    }
}

impl GridConfig {
    pub fn with_vertex_spacing_factor(mut self, factor: f64) -> Self {
        self.vertex_spacing_factor = factor;
        self
    }

    pub fn with_accepted_spacing_factor(mut self, factor: f64) -> Self {
        self.accepted_spacing_factor = factor;
        self
    }

    pub fn with_pass_factor(mut self, factor: usize) -> Self {
        self.pass_factor = factor;
        self
    }

    pub fn with_hull_spacing_factor(mut self, factor: f64) -> Self {
        self.hull_spacing_factor = factor;
        self
    }

    pub fn with_optimize_depth(mut self, depth: usize) -> Self {
        self.optimize_depth = depth;
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }
}
