use crate::{
    geometry::{self, evenodd_count},
    mesher::{Mesher, Neighbor, Parents, Point, Triangle},
    vec2::Vec2,
    Grid, GridConfig, GridError,
};

fn unit_square() -> Vec<[f64; 2]> {
    vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.]]
}

/// Counter-clockwise square [min, max]^2 with `n` points per side
fn square(min: f64, max: f64, n: usize) -> Vec<[f64; 2]> {
    let step = (max - min) / n as f64;
    let mut points = Vec::with_capacity(n * 4);
    for i in 0..n {
        points.push([min + step * i as f64, min]);
    }
    for i in 0..n {
        points.push([max, min + step * i as f64]);
    }
    for i in 0..n {
        points.push([max - step * i as f64, max]);
    }
    for i in 0..n {
        points.push([min, max - step * i as f64]);
    }
    points
}

/// Counter-clockwise regular polygon of radius `r`
fn circle(n: usize, r: f64) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            [r * a.cos(), r * a.sin()]
        })
        .collect()
}

/// Counter-clockwise star alternating between radius 1 and 0.3
fn star(n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            let r = if i % 2 == 0 { 1. } else { 0.3 };
            [r * a.cos(), r * a.sin()]
        })
        .collect()
}

fn pos(uv: [f64; 2]) -> Vec2 {
    Vec2::from(uv)
}

fn has_edge(grid: &Grid, a: usize, b: usize) -> bool {
    grid.info()
        .triangle_vertices
        .iter()
        .any(|t| (0..3).any(|i| (t[i], t[(i + 1) % 3]) == (a, b) || (t[i], t[(i + 1) % 3]) == (b, a)))
}

fn assert_loop_edges(grid: &Grid, loop_sizes: &[usize]) {
    let mut start = 0;
    for &size in loop_sizes {
        for i in 0..size {
            let a = start + i;
            let b = start + (i + 1) % size;
            assert!(has_edge(grid, a, b), "boundary edge ({a}, {b}) missing");
        }
        start += size;
    }
}

fn total_area(grid: &Grid) -> f64 {
    grid.triangles_uv()
        .iter()
        .map(|t| geometry::area(pos(t[0]), pos(t[1]), pos(t[2])))
        .sum()
}

fn centroids(grid: &Grid) -> Vec<Vec2> {
    grid.triangles_uv()
        .iter()
        .map(|t| geometry::centroid(pos(t[0]), pos(t[1]), pos(t[2])))
        .collect()
}

/// Index ranges, orientation and symmetric neighbor links of every live triangle
fn assert_linked(points: &[Point], triangles: &[Triangle]) {
    for (ti, triangle) in triangles.iter().enumerate() {
        if triangle.is_deleted() {
            continue;
        }
        for p in triangle.p {
            assert!(p < points.len());
        }
        let [a, b, c] = triangle.p.map(|i| points[i].pos);
        assert!(geometry::signed_area2(a, b, c) > 0., "triangle {ti} is not counter-clockwise");
        for i in 0..3 {
            let Neighbor::Triangle(tj) = triangle.t[i] else {
                continue;
            };
            assert!(!triangles[tj].is_deleted(), "triangle {ti} links to deleted {tj}");
            let (a, b) = triangle.edge(i);
            let j = triangles[tj]
                .side_of(b, a)
                .expect("neighbor does not share the side");
            assert_eq!(triangles[tj].t[j], Neighbor::Triangle(ti));
        }
    }
}

/// A finished grid: linked, compacted, every side either shared or a boundary side
fn assert_consistent(grid: &Grid) {
    assert_linked(&grid.points, &grid.triangles);
    for (ti, triangle) in grid.triangles.iter().enumerate() {
        assert!(!triangle.is_deleted());
        assert!(
            !triangle.t.contains(&Neighbor::Unset),
            "triangle {ti} has an unlinked side"
        );
    }
    for (ip, point) in grid.points.iter().enumerate() {
        assert_ne!(point.parents, Parents::Hull);
        if let Parents::Field(parents) = point.parents {
            assert!(parents.iter().all(|&p| p < ip));
        }
    }
}

#[test]
fn unit_square_scenario() {
    let grid = Grid::generate(&unit_square(), &[4]).unwrap();

    assert!(grid.triangle_count() >= 2);
    assert_eq!(grid.boundary_count(), 4);
    assert_loop_edges(&grid, &[4]);
    for c in centroids(&grid) {
        assert!(c.x > 0. && c.x < 1. && c.y > 0. && c.y < 1.);
    }
    assert!((total_area(&grid) - 1.).abs() < 1e-12);
    assert_consistent(&grid);
}

#[test]
fn square_with_hole() {
    let mut boundary = unit_square();
    // clockwise inner loop
    boundary.extend([[0.4, 0.4], [0.4, 0.6], [0.6, 0.6], [0.6, 0.4]]);
    let grid = Grid::generate(&boundary, &[4, 4]).unwrap();

    assert_loop_edges(&grid, &[4, 4]);
    for c in centroids(&grid) {
        let inside_hole = c.x > 0.4 && c.x < 0.6 && c.y > 0.4 && c.y < 0.6;
        assert!(!inside_hole, "triangle centroid {c:?} inside the hole");
        assert!(c.x > 0. && c.x < 1. && c.y > 0. && c.y < 1.);
    }
    assert!((total_area(&grid) - 0.96).abs() < 1e-9);
    assert!((grid.area().unwrap() - total_area(&grid)).abs() < 1e-12);
    assert_eq!(grid.boundary_edges().len(), 8);
    assert_consistent(&grid);
}

#[test]
fn clockwise_outer_loop() {
    let boundary = vec![[0., 0.], [0., 1.], [1., 1.], [1., 0.]];
    let grid = Grid::generate(&boundary, &[4]).unwrap();

    assert_loop_edges(&grid, &[4]);
    assert!((total_area(&grid) - 1.).abs() < 1e-12);
    assert_consistent(&grid);
}

#[test]
fn recovers_non_delaunay_edge() {
    //  e             c
    //  |\           /|
    //  |  \       /  |
    //  |    \   /    |
    //  |      d      |
    //  a_____________b
    let boundary = vec![[0., 0.], [4., 0.], [4., 2.], [2., 0.3], [0., 2.]];
    let outline: Vec<Vec2> = boundary.iter().copied().map(pos).collect();
    let grid = Grid::generate(&boundary, &[5]).unwrap();

    assert_loop_edges(&grid, &[5]);
    assert!((total_area(&grid) - geometry::loop_area(&outline)).abs() < 1e-9);
    for c in centroids(&grid) {
        assert_eq!(evenodd_count(c, &outline) % 2, 1, "centroid {c:?} outside");
    }
    assert_consistent(&grid);
}

#[test]
fn refined_square() {
    let boundary = square(0., 1., 10);
    let grid = Grid::generate(&boundary, &[40]).unwrap();

    assert!(grid.point_count() > 40, "no field points were added");
    assert_loop_edges(&grid, &[40]);
    assert!((total_area(&grid) - 1.).abs() < 1e-9);
    assert_consistent(&grid);

    for point in &grid.points[..40] {
        assert!((point.spacing - 0.1).abs() < 1e-12);
    }
    for point in &grid.points[40..] {
        let Parents::Field(parents) = point.parents else {
            panic!("field point without parents");
        };
        for p in parents {
            let parent = &grid.points[p];
            assert!(point.pos.distance(parent.pos) >= 0.8 * parent.spacing);
        }
        assert!(point.pos.x > 0. && point.pos.x < 1. && point.pos.y > 0. && point.pos.y < 1.);
    }
}

#[test]
fn interior_sides_are_delaunay() {
    let boundary = square(0., 2., 8);
    let grid = Grid::generate(&boundary, &[32]).unwrap();

    for triangle in &grid.triangles {
        for i in 0..3 {
            let Neighbor::Triangle(tj) = triangle.t[i] else {
                continue;
            };
            let (a, b) = triangle.edge(i);
            let across = &grid.triangles[tj];
            let j = across.side_of(b, a).unwrap();
            let d = grid.points[across.p[j]].pos;
            let [pa, pb, pc] = triangle.p.map(|k| grid.points[k].pos);
            let cc = geometry::circumcircle(pa, pb, pc).unwrap();
            assert!(
                d.distance_squared(cc.center) >= cc.radius_squared * (1. - 1e-6),
                "vertex inside a neighboring circumcircle"
            );
        }
    }
}

#[test]
fn config_controls_density() {
    let boundary = square(0., 1., 10);

    let coarse = GridConfig::default().with_vertex_spacing_factor(100.);
    let grid = Grid::generate_with(&boundary, &[40], &coarse).unwrap();
    assert_eq!(grid.point_count(), 40);

    let unrefined = GridConfig::default().with_refine(false);
    let grid = Grid::generate_with(&boundary, &[40], &unrefined).unwrap();
    assert_eq!(grid.point_count(), 40);
    assert!((total_area(&grid) - 1.).abs() < 1e-9);

    let unoptimized = GridConfig::default().with_optimize(false);
    let grid = Grid::generate_with(&boundary, &[40], &unoptimized).unwrap();
    assert_loop_edges(&grid, &[40]);
    assert_consistent(&grid);
}

#[test]
fn cocircular_boundary_inserts_cleanly() {
    let n = 120;
    let boundary = circle(n, 3.);
    let mut mesher = Mesher::new(&boundary, &[n], GridConfig::default()).unwrap();
    for ip in 0..n {
        assert!(mesher.insert_point(ip).unwrap(), "point {ip} was skipped");
    }
    // n boundary points plus 4 hull points, all on a convex quad
    assert_eq!(mesher.live_triangles(), 2 * (n + 4) - 6);
    assert_eq!(mesher.triangles.len(), mesher.live_triangles());
    assert_linked(&mesher.points, &mesher.triangles);

    let grid = Grid::generate(&boundary, &[n]).unwrap();
    let outline: Vec<Vec2> = boundary.iter().copied().map(pos).collect();
    assert_loop_edges(&grid, &[n]);
    assert!((total_area(&grid) - geometry::loop_area(&outline)).abs() < 1e-9);
    assert_consistent(&grid);
}

#[test]
fn star_boundary_does_not_fold() {
    let boundary = star(20);
    let outline: Vec<Vec2> = boundary.iter().copied().map(pos).collect();
    let configs = [
        GridConfig::default(),
        GridConfig::default().with_refine(false).with_optimize(false),
    ];
    for config in &configs {
        let grid = Grid::generate_with(&boundary, &[20], config).unwrap();
        assert_loop_edges(&grid, &[20]);
        assert!((total_area(&grid) - geometry::loop_area(&outline)).abs() < 1e-9);
        for c in centroids(&grid) {
            assert_eq!(evenodd_count(c, &outline) % 2, 1, "centroid {c:?} outside");
        }
        assert_consistent(&grid);
    }
}

#[test]
fn tiny_domain_meshes_like_a_unit_one() {
    let scale = 1e-6;
    let boundary: Vec<[f64; 2]> = square(0., 1., 10)
        .iter()
        .map(|&[u, v]| [u * scale, v * scale])
        .collect();
    let grid = Grid::generate(&boundary, &[40]).unwrap();

    assert_loop_edges(&grid, &[40]);
    assert!((total_area(&grid) / (scale * scale) - 1.).abs() < 1e-9);
    assert_consistent(&grid);
}

#[test]
fn builders_set_every_field() {
    let config = GridConfig::default()
        .with_vertex_spacing_factor(0.7)
        .with_accepted_spacing_factor(2.)
        .with_pass_factor(2)
        .with_hull_spacing_factor(4.)
        .with_refine(true)
        .with_optimize(true)
        .with_optimize_depth(3);
    assert_eq!(
        config,
        GridConfig {
            vertex_spacing_factor: 0.7,
            accepted_spacing_factor: 2.,
            pass_factor: 2,
            hull_spacing_factor: 4.,
            refine: true,
            optimize: true,
            optimize_depth: 3,
        }
    );

    let grid = Grid::generate_with(&square(0., 1., 10), &[40], &config).unwrap();
    assert_loop_edges(&grid, &[40]);
    assert_consistent(&grid);
}

#[test]
fn too_few_points() {
    let err = Grid::generate(&[[0., 0.], [1., 0.]], &[2]).unwrap_err();
    assert!(matches!(
        err,
        GridError::NumberOfPointMismatch {
            expected: 3,
            found: 2
        }
    ));
}

#[test]
fn loop_sizes_must_cover_boundary() {
    let err = Grid::generate(&unit_square(), &[3]).unwrap_err();
    assert!(matches!(err, GridError::NumberOfPointMismatch { .. }));

    let err = Grid::generate(&unit_square(), &[]).unwrap_err();
    assert!(matches!(err, GridError::NumberOfPointMismatch { .. }));

    let mut boundary = unit_square();
    boundary.extend([[0.4, 0.4], [0.6, 0.6]]);
    let err = Grid::generate(&boundary, &[4, 2]).unwrap_err();
    assert!(matches!(
        err,
        GridError::NumberOfPointMismatch {
            expected: 3,
            found: 2
        }
    ));
}

#[test]
fn crossing_loop_cannot_be_recovered() {
    // bow tie: the two diagonals of the square cannot both be edges
    let boundary = vec![[0., 0.], [1., 1.], [1., 0.], [0., 1.]];
    let err = Grid::generate(&boundary, &[4]).unwrap_err();
    assert!(matches!(err, GridError::CouldNotRecoverBoundary { .. }));
}

#[test]
fn morph_moves_field_points_with_parents() {
    let boundary = square(0., 1., 10);
    let grid = Grid::generate(&boundary, &[40]).unwrap();
    let moved: Vec<[f64; 2]> = boundary
        .iter()
        .map(|&[u, v]| [u * 1.2 + 0.1, v * 0.9 - 0.05 * u])
        .collect();

    let (morphed, field) = grid.morph(&moved).unwrap();
    let info = morphed.info();
    assert_eq!(info.points, grid.point_count());
    assert_eq!(info.triangle_vertices, grid.info().triangle_vertices);
    assert_eq!(info.parents, grid.info().parents);
    assert_eq!(&info.uv[..40], &moved[..]);
    assert_eq!(field.len(), info.points - 40);
    assert_eq!(&info.uv[40..], &field[..]);

    for (ip, parents) in info.parents.iter().enumerate().skip(40) {
        let parents = parents.unwrap();
        for k in 0..2 {
            let expected = parents.iter().map(|&p| info.uv[p][k]).sum::<f64>() / 3.;
            assert!((info.uv[ip][k] - expected).abs() < 1e-12);
        }
    }

    // the source grid is untouched
    assert_eq!(&grid.info().uv[..40], &boundary[..]);
}

#[test]
fn morph_rejects_wrong_boundary_length() {
    let grid = Grid::generate(&unit_square(), &[4]).unwrap();
    let err = grid.morph(&[[0., 0.], [1., 0.], [1., 1.]]).unwrap_err();
    assert!(matches!(
        err,
        GridError::NumberOfPointMismatch {
            expected: 4,
            found: 3
        }
    ));
}

#[test]
fn morph_onto_a_line_gives_degenerate_circles() {
    let grid = Grid::generate(&unit_square(), &[4]).unwrap();
    let line = [[0., 0.], [1., 0.], [2., 0.], [3., 0.]];
    let (morphed, _) = grid.morph(&line).unwrap();

    for triangle in &morphed.triangles {
        let [a, b, c] = triangle.p.map(|i| morphed.points[i].pos);
        assert_eq!(triangle.cc.radius_squared, f64::MAX);
        assert_eq!(triangle.cc.center, geometry::centroid(a, b, c));
    }
    let loaded = Grid::load_from_str(&morphed.dump_to_string()).unwrap();
    assert_eq!(loaded.triangles, morphed.triangles);
}

#[test]
fn loaded_grid_with_bad_vertex_reports_it() {
    let grid = Grid::load_from_str(
        "3 3 1\n0 0 1 -1 -1 -1\n1 0 1 -1 -1 -1\n0 1 1 -1 -1 -1\n0 1 7 -2 -2 -2 0.5 0.5 0.5\n",
    )
    .unwrap();

    assert_eq!(grid.triangle_uv(0), None);
    assert!(grid.triangles_uv().is_empty());
    assert!(matches!(
        grid.area(),
        Err(GridError::BadPointIndex { index: 7, count: 3 })
    ));
    assert!(matches!(
        grid.morph(&[[0., 0.], [2., 0.], [0., 2.]]),
        Err(GridError::BadPointIndex { index: 7, count: 3 })
    ));
}

#[test]
fn info_is_built_once() {
    let grid = Grid::generate(&square(0., 1., 5), &[20]).unwrap();
    let first = grid.info();
    let second = grid.info();
    assert!(std::ptr::eq(first.uv, second.uv));
    assert!(std::ptr::eq(first.triangle_vertices, second.triangle_vertices));
    assert_eq!(first.points, first.uv.len());
    assert_eq!(first.triangles, first.triangle_vertices.len());
    assert_eq!(first.boundary_count, 20);
    assert!(first.parents[..20].iter().all(Option::is_none));
    assert!(first.parents[20..].iter().all(Option::is_some));
}

#[test]
fn dump_load_round_trip() {
    let mut boundary = square(0., 1., 6);
    boundary.extend([[0.3, 0.3], [0.3, 0.7], [0.7, 0.7], [0.7, 0.3]]);
    let grid = Grid::generate(&boundary, &[24, 4]).unwrap();

    let mut bytes = Vec::new();
    grid.dump(&mut bytes).unwrap();
    let loaded = Grid::load(&bytes[..]).unwrap();

    assert_eq!(loaded.nbnd, grid.nbnd);
    assert_eq!(loaded.points, grid.points);
    assert_eq!(loaded.triangles, grid.triangles);
    assert_eq!(loaded.dump_to_string(), String::from_utf8(bytes).unwrap());
}

#[test]
fn load_reports_bad_lines() {
    let err = Grid::load_from_str("3 3 1\n0 0 1 -1 -1 -1\n1 0 1 -1 -1 -1\n").unwrap_err();
    assert!(matches!(err, GridError::Parse { line: 4, .. }));

    let err = Grid::load_from_str("1 1 0\n0 zero 1 -1 -1 -1\n").unwrap_err();
    assert!(matches!(err, GridError::Parse { line: 2, .. }));

    let err = Grid::load_from_str("1 1 0\n0 0 1 -1 0 -1\n").unwrap_err();
    assert!(matches!(err, GridError::Parse { line: 2, .. }));

    let grid = Grid::load_from_str(
        "3 3 1\n0 0 1 -1 -1 -1\n1 0 1 -1 -1 -1\n0 1 1 -1 -1 -1\n\n0 1 2 -2 -2 -2 0.5 0.5 0.5\n",
    )
    .unwrap();
    assert_eq!(grid.triangle_count(), 1);
    assert_eq!(grid.boundary_edges().len(), 3);
}

#[test]
fn intersect_checks_point_count() {
    // before insertion there are 8 points but only the 2 seed triangles
    let mesher = Mesher::new(&unit_square(), &[4], GridConfig::default()).unwrap();
    assert_eq!(mesher.points.len(), 8);
    assert_eq!(mesher.triangles.len(), 2);

    assert!(mesher.intersect(0, 2, 1, 3).unwrap());
    assert!(!mesher.intersect(0, 1, 2, 3).unwrap());
    assert!(mesher.intersect(4, 6, 5, 7).unwrap());
    assert!(matches!(
        mesher.intersect(0, 1, 2, 8),
        Err(GridError::BadPointIndex { index: 8, count: 8 })
    ));
}

#[test]
fn flip_requires_a_convex_quad() {
    let mut mesher = Mesher::new(&unit_square(), &[4], GridConfig::default()).unwrap();

    // seeds are (h0, h1, h2) and (h0, h2, h3); side 0 of the first faces outward
    assert!(matches!(
        mesher.flip(0, 0),
        Err(GridError::CannotSwap { triangle: 0, side: 0 })
    ));
    assert!(matches!(
        mesher.flip(5, 0),
        Err(GridError::BadTriangleIndex { index: 5, count: 2 })
    ));

    // side 1 is the shared diagonal h2-h0
    mesher.flip(0, 1).unwrap();
    assert_eq!(mesher.triangles[0].p, [5, 6, 7]);
    assert_eq!(mesher.triangles[1].p, [5, 7, 4]);
    assert_eq!(mesher.triangles[0].t[1], Neighbor::Triangle(1));
    assert_eq!(mesher.triangles[1].t[2], Neighbor::Triangle(0));
}

#[test]
fn compaction_is_idempotent() {
    let mut boundary = square(0., 1., 8);
    boundary.extend([[0.4, 0.4], [0.4, 0.6], [0.6, 0.6], [0.6, 0.4]]);
    let mut mesher = Mesher::new(&boundary, &[32, 4], GridConfig::default()).unwrap();
    mesher.process().unwrap();

    let points = mesher.points.clone();
    let triangles = mesher.triangles.clone();

    mesher.compact();
    assert_eq!(mesher.points, points);
    assert_eq!(mesher.triangles, triangles);
    assert_eq!(mesher.nbnd, 36);
}
