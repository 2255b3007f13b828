use riposte3d::math::{Point, Real};

/// The eight corners of an axis-aligned cube, bit `i & 1` selecting x,
/// `i & 2` selecting y and `i & 4` selecting z.
pub fn cube_vertices(center: Point<Real>, half: Real) -> Vec<Point<Real>> {
    (0..8)
        .map(|i| {
            Point::new(
                center.x + if i & 1 != 0 { half } else { -half },
                center.y + if i & 2 != 0 { half } else { -half },
                center.z + if i & 4 != 0 { half } else { -half },
            )
        })
        .collect()
}

/// A CCW-outward triangulation of the cube above.
pub fn cube_indices() -> Vec<u32> {
    vec![
        0, 2, 3, 0, 3, 1, // bottom
        4, 5, 7, 4, 7, 6, // top
        0, 4, 6, 0, 6, 2, // -x
        1, 3, 7, 1, 7, 5, // +x
        0, 1, 5, 0, 5, 4, // -y
        2, 6, 7, 2, 7, 3, // +y
    ]
}

/// A CCW-outward tetrahedron spanning the origin and the three unit axes.
pub fn tetrahedron() -> (Vec<Point<Real>>, Vec<u32>) {
    let vertices = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
    ];
    let indices = vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];
    (vertices, indices)
}
