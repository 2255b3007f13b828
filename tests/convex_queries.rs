mod common;

use approx::assert_relative_eq;
use common::{cube_indices, cube_vertices, tetrahedron};
use riposte3d::math::{Isometry, Point, Real, Vector};
use riposte3d::{ObjectId, ObjectOptions, Scene};

fn add_cube(scene: &mut Scene, position: Isometry<Real>) -> ObjectId {
    scene
        .add_convex_object(
            &cube_vertices(Point::origin(), 0.5),
            &cube_indices(),
            None,
            position,
            1.0,
            ObjectOptions::default(),
        )
        .unwrap()
}

fn translation(x: Real, y: Real, z: Real) -> Isometry<Real> {
    Isometry::translation(x, y, z)
}

#[test]
fn separated_cubes_do_not_intersect() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, translation(3.0, 0.0, 0.0));

    assert!(scene.query_intersection(false).is_empty());

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_eq!((distances[0].id1, distances[0].id2), (a, b));
    // Gap between the faces at x = 0.5 and x = 2.5.
    assert_relative_eq!(distances[0].distance, 2.0, epsilon = 1.0e-6);
}

#[test]
fn face_to_face_unit_gap() {
    let mut scene = Scene::new();
    let _ = add_cube(&mut scene, Isometry::identity());
    let _ = add_cube(&mut scene, translation(2.0, 0.0, 0.0));

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, 1.0, epsilon = 1.0e-6);
}

#[test]
fn overlapping_cubes_intersect() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, translation(0.5, 0.0, 0.0));

    let hits = scene.query_intersection(false);
    assert_eq!(hits, vec![(a, b)]);
}

#[test]
fn distance_is_symmetric() {
    let pos1 = translation(0.1, -0.3, 0.2);
    let pos2 = Isometry::new(Vector::new(2.5, 0.7, -0.4), Vector::new(0.3, 0.1, 0.9));

    let mut scene_ab = Scene::new();
    let _ = add_cube(&mut scene_ab, pos1);
    let _ = add_cube(&mut scene_ab, pos2);
    let d_ab = scene_ab.query_exact_distance(false, Real::MAX)[0].distance;

    let mut scene_ba = Scene::new();
    let _ = add_cube(&mut scene_ba, pos2);
    let _ = add_cube(&mut scene_ba, pos1);
    let d_ba = scene_ba.query_exact_distance(false, Real::MAX)[0].distance;

    assert_relative_eq!(d_ab, d_ba, epsilon = 1.0e-9);
}

#[test]
fn queries_are_idempotent() {
    let mut scene = Scene::new();
    let _ = add_cube(&mut scene, Isometry::identity());
    let _ = add_cube(
        &mut scene,
        Isometry::new(Vector::new(2.2, 0.4, 0.1), Vector::new(0.2, 0.5, 0.1)),
    );

    let first = scene.query_exact_distance(false, Real::MAX);
    let second = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].distance, second[0].distance);

    let i1 = scene.query_intersection(false);
    let i2 = scene.query_intersection(false);
    assert_eq!(i1, i2);
}

#[test]
fn diagonal_offset_is_an_edge_edge_case() {
    let mut scene = Scene::new();
    let _ = add_cube(&mut scene, Isometry::identity());
    let _ = add_cube(&mut scene, translation(2.0, 2.0, 0.0));

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, (2.0 as Real).sqrt(), epsilon = 1.0e-6);
}

#[test]
fn tetrahedron_to_cube_distance() {
    let mut scene = Scene::new();
    let (verts, indices) = tetrahedron();
    let _ = scene
        .add_convex_object(
            &verts,
            &indices,
            None,
            Isometry::identity(),
            1.0,
            ObjectOptions::default(),
        )
        .unwrap();
    let _ = add_cube(&mut scene, translation(3.0, 0.0, 0.0));

    // Tetrahedron apex at (1, 0, 0), near cube face at x = 2.5.
    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, 1.5, epsilon = 1.0e-6);
}

#[test]
fn tolerance_query_brackets_the_gap() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, translation(2.0, 0.0, 0.0));

    assert_eq!(scene.query_tolerance(false, 1.5), vec![(a, b)]);
    assert!(scene.query_tolerance(false, 0.5).is_empty());
}

#[test]
fn approximate_distance_on_convex_pairs_is_exact() {
    let mut scene = Scene::new();
    let _ = add_cube(&mut scene, Isometry::identity());
    let _ = add_cube(&mut scene, translation(2.0, 0.0, 0.0));

    let distances = scene.query_approximate_distance(false, Real::MAX, 0.1, 0.05);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, 1.0, epsilon = 1.0e-6);
}

#[test]
fn contacts_report_points_normals_and_features() {
    let mut scene = Scene::new();
    let _ = add_cube(&mut scene, Isometry::identity());
    let _ = add_cube(&mut scene, translation(2.0, 0.0, 0.0));

    let reports = scene.query_contacts(false, 1.5);
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].contacts.is_empty());

    for contact in &reports[0].contacts {
        assert_relative_eq!(contact.dist, 1.0, epsilon = 1.0e-6);
        assert_relative_eq!(contact.point1.x, 0.5, epsilon = 1.0e-6);
        assert_relative_eq!(contact.point2.x, 1.5, epsilon = 1.0e-6);
        // The normal of the first object points toward the second.
        assert!(contact.normal1.x > 0.99);
        assert!(contact.normal2.x < -0.99);
    }
}

#[test]
fn random_axis_aligned_cubes_match_the_interval_oracle() {
    let mut rng = oorandom::Rand64::new(0x5eed);
    for _ in 0..20 {
        let cx = rng.rand_float() * 4.0 - 2.0;
        let cy = rng.rand_float() * 4.0 - 2.0;
        let cz = rng.rand_float() * 4.0 - 2.0;

        let mut scene = Scene::new();
        let _ = add_cube(&mut scene, Isometry::identity());
        let _ = add_cube(&mut scene, translation(cx, cy, cz));

        // Per-axis gaps between [-0.5, 0.5] and [c - 0.5, c + 0.5].
        let gap = |c: Real| (c.abs() - 1.0).max(0.0);
        let expected =
            (gap(cx).powi(2) + gap(cy).powi(2) + gap(cz).powi(2)).sqrt();
        let overlaps = gap(cx) == 0.0 && gap(cy) == 0.0 && gap(cz) == 0.0;

        let intersections = scene.query_intersection(false);
        assert_eq!(!intersections.is_empty(), overlaps, "at ({cx}, {cy}, {cz})");

        if !overlaps {
            let distances = scene.query_exact_distance(false, Real::MAX);
            assert_eq!(distances.len(), 1);
            assert_relative_eq!(distances[0].distance, expected, epsilon = 1.0e-6);
        }
    }
}
