mod common;

use approx::assert_relative_eq;
use common::{cube_indices, cube_vertices};
use riposte3d::math::{Isometry, Point, Real};
use riposte3d::{ObjectId, ObjectOptions, Scene, SplitStrategy};

/// One object made of two disjoint convex pieces: a cube at the origin and a
/// cube centered at (6, 0, 0).
fn add_dumbbell(scene: &mut Scene, position: Isometry<Real>) -> ObjectId {
    let mut vertices = cube_vertices(Point::origin(), 0.5);
    vertices.extend(cube_vertices(Point::new(6.0, 0.0, 0.0), 0.5));

    let mut indices = cube_indices();
    indices.extend(cube_indices().iter().map(|i| i + 8));

    let mut pieces = vec![0u32; 12];
    pieces.extend(vec![1u32; 12]);

    scene
        .add_general_object(
            &vertices,
            &indices,
            None,
            Some(&pieces),
            SplitStrategy::Gap,
            position,
            1.0,
            ObjectOptions::default(),
        )
        .unwrap()
}

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

#[test]
fn recursion_finds_the_nearest_piece() {
    let mut scene = Scene::new();
    let _ = add_dumbbell(&mut scene, Isometry::identity());
    // Probe cube above the first piece: distance 2.5 - 0.5 = 2.0. The other
    // piece is much farther away.
    let _ = add_cube(&mut scene, Isometry::translation(0.0, 3.0, 0.0));

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, 2.0, epsilon = 1.0e-6);
}

#[test]
fn recursion_detects_piece_level_intersection() {
    let mut scene = Scene::new();
    let a = add_dumbbell(&mut scene, Isometry::identity());
    // Overlaps the second piece only.
    let b = add_cube(&mut scene, Isometry::translation(6.0, 0.5, 0.0));

    assert_eq!(scene.query_intersection(false), vec![(a, b)]);
}

#[test]
fn probe_between_the_pieces_is_disjoint() {
    let mut scene = Scene::new();
    let _ = add_dumbbell(&mut scene, Isometry::identity());
    // Right in the middle of the dumbbell: inside the root hull but outside
    // both pieces.
    let _ = add_cube(&mut scene, Isometry::translation(3.0, 0.0, 0.0));

    assert!(scene.query_intersection(false).is_empty());

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, 2.0, epsilon = 1.0e-6);
}

#[test]
fn general_object_without_decomposition_behaves_like_convex() {
    let mut scene = Scene::new();
    let _ = scene
        .add_general_object(
            &cube_vertices(Point::origin(), 0.5),
            &cube_indices(),
            None,
            None,
            SplitStrategy::Mean,
            Isometry::identity(),
            1.0,
            ObjectOptions::default(),
        )
        .unwrap();
    let _ = add_cube(&mut scene, Isometry::translation(2.0, 0.0, 0.0));

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert_relative_eq!(distances[0].distance, 1.0, epsilon = 1.0e-6);
}

#[test]
fn approximate_distance_respects_the_error_bound() {
    let mut scene = Scene::new();
    let _ = add_dumbbell(&mut scene, Isometry::identity());
    let _ = add_cube(&mut scene, Isometry::translation(0.0, 3.0, 0.0));

    let exact = scene.query_exact_distance(false, Real::MAX)[0].distance;
    let approx = scene.query_approximate_distance(false, Real::MAX, 0.25, 0.0);
    assert_eq!(approx.len(), 1);
    assert!((approx[0].distance - exact).abs() <= 0.25 + 1.0e-9);
}
