mod common;

use common::{cube_indices, cube_vertices};
use riposte3d::math::{Isometry, Point, Real};
use riposte3d::{ObjectId, ObjectOptions, Scene, SceneError};
use std::collections::HashSet;

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

fn pair_set(pairs: &[(ObjectId, ObjectId)]) -> HashSet<(ObjectId, ObjectId)> {
    pairs.iter().copied().collect()
}

#[test]
fn deleting_an_object_keeps_the_other_pairs() {
    let mut scene = Scene::new();
    // All four cubes at the same spot: every pair overlaps.
    for _ in 0..4 {
        let _ = add_cube(&mut scene, Isometry::identity());
    }
    assert_eq!(scene.len(), 4);
    assert_eq!(scene.overlapping_pairs().len(), 6);

    scene.delete_object(2).unwrap();

    assert_eq!(scene.len(), 3);
    let expected = pair_set(&[(0, 1), (0, 3), (1, 3)]);
    assert_eq!(pair_set(&scene.overlapping_pairs()), expected);
    assert_eq!(pair_set(&scene.query_intersection(false)), expected);

    // The survivors keep answering by their original ids.
    for id in [0, 1, 3] {
        scene
            .set_transform(id, &Isometry::translation(id as Real * 10.0, 0.0, 0.0))
            .unwrap();
    }
    assert!(scene.overlapping_pairs().is_empty());

    // The deleted id is gone.
    assert!(matches!(
        scene.set_transform(2, &Isometry::identity()),
        Err(SceneError::InvalidHandle(2))
    ));
    assert!(matches!(
        scene.delete_object(2),
        Err(SceneError::InvalidHandle(2))
    ));
}

#[test]
fn freed_ids_are_reused() {
    let mut scene = Scene::new();
    for _ in 0..3 {
        let _ = add_cube(&mut scene, Isometry::identity());
    }
    scene.delete_object(1).unwrap();
    let id = add_cube(&mut scene, Isometry::translation(5.0, 0.0, 0.0));
    assert_eq!(id, 1);
}

#[test]
fn copied_objects_share_the_mesh_but_not_the_transform() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = scene.copy_object(a).unwrap();
    assert_ne!(a, b);

    scene
        .set_transform(b, &Isometry::translation(2.0, 0.0, 0.0))
        .unwrap();

    let distances = scene.query_exact_distance(false, Real::MAX);
    assert_eq!(distances.len(), 1);
    assert!((distances[0].distance - 1.0).abs() < 1.0e-6);

    // Copying a deleted object fails cleanly.
    scene.delete_object(a).unwrap();
    assert!(matches!(
        scene.copy_object(a),
        Err(SceneError::InvalidHandle(_))
    ));
}

#[test]
fn deactivation_gates_queries_and_is_idempotent() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, Isometry::translation(0.25, 0.0, 0.0));

    assert_eq!(scene.query_intersection(false), vec![(a, b)]);

    scene.deactivate_pair(a, b).unwrap();
    scene.deactivate_pair(a, b).unwrap();
    assert!(scene.overlapping_pairs().is_empty());
    assert!(scene.query_intersection(false).is_empty());

    scene.activate_pair(a, b).unwrap();
    scene.activate_pair(a, b).unwrap();
    assert_eq!(scene.query_intersection(false), vec![(a, b)]);

    scene.deactivate(a).unwrap();
    assert!(scene.query_intersection(false).is_empty());
    scene.activate_all();
    assert_eq!(scene.query_intersection(false), vec![(a, b)]);

    scene.deactivate_all();
    assert!(scene.query_intersection(false).is_empty());
}

#[test]
fn batched_transforms_validate_every_id() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, Isometry::identity());

    let bad = [
        (a, Isometry::translation(1.0, 0.0, 0.0)),
        (42, Isometry::identity()),
    ];
    assert!(matches!(
        scene.set_all_transforms(&bad),
        Err(SceneError::InvalidHandle(42))
    ));

    let good = [
        (a, Isometry::translation(10.0, 0.0, 0.0)),
        (b, Isometry::translation(-10.0, 0.0, 0.0)),
    ];
    scene.set_all_transforms(&good).unwrap();
    assert!(scene.overlapping_pairs().is_empty());
}

#[test]
fn bad_decomposition_leaves_the_scene_unchanged() {
    let mut scene = Scene::new();
    let verts = cube_vertices(Point::origin(), 0.5);
    let result = scene.add_general_object(
        &verts,
        &cube_indices(),
        None,
        Some(&[0, 0, 0]), // 12 triangles, only 3 piece ids
        Default::default(),
        Isometry::identity(),
        1.0,
        ObjectOptions::default(),
    );
    assert!(matches!(
        result,
        Err(SceneError::BadDecomposition {
            expected: 12,
            got: 3
        })
    ));
    assert!(scene.is_empty());
}
