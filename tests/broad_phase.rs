mod common;

use common::{cube_indices, cube_vertices};
use riposte3d::math::{Isometry, Point, Real, Vector};
use riposte3d::{ObjectId, ObjectOptions, Scene};
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

#[test]
fn candidates_iff_boxes_overlap() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, Isometry::translation(0.9, 0.0, 0.0));
    let c = add_cube(&mut scene, Isometry::translation(5.0, 0.0, 0.0));

    let pairs: HashSet<_> = scene.overlapping_pairs().into_iter().collect();
    assert!(pairs.contains(&(a, b)));
    assert!(!pairs.contains(&(a, c)));
    assert!(!pairs.contains(&(b, c)));
}

#[test]
fn touching_boxes_are_candidates() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, Isometry::translation(1.0, 0.0, 0.0));

    assert_eq!(scene.overlapping_pairs(), vec![(a, b)]);
}

#[test]
fn incremental_updates_track_movement() {
    let mut scene = Scene::new();
    let a = add_cube(&mut scene, Isometry::identity());
    let b = add_cube(&mut scene, Isometry::translation(0.9, 0.0, 0.0));
    let c = add_cube(&mut scene, Isometry::translation(5.0, 0.0, 0.0));

    assert_eq!(scene.overlapping_pairs(), vec![(a, b)]);

    scene
        .set_transform(c, &Isometry::translation(0.5, 0.5, 0.0))
        .unwrap();
    let pairs: HashSet<_> = scene.overlapping_pairs().into_iter().collect();
    assert_eq!(
        pairs,
        [(a, b), (a, c), (b, c)].into_iter().collect::<HashSet<_>>()
    );

    scene
        .set_transform(c, &Isometry::translation(-7.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(scene.overlapping_pairs(), vec![(a, b)]);
}

#[test]
fn random_churn_matches_the_aabb_oracle() {
    let mut rng = oorandom::Rand64::new(42);
    let mut scene = Scene::new();
    let n = 6u32;
    let ids: Vec<ObjectId> = (0..n).map(|_| add_cube(&mut scene, Isometry::identity())).collect();

    for _ in 0..25 {
        for &id in &ids {
            let t = Vector::new(
                rng.rand_float() * 6.0 - 3.0,
                rng.rand_float() * 6.0 - 3.0,
                rng.rand_float() * 6.0 - 3.0,
            );
            let axis = Vector::new(
                rng.rand_float() * 2.0 - 1.0,
                rng.rand_float() * 2.0 - 1.0,
                rng.rand_float() * 2.0 - 1.0,
            );
            scene.set_transform(id, &Isometry::new(t, axis)).unwrap();
        }

        let candidates: HashSet<_> = scene.overlapping_pairs().into_iter().collect();

        let mut expected = HashSet::new();
        for i in 0..n {
            for j in i + 1..n {
                let bi = scene.aabb(ids[i as usize]).unwrap();
                let bj = scene.aabb(ids[j as usize]).unwrap();
                if bi.intersects(&bj) {
                    let (a, b) = (ids[i as usize], ids[j as usize]);
                    let _ = expected.insert((a.min(b), a.max(b)));
                }
            }
        }

        assert_eq!(candidates, expected);
    }
}
