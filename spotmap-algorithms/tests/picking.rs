use approx::assert_relative_eq;
use spotmap_algorithms::{map_vertices, pick_spot, raycast, NoProgress, Ray, Spot};
use spotmap_core::glam::{Mat4, Vec3};

/// Two triangles side by side in the z = 0 plane.
fn strip() -> Vec<f32> {
    vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
        2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 2.0, 1.0, 0.0,
    ]
}

#[test]
fn test_world_ray_picks_spot_label() {
    let positions = strip();
    let spots = vec![
        Spot::new("left", Vec3::new(0.0, 0.0, 0.0), 0.5, 1.0).unwrap(),
        Spot::new("right", Vec3::new(3.0, 0.0, 0.0), 0.5, 2.0).unwrap(),
    ];
    let mapping = map_vertices(&positions, &spots, &NoProgress).unwrap();

    // The mesh is placed 10 units up and scaled by 2.
    let world = Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)) * Mat4::from_scale(Vec3::splat(2.0));
    let ray = Ray::new(Vec3::new(4.5, 0.5, 20.0), Vec3::new(0.0, 0.0, -1.0));
    let local = ray.to_local(&world).unwrap();

    let hit = raycast(&local, &positions).unwrap().unwrap();
    assert_eq!(hit.triangle_index, 1);
    // Distance is measured in the mesh's local space.
    assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);

    let spot = pick_spot(&hit, &mapping).unwrap();
    assert_eq!(spots[spot].name(), "right");
}

#[test]
fn test_miss_picks_nothing() {
    let ray = Ray::new(Vec3::new(5.0, 5.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
    assert!(raycast(&ray, &strip()).unwrap().is_none());
}

#[test]
fn test_empty_mesh() {
    let ray = Ray::new(Vec3::ZERO, Vec3::Z);
    assert!(raycast(&ray, &[]).unwrap().is_none());
}
