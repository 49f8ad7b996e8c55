#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use spotmap_algorithms::{
    extract_section, map_vertices, voxelize, Aabb, NoProgress, Plane, VoxelizeConfig,
};
use spotmap_core::glam::Vec3;
use spotmap_core::{SpotDataset, SpotRecord};

fn dataset() -> SpotDataset {
    [
        ("a", [0.0, 0.0, 0.0], 1.0, vec![1.0, 5.0]),
        ("b", [3.0, 0.0, 0.0], 1.0, vec![2.0, f32::NAN]),
        ("c", [1.5, 0.0, 0.0], 2.0, vec![3.0, 1.0]),
    ]
    .into_iter()
    .map(|(name, [x, y, z], r, measures)| SpotRecord {
        name: name.to_string(),
        x,
        y,
        z,
        r,
        measures,
    })
    .collect()
}

#[test]
fn test_mapping_from_dataset() {
    let spots = dataset().spots(0).unwrap();
    let positions = [
        0.1, 0.0, 0.0, // nearest to a
        10.0, 0.0, 0.0, // nothing
        1.5, 1.0, 0.0, // only c
        2.9, 0.0, 0.0, // b and c, b nearer
    ];
    let mapping = map_vertices(&positions, &spots, &NoProgress).unwrap();
    assert_eq!(mapping.closest_spot_indices, vec![0, -1, 2, 1]);
    assert_relative_eq!(mapping.closest_spot_distances[0], 0.1, epsilon = 1e-6);
    assert_relative_eq!(mapping.closest_spot_distances[1], 1.0);
    assert_relative_eq!(mapping.closest_spot_distances[2], 0.5, epsilon = 1e-6);
    assert_relative_eq!(mapping.closest_spot_distances[3], 0.1, epsilon = 1e-5);
}

#[test]
fn test_voxel_buffer_lengths() {
    let spots = dataset().spots(1).unwrap();
    for lengths in [[1, 1, 1], [7, 3, 2], [16, 16, 16]] {
        let out = voxelize(
            lengths,
            Vec3::new(4.0, 4.0, 4.0),
            &spots,
            &VoxelizeConfig::default(),
            &NoProgress,
        )
        .unwrap();
        let count = lengths.iter().product::<usize>();
        assert_eq!(out.intensity.len(), count, "lengths {:?}", lengths);
        assert_eq!(out.opacity.len(), count, "lengths {:?}", lengths);
        assert!(out.intensity.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    let empty = voxelize([5, 4, 3], Vec3::ONE, &[], &VoxelizeConfig::default(), &NoProgress).unwrap();
    assert_eq!(empty.intensity, vec![0.0; 60]);
    assert_eq!(empty.opacity, vec![0.0; 60]);
}

#[test]
fn test_measure_without_value_is_not_voxelized() {
    // Spot b has no value for measure 1 and is far from the others.
    let spots = dataset().spots(1).unwrap();
    let out = voxelize(
        [8, 1, 1],
        Vec3::new(8.0, 1.0, 1.0),
        &spots,
        &VoxelizeConfig::default(),
        &NoProgress,
    )
    .unwrap();
    assert_relative_eq!(out.opacity[7], 0.0);
    let bounds = out.bounds.unwrap();
    assert_relative_eq!(bounds.min, 1.0);
    assert_relative_eq!(bounds.max, 5.0);
}

#[test]
fn test_unit_box_sections() {
    let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);

    let half = Plane::from_normal_and_point(Vec3::Z, Vec3::new(0.0, 0.0, 0.5)).unwrap();
    let section = extract_section(&aabb, &half);
    assert_eq!(section.vertices.len(), 4);
    assert_eq!(section.indices.len() / 3, 2);
    assert_eq!(section.edges.len(), 4);

    let outside = Plane::from_normal_and_point(Vec3::Z, Vec3::new(0.0, 0.0, 2.0)).unwrap();
    let section = extract_section(&aabb, &outside);
    assert!(section.vertices.is_empty());
    assert!(section.indices.is_empty());
    assert!(section.edges.is_empty());
}

#[test]
fn test_oblique_section_vertices_lie_on_plane() {
    let aabb = Aabb::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(3.0, 2.0, 5.0));
    let plane = Plane::from_normal_and_point(Vec3::new(1.0, 2.0, -0.5), aabb.center()).unwrap();
    let section = extract_section(&aabb, &plane);
    assert!((3..=6).contains(&section.vertices.len()));
    assert_eq!(section.indices.len(), (section.vertices.len() - 2) * 3);
    for v in &section.vertices {
        assert_relative_eq!(plane.signed_distance(*v), 0.0, epsilon = 1e-4);
        assert!(aabb.contains(*v + (aabb.center() - *v) * 1e-4));
    }
}
