use serde_json::json;
use spotmap_algorithms::SpotMapping;
use spotmap_core::glam::Vec3;
use spotmap_core::Spot;
use spotmap_tasks::{RaycastPayload, TaskMessage};

#[test]
fn test_status_tags() {
    let ready: TaskMessage<SpotMapping> = TaskMessage::Ready;
    assert_eq!(serde_json::to_value(&ready).unwrap(), json!({ "status": "ready" }));

    let working: TaskMessage<SpotMapping> = TaskMessage::Working {
        message: "Mapping: 5%".into(),
    };
    assert_eq!(
        serde_json::to_value(&working).unwrap(),
        json!({ "status": "working", "message": "Mapping: 5%" })
    );

    let failed: TaskMessage<SpotMapping> = TaskMessage::Failed {
        message: "bad input".into(),
    };
    assert_eq!(
        serde_json::to_value(&failed).unwrap(),
        json!({ "status": "failed", "message": "bad input" })
    );
}

#[test]
fn test_completed_payload_fields_sit_next_to_tag() {
    let completed = TaskMessage::Completed(SpotMapping {
        closest_spot_indices: vec![0, -1],
        closest_spot_distances: vec![0.5, 1.0],
    });
    let value = serde_json::to_value(&completed).unwrap();
    assert_eq!(
        value,
        json!({
            "status": "completed",
            "closest_spot_indices": [0, -1],
            "closest_spot_distances": [0.5, 1.0],
        })
    );

    let back: TaskMessage<SpotMapping> = serde_json::from_value(value).unwrap();
    assert_eq!(back, completed);
}

#[test]
fn test_parse_worker_messages() {
    let message: TaskMessage<RaycastPayload> =
        serde_json::from_str(r#"{ "status": "completed", "hit": null }"#).unwrap();
    assert_eq!(message, TaskMessage::Completed(RaycastPayload { hit: None }));
    assert!(message.is_terminal());

    let unknown = serde_json::from_str::<TaskMessage<RaycastPayload>>(r#"{ "status": "paused" }"#);
    assert!(unknown.is_err());
}

#[test]
fn test_spot_validated_on_deserialize() {
    let spot: Spot = serde_json::from_value(json!({
        "name": "a",
        "position": [1.0, 2.0, 3.0],
        "radius": 0.5,
        "intensity": 4.0
    }))
    .unwrap();
    assert_eq!(spot.position(), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(spot.radius(), 0.5);

    let zero_radius = json!({
        "name": "b",
        "position": [0.0, 0.0, 0.0],
        "radius": 0.0,
        "intensity": 1.0
    });
    let err = serde_json::from_value::<Spot>(zero_radius).unwrap_err();
    assert!(err.to_string().contains("radius"), "{err}");

    // Round trip keeps the same shape.
    let value = serde_json::to_value(&spot).unwrap();
    assert_eq!(serde_json::from_value::<Spot>(value).unwrap(), spot);
}
