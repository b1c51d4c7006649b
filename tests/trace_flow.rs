//! End-to-end flow: decoded wire JSON through conversion, editing with
//! undo, and re-encoding.

use trace_engine::{
    convert, find_index_from_distance, updater::TraceUpdater, Marker, MarkerType, PointEditor,
    TracePatch, WireTrace,
};

fn wire_fixture() -> WireTrace {
    let json = serde_json::json!({
        "lat": [45.0, 45.001, 45.002, 45.003, 45.004],
        "lng": [6.0, 6.0, 6.001, 6.001, 6.002],
        "alt": [1000.0, 1020.0, 1015.0, 1040.0, 1060.0],
        "zip": 0,
        "text": [
            { "index": 2, "text": { "en": "halfway" }, "icon": "https://icons/flag.png" }
        ],
        "poi": [
            { "lat": 45.002, "lng": 6.0010001, "icon": "https://icons/flag.png" }
        ]
    });
    serde_json::from_value(json).expect("fixture deserializes")
}

#[test]
fn wire_to_trace_to_editor_round_trip() {
    let trace = convert::from_wire(wire_fixture()).expect("conversion succeeds");

    assert_eq!(trace.len(), 5);
    assert!(trace.show_profile);
    assert!(trace.dis.windows(2).all(|w| w[1] >= w[0]));
    assert!(trace.ascent > 0.0);

    // Legacy markers migrated: step anchored at index 2, POI snapped onto
    // the trace, both sharing one icon table entry
    assert_eq!(trace.markers.len(), 2);
    assert_eq!(trace.markers[0].marker_type, MarkerType::Checkpoint);
    assert_eq!(trace.markers[0].index, Some(2));
    assert_eq!(trace.markers[1].index, Some(2));
    assert_eq!(trace.icon_urls.len(), 1);

    // Distance lookup against the derived dis array
    let mid = trace.dis[2];
    assert_eq!(find_index_from_distance(&trace.dis, mid), Some(2));
    assert_eq!(
        find_index_from_distance(&trace.dis, trace.dis[4] + 1.0),
        None
    );

    // Interactive edits with undo
    let mut updater = TraceUpdater::new(trace);
    let before = updater.trace().clone();

    let id = updater.add_marker(Marker {
        lat: 45.003,
        lng: 6.001,
        ..Default::default()
    });
    assert_eq!(id, 3);
    assert_eq!(updater.marker(id).unwrap().index, Some(3));

    updater.update(
        TracePatch {
            distance: Some(9999.0),
            ..Default::default()
        },
        true,
    );

    assert!(updater.undo());
    assert!(updater.undo());
    assert_eq!(*updater.trace(), before);

    assert!(updater.redo());
    assert!(updater.redo());
    assert!(updater.has_marker(id));
    assert_eq!(updater.trace().distance, 9999.0);

    // Re-encode compressed and come back within codec tolerance
    let wire = convert::to_wire(updater.trace(), true);
    assert_eq!(wire.zip, 1);
    let restored = convert::from_wire(wire).expect("re-conversion succeeds");
    for (a, b) in updater.trace().lat.iter().zip(&restored.lat) {
        assert!((a - b).abs() <= 1e-6);
    }
    assert_eq!(restored.markers.len(), 3);
}

#[test]
fn splice_editor_tracks_trace_shape() {
    let trace = convert::from_wire(wire_fixture()).expect("conversion succeeds");
    let mut editor = PointEditor::new(trace.lat.clone(), trace.lng.clone());

    editor.append(45.005, 6.002);
    editor.move_point(0, 44.999, 6.0);
    editor.invert();
    assert_eq!(editor.lat()[0], 45.005);

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(editor.undo());
    assert_eq!(editor.lat(), trace.lat.as_slice());
    assert_eq!(editor.lng(), trace.lng.as_slice());
}
