//! Integration tests: store → snapshot → store.

use nf_core::{ElementId, FlowOptions, FlowSnapshot, GraphStore, NodeChange, SnapshotError};
use pretty_assertions::assert_eq;

fn load() -> GraphStore {
    let json = include_str!("fixtures/pipeline.json");
    FlowSnapshot::restore_json(json, FlowOptions::default()).unwrap()
}

#[test]
fn json_preserves_nodes_edges_and_viewport() {
    let store = load();
    let json = store.to_snapshot().to_json().unwrap();
    let again = FlowSnapshot::restore_json(&json, FlowOptions::default()).unwrap();

    assert_eq!(again.to_snapshot(), store.to_snapshot());
    let transform = again.node(ElementId::intern("transform")).unwrap();
    assert_eq!(transform.parent, Some(ElementId::intern("group")));
}

#[test]
fn msgpack_preserves_selection_and_data() {
    let mut store = load();
    store.apply_changes(&[NodeChange::Select {
        id: ElementId::intern("input"),
        selected: true,
    }
    .into()]);

    let bytes = store.to_snapshot().to_msgpack().unwrap();
    let snap = FlowSnapshot::from_msgpack(&bytes).unwrap();
    let input = snap.nodes.iter().find(|n| n.id.as_str() == "input").unwrap();
    assert!(input.selected);
    assert_eq!(input.data["label"], "Input");
}

#[test]
fn parent_cycle_in_snapshot_is_rejected() {
    let json = r#"{
        "nodes": [
            { "id": "a", "position": { "x": 0, "y": 0 }, "parentNode": "b" },
            { "id": "b", "position": { "x": 0, "y": 0 }, "parentNode": "a" }
        ]
    }"#;
    let err = FlowSnapshot::restore_json(json, FlowOptions::default()).unwrap_err();
    assert!(matches!(err, SnapshotError::Invalid(_)), "{err}");
}

#[test]
fn duplicate_node_ids_are_rejected() {
    let json = r#"{
        "nodes": [
            { "id": "a", "position": { "x": 0, "y": 0 } },
            { "id": "a", "position": { "x": 5, "y": 5 } }
        ]
    }"#;
    assert!(FlowSnapshot::restore_json(json, FlowOptions::default()).is_err());
}
