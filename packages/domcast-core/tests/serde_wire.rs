#![cfg(feature = "serde")]

//! Wire-shape checks: the reference form really is `{"i":N}`, full payloads
//! use the short field names, and batches survive a JSON round trip.

use serde_json::json;

use domcast_core::{
    AttributeData, DiffBatch, MirrorId, NodeData, NodeKind, PositionData, TextData,
};

#[test]
fn reference_form_serializes_to_id_only() {
    let value = serde_json::to_value(NodeData::reference(MirrorId(5))).unwrap();
    assert_eq!(value, json!({ "i": 5 }));
}

#[test]
fn element_payload_uses_short_field_names() {
    let mut data = NodeData::new(MirrorId(1), NodeKind::Element);
    data.tag = Some("div".to_owned());
    data.attributes = Some([("id".to_owned(), "x".to_owned())].into_iter().collect());
    data.compressed = true;

    let value = serde_json::to_value(&data).unwrap();
    assert_eq!(
        value,
        json!({
            "i": 1,
            "nT": "Element",
            "tN": "div",
            "a": { "id": "x" },
            "c": true
        })
    );
}

#[test]
fn position_record_flattens_the_node_fields() {
    let record = PositionData {
        node: NodeData::reference(MirrorId(4)),
        parent: Some(NodeData::reference(MirrorId(2))),
        previous_sibling: Some(NodeData::reference(MirrorId(3))),
    };
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(
        value,
        json!({
            "i": 4,
            "parentNode": { "i": 2 },
            "previousSibling": { "i": 3 }
        })
    );
}

#[test]
fn tombstones_serialize_as_null() {
    let record = AttributeData {
        node: NodeData::reference(MirrorId(1)),
        attributes: [
            ("class".to_owned(), None),
            ("id".to_owned(), Some("x".to_owned())),
        ]
        .into_iter()
        .collect(),
    };
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(
        value,
        json!({
            "i": 1,
            "attributes": { "class": null, "id": "x" }
        })
    );
}

#[test]
fn empty_batch_serializes_to_an_empty_object() {
    let value = serde_json::to_value(DiffBatch::default()).unwrap();
    assert_eq!(value, json!({}));
    let back: DiffBatch = serde_json::from_value(json!({})).unwrap();
    assert!(back.is_empty());
}

#[test]
fn full_batch_round_trips() {
    let mut added = NodeData::new(MirrorId(4), NodeKind::Element);
    added.tag = Some("b".to_owned());
    added.attributes = Some(Default::default());
    added.compressed = true;
    let mut embedded = NodeData::new(MirrorId(5), NodeKind::Text);
    embedded.text = Some("bye".to_owned());
    embedded.compressed = true;
    added.children = Some(vec![embedded]);

    let batch = DiffBatch {
        removed: vec![NodeData::reference(MirrorId(9))],
        added_or_moved: vec![PositionData {
            node: added,
            parent: Some(NodeData::reference(MirrorId(2))),
            previous_sibling: None,
        }],
        attributes: vec![AttributeData {
            node: NodeData::reference(MirrorId(2)),
            attributes: [("class".to_owned(), Some("done".to_owned()))]
                .into_iter()
                .collect(),
        }],
        text: vec![TextData {
            node: NodeData::reference(MirrorId(5)),
            text_content: "raw".to_owned(),
        }],
    };

    let encoded = serde_json::to_string(&batch).unwrap();
    let decoded: DiffBatch = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, batch);

    // The position array rides under its wire name.
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert!(value.get("addedOrMoved").is_some());
    assert!(value.get("added_or_moved").is_none());
}

#[test]
fn doctype_payload_round_trips() {
    let mut data = NodeData::new(MirrorId(7), NodeKind::DocumentType);
    data.name = Some("html".to_owned());
    data.public_id = Some("pub".to_owned());
    data.system_id = Some("sys".to_owned());

    let value = serde_json::to_value(&data).unwrap();
    assert_eq!(
        value,
        json!({ "i": 7, "nT": "DocumentType", "n": "html", "p": "pub", "s": "sys" })
    );
    let back: NodeData = serde_json::from_value(value).unwrap();
    assert_eq!(back, data);
}
