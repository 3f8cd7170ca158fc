//! Codec placement: element/text payloads are encoded exactly once on the
//! way out and decoded exactly once on the way in; the live-text channel
//! stays raw.

use domcast_core::{
    BufferedSink, ChangeSummary, Codec, MemoryDom, MirrorClient, MirrorId, TreeMirror,
};

/// Prefixes every encoded string with a marker and insists on seeing the
/// marker when decoding, so a payload decoded twice (or never encoded)
/// panics the test.
#[derive(Clone, Copy)]
struct MarkerCodec;

const MARKER: char = '\u{1}';

impl Codec for MarkerCodec {
    fn encode(&self, text: &str) -> String {
        format!("{MARKER}{text}")
    }

    fn decode(&self, text: &str) -> String {
        text.strip_prefix(MARKER)
            .expect("payload was not encoded exactly once")
            .to_owned()
    }
}

#[test]
fn snapshot_payloads_are_encoded_and_flagged() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let div = source.new_element("div");
    source.set_attribute(div, "title", "greeting").unwrap();
    source.append_child(root, div);
    let text = source.new_text("hello");
    source.append_child(div, text);

    let mut sink = BufferedSink::new();
    let _client = MirrorClient::connect(&source, root, MarkerCodec, &mut sink, Vec::new());

    let (_, children) = sink.take_init().unwrap();
    let div_data = &children[0];
    assert!(div_data.compressed);
    assert_eq!(
        div_data.attributes.as_ref().unwrap()["title"],
        format!("{MARKER}greeting")
    );
    let text_data = &div_data.children.as_ref().unwrap()[0];
    assert!(text_data.compressed);
    assert_eq!(text_data.text.as_deref(), Some("\u{1}hello"));
}

#[test]
fn payloads_decode_exactly_once_on_the_replica() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let div = source.new_element("div");
    source.set_attribute(div, "title", "greeting").unwrap();
    source.append_child(root, div);
    let text = source.new_text("hello");
    source.append_child(div, text);

    let replica = MemoryDom::new();
    let replica_root = replica.root();
    let mut mirror = TreeMirror::new(replica, replica_root, MarkerCodec);
    let mut client = MirrorClient::connect(&source, root, MarkerCodec, &mut mirror, Vec::new());

    let replica_div = mirror.node(MirrorId(1)).unwrap();
    assert_eq!(
        mirror.tree().attribute(replica_div, "title"),
        Some("greeting")
    );
    let replica_text = mirror.node(MirrorId(2)).unwrap();
    assert_eq!(mirror.tree().text(replica_text), "hello");

    // Attribute-change values ride the codec as well.
    source.set_attribute(div, "title", "farewell").unwrap();
    let summary = ChangeSummary {
        attribute_changed: [("title".to_owned(), vec![div])].into_iter().collect(),
        ..Default::default()
    };
    let batch = client.build_batch(&source, &summary);
    assert_eq!(
        batch.attributes[0].attributes["title"],
        Some(format!("{MARKER}farewell"))
    );
    mirror.apply_changed(&batch);
    assert_eq!(
        mirror.tree().attribute(replica_div, "title"),
        Some("farewell")
    );
}

#[test]
fn live_text_channel_is_raw() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let div = source.new_element("div");
    source.append_child(root, div);
    let text = source.new_text("before");
    source.append_child(div, text);

    let replica = MemoryDom::new();
    let replica_root = replica.root();
    let mut mirror = TreeMirror::new(replica, replica_root, MarkerCodec);
    let mut client = MirrorClient::connect(&source, root, MarkerCodec, &mut mirror, Vec::new());

    source.set_text(text, "after");
    let summary = ChangeSummary {
        character_data_changed: vec![text],
        ..Default::default()
    };
    let batch = client.build_batch(&source, &summary);
    // No marker: the channel bypasses the codec in both directions.
    assert_eq!(batch.text[0].text_content, "after");

    mirror.apply_changed(&batch);
    let replica_text = mirror.node(MirrorId(2)).unwrap();
    assert_eq!(mirror.tree().text(replica_text), "after");
}

#[test]
fn doctype_payloads_skip_the_codec() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let doctype = source.new_doctype("html", "pub", "sys");
    source.append_child(root, doctype);

    let mut sink = BufferedSink::new();
    let _client = MirrorClient::connect(&source, root, MarkerCodec, &mut sink, Vec::new());

    let (_, children) = sink.take_init().unwrap();
    assert!(!children[0].compressed);
    assert_eq!(children[0].name.as_deref(), Some("html"));
}
