use domcast_core::{
    ChangeObserver, ChangeSummary, IdentityCodec, MemoryDom, MirrorClient, QueuedObserver,
    TreeMirror,
};

fn new_mirror() -> TreeMirror<MemoryDom> {
    let replica = MemoryDom::new();
    let root = replica.root();
    TreeMirror::new(replica, root, IdentityCodec)
}

#[test]
fn initialize_reproduces_the_source_snapshot() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let doctype = source.new_doctype("html", "-//W3C//DTD HTML 4.01//EN", "about:legacy-compat");
    source.append_child(root, doctype);
    let html = source.new_element("html");
    source.append_child(root, html);
    let body = source.new_element("body");
    source.set_attribute(body, "class", "main").unwrap();
    source.set_attribute(body, "id", "top").unwrap();
    source.append_child(html, body);
    let p = source.new_element("p");
    source.append_child(body, p);
    let hello = source.new_text("hello world");
    source.append_child(p, hello);

    let mut mirror = new_mirror();
    let _client = MirrorClient::connect(&source, root, IdentityCodec, &mut mirror, Vec::new());

    assert_eq!(mirror.tree().export(mirror.root()), source.export(root));
}

#[test]
fn text_and_doctype_children_round_trip_at_the_root() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let stray = source.new_text("stray");
    source.append_child(root, stray);
    let doctype = source.new_doctype("html", "", "");
    source.append_child(root, doctype);

    let mut mirror = new_mirror();
    let _client = MirrorClient::connect(&source, root, IdentityCodec, &mut mirror, Vec::new());

    assert_eq!(mirror.tree().export(mirror.root()), source.export(root));
}

#[test]
fn observer_driven_updates_converge() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let div = source.new_element("div");
    source.append_child(root, div);

    let mut mirror = new_mirror();
    let mut client = MirrorClient::connect(&source, root, IdentityCodec, &mut mirror, Vec::new());

    let mut observer = QueuedObserver::new();
    observer.observe(root, client.queries());

    // Turn 1: grow a subtree.
    let p = source.new_element("p");
    let text = source.new_text("first");
    source.append_child(p, text);
    source.append_child(div, p);
    observer.push(ChangeSummary {
        added: vec![p],
        ..Default::default()
    });

    // Turn 2: edit text and attributes.
    source.set_text(text, "second");
    source.set_attribute(div, "data-state", "ready").unwrap();
    observer.push(ChangeSummary {
        character_data_changed: vec![text],
        attribute_changed: [("data-state".to_owned(), vec![div])].into_iter().collect(),
        ..Default::default()
    });

    while let Some(summary) = observer.take_summary() {
        client.apply_summary(&source, &summary, &mut mirror);
    }

    assert_eq!(mirror.tree().export(mirror.root()), source.export(root));
}

#[test]
fn removal_detaches_the_replica_subtree() {
    let mut source = MemoryDom::new();
    let root = source.root();
    let div = source.new_element("div");
    source.append_child(root, div);
    let span = source.new_element("span");
    source.append_child(div, span);

    let mut mirror = new_mirror();
    let mut client = MirrorClient::connect(&source, root, IdentityCodec, &mut mirror, Vec::new());

    source.detach(span);
    let summary = ChangeSummary {
        removed: vec![span],
        ..Default::default()
    };
    client.apply_summary(&source, &summary, &mut mirror);

    assert_eq!(mirror.tree().export(mirror.root()), source.export(root));
}
