//!
//! End-to-end behavior of the record format: build, navigate, revise.
//!

use carbon::{
    json, AbstractClass, Carbon, ColumnType, FieldSink, FieldType, Key, Revise,
};
use ruc::*;

#[test]
fn build_then_read_a_column_document() {
    let doc = pnk!(json::from_json_str(Key::NoKey, r#"{"x": [1, 2, 3]}"#));

    let f = pnk!(doc.find("x"));
    assert_eq!(f.result_type(), Some(FieldType::Column(ColumnType::U8)));
    let col = pnk!(f.column());
    assert_eq!(col.len(), 3);
    for (i, want) in [1u64, 2, 3].iter().enumerate() {
        assert_eq!(pnk!(pnk!(doc.find(&format!("x.{}", i))).unsigned()), *want);
    }

    let f = pnk!(doc.find("x.1"));
    assert_eq!(f.result_type(), Some(FieldType::U8));
    assert_eq!(pnk!(f.unsigned()), 2);
}

#[test]
fn revise_appends_and_recommits() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"["Hello", "World"]"#));
    let h0 = doc.commit_hash();
    assert_ne!(h0, 0);

    let mut rev = Revise::begin(&doc);
    assert!(!rev.doc().is_up_to_date());
    pnk!(rev.inserter().insert_string("!"));
    let doc2 = pnk!(rev.end());
    let h1 = doc2.commit_hash();

    assert_ne!(h0, h1);
    assert!(doc2.is_up_to_date());

    let mut it = doc2.iterator();
    let mut strings = vec![];
    while it.next() {
        strings.push(pnk!(pnk!(it.field()).string()).to_owned());
    }
    assert_eq!(strings, vec!["Hello", "World", "!"]);

    // the source document was never touched
    assert_eq!(doc.commit_hash(), h0);
    assert_eq!(doc.iterator().count_remaining(), 2);
}

#[test]
fn unchanged_payload_keeps_the_commit() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"["stable"]"#));
    let h0 = doc.commit_hash();
    let rev = Revise::begin(&doc);
    let doc2 = pnk!(rev.end());
    assert_eq!(doc2.commit_hash(), h0);
}

#[test]
fn nokey_commit_stays_zero_across_revises() {
    let doc = pnk!(json::from_json_str(Key::NoKey, r#"["a"]"#));
    assert_eq!(doc.commit_hash(), 0);
    let mut rev = Revise::begin(&doc);
    pnk!(rev.inserter().insert_string("b"));
    let doc2 = pnk!(rev.end());
    assert_eq!(doc2.commit_hash(), 0);
    assert!(doc2.is_up_to_date());
}

#[test]
fn revise_abort_discards_the_clone() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"["keep"]"#));
    let h0 = doc.commit_hash();
    let mut rev = Revise::begin(&doc);
    pnk!(rev.inserter().insert_string("dropped"));
    rev.abort();
    assert_eq!(doc.commit_hash(), h0);
    assert_eq!(doc.iterator().count_remaining(), 1);
}

#[test]
fn shortened_root_rule() {
    let doc = pnk!(json::from_json_str(Key::NoKey, r#"{"x": "y"}"#));
    assert_eq!(pnk!(pnk!(doc.find("0.x")).string()), "y");
    assert_eq!(pnk!(pnk!(doc.find("x")).string()), "y");

    let doc = pnk!(json::from_json_str(
        Key::NoKey,
        r#"[{"x": "y"}, {"x": "z"}]"#
    ));
    assert_eq!(pnk!(pnk!(doc.find("0.x")).string()), "y");
    assert_eq!(pnk!(pnk!(doc.find("1.x")).string()), "z");
    assert!(!pnk!(doc.find("x")).has_result());
}

#[test]
fn out_of_range_paths_have_no_result() {
    let doc = pnk!(json::from_json_str(Key::NoKey, r#"{"x": [1, 2, 3]}"#));
    for path in ["x.3", "x.99", "y", "0.y", "x.0.deeper", "0.x.3"] {
        let f = pnk!(doc.find(path));
        assert!(!f.has_result(), "{} should miss", path);
        assert_eq!(f.to_json(), "_nil");
    }
}

#[test]
fn quoted_path_atoms_reach_awkward_keys() {
    let doc = pnk!(json::from_json_str(
        Key::NoKey,
        r#"{"dotted.key": 1, "with space": 2}"#
    ));
    assert_eq!(pnk!(pnk!(doc.find(r#""dotted.key""#)).unsigned()), 1);
    assert_eq!(pnk!(pnk!(doc.find(r#""with space""#)).unsigned()), 2);
    assert!(doc.find("dotted.key").is_ok());
    assert!(!pnk!(doc.find("dotted.key")).has_result());
}

#[test]
fn update_in_place_preserves_width_and_layout() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"{"n": 7, "s": "x"}"#));
    let len0 = doc.len();

    let mut rev = Revise::begin(&doc);
    pnk!(rev.update_set_u8("n", 9));
    let doc2 = pnk!(rev.end());

    assert_eq!(doc2.len(), len0);
    assert_eq!(pnk!(pnk!(doc2.find("n")).unsigned()), 9);
    assert_eq!(pnk!(pnk!(doc2.find("s")).string()), "x");
}

#[test]
fn update_with_width_change_reinserts() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"{"n": 7}"#));
    let mut rev = Revise::begin(&doc);
    pnk!(rev.update_set_u32("n", 100_000));
    let doc2 = pnk!(rev.end());
    assert_eq!(pnk!(doc2.find("n")).result_type(), Some(FieldType::U32));
    assert_eq!(pnk!(pnk!(doc2.find("n")).unsigned()), 100_000);
}

#[test]
fn overwriting_constants_reinserts() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"{"c": null}"#));
    let mut rev = Revise::begin(&doc);
    pnk!(rev.update_set_u64("c", 12));
    let doc2 = pnk!(rev.end());
    assert_eq!(pnk!(pnk!(doc2.find("c")).unsigned()), 12);
}

#[test]
fn update_hits_column_cells_in_place() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"{"x": [1, 2, 3]}"#));
    let len0 = doc.len();

    let mut rev = Revise::begin(&doc);
    pnk!(rev.update_set_u8("x.1", 42));
    pnk!(rev.update_set_null("x.2"));
    // a u64 does not fit a u8 column
    assert!(rev.update_set_u64("x.0", 1).is_err());
    let doc2 = pnk!(rev.end());

    assert_eq!(doc2.len(), len0);
    assert_eq!(pnk!(pnk!(doc2.find("x.1")).unsigned()), 42);
    assert_eq!(pnk!(doc2.find("x.2")).result_type(), Some(FieldType::Null));
}

#[test]
fn remove_one_takes_object_keys_along() {
    let doc = pnk!(json::from_json_str(
        Key::Auto,
        r#"{"a": 1, "b": 2, "c": 3}"#
    ));
    let mut rev = Revise::begin(&doc);
    pnk!(rev.remove_one("b"));
    let doc2 = pnk!(rev.end());

    assert!(!pnk!(doc2.find("b")).has_result());
    assert_eq!(pnk!(pnk!(doc2.find("a")).unsigned()), 1);
    assert_eq!(pnk!(pnk!(doc2.find("c")).unsigned()), 3);
    assert_eq!(pnk!(doc2.to_json_compact()), r#"{"a":1,"c":3}"#);
}

#[test]
fn remove_one_compacts_columns() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"{"x": [1, 2, 3]}"#));
    let mut rev = Revise::begin(&doc);
    pnk!(rev.remove_one("x.1"));
    let doc2 = pnk!(rev.end());

    let col = pnk!(pnk!(doc2.find("x")).column());
    assert_eq!(col.len(), 2);
    assert_eq!(pnk!(pnk!(doc2.find("x.0")).unsigned()), 1);
    assert_eq!(pnk!(pnk!(doc2.find("x.1")).unsigned()), 3);
}

#[test]
fn column_push_grows_the_reserved_region() {
    let doc = pnk!(json::from_json_str(Key::Auto, r#"{"x": [1, 2, 3]}"#));
    let mut rev = Revise::begin(&doc);
    // builder emits cap == count, so every push overflows first
    for v in 4..=20u8 {
        pnk!(rev.column_push_u8("x", v));
    }
    pnk!(rev.shrink());
    let doc2 = pnk!(rev.end());

    let col = pnk!(pnk!(doc2.find("x")).column());
    assert_eq!(col.len(), 20);
    assert_eq!(col.capacity(), 20);
    assert_eq!(pnk!(pnk!(doc2.find("x.19")).unsigned()), 20);
    // the record still parses after all the splicing
    pnk!(Carbon::from_bytes(doc2.bytes()));
}

#[test]
fn column_payload_is_exactly_count_times_width() {
    let doc = pnk!(json::from_json_str(
        Key::NoKey,
        r#"{"a": [1, 70000, 3], "b": [1.5, 2.5]}"#
    ));
    for (path, width, count) in [("a", 4usize, 3usize), ("b", 4, 2)] {
        let col = pnk!(pnk!(doc.find(path)).column());
        assert_eq!(col.column_type().width(), width);
        assert_eq!(col.len(), count);
        assert_eq!(col.capacity(), count);
    }
}

#[test]
fn revise_key_updates() {
    let doc = pnk!(json::from_json_str(Key::Unsigned(1), r#"["v"]"#));

    let mut rev = Revise::begin(&doc);
    pnk!(rev.key_set_string("renamed"));
    let doc2 = pnk!(rev.end());
    assert_eq!(pnk!(doc2.key_string()), "renamed");
    assert_eq!(pnk!(pnk!(doc2.find("0")).string()), "v");

    let mut rev = Revise::begin(&doc2);
    let generated = pnk!(rev.key_generate());
    let doc3 = pnk!(rev.end());
    assert_eq!(pnk!(doc3.key_unsigned()), generated);
    assert_ne!(doc3.commit_hash(), 0);
    pnk!(Carbon::from_bytes(doc3.bytes()));
}

#[test]
fn paths_untouched_by_a_revise_stay_stable() {
    let doc = pnk!(json::from_json_str(
        Key::Auto,
        r#"{"keep": {"deep": [10, 20]}, "edit": 1}"#
    ));
    let before = pnk!(doc.find("keep.deep.1")).to_json();

    let mut rev = Revise::begin(&doc);
    pnk!(rev.update_set_u8("edit", 2));
    let doc2 = pnk!(rev.end());

    assert_eq!(pnk!(doc2.find("keep.deep.1")).to_json(), before);
    assert_eq!(pnk!(pnk!(doc2.find("keep.deep.1")).unsigned()), 20);
}

#[test]
fn wire_roundtrip_after_build_and_revise() {
    let doc = pnk!(json::from_json_str(
        Key::Str("wire".to_owned()),
        r#"{"a": [1, null, 3], "b": {"c": true}, "d": "text"}"#
    ));
    let parsed = pnk!(Carbon::from_bytes(doc.bytes()));
    assert_eq!(parsed.bytes(), doc.bytes());
    assert_eq!(
        pnk!(parsed.to_json_compact()),
        pnk!(doc.to_json_compact())
    );
}

#[test]
fn containers_can_be_derived_to_stronger_classes() {
    let doc = pnk!(json::from_json_str(Key::NoKey, r#"{"x": [1, 2, 3]}"#));
    let mut rev = Revise::begin(&doc);
    pnk!(rev.derive_container("x", AbstractClass::SortedSet));
    let doc2 = pnk!(rev.end());

    let f = pnk!(doc2.find("x"));
    assert_eq!(
        f.result_type(),
        Some(FieldType::Column(ColumnType::U8))
    );
    // cells are still addressable through the derived marker
    assert_eq!(pnk!(pnk!(doc2.find("x.2")).unsigned()), 3);
    pnk!(Carbon::from_bytes(doc2.bytes()));
}

#[test]
fn find_hands_out_container_iterators() {
    let doc = pnk!(json::from_json_str(
        Key::NoKey,
        r#"{"list": ["a", 1], "obj": {"k": true}}"#
    ));

    let mut arr = pnk!(pnk!(doc.find("list")).array());
    assert!(arr.next());
    assert_eq!(pnk!(pnk!(arr.field()).string()), "a");

    let mut obj = pnk!(pnk!(doc.find("obj")).object());
    assert!(obj.next());
    assert_eq!(pnk!(obj.prop_name()), "k");
    assert!(pnk!(pnk!(obj.field()).boolean()));

    // wrong-shape extractors refuse
    assert!(pnk!(doc.find("list")).column().is_err());
    assert!(pnk!(doc.find("obj")).array().is_err());
}

#[test]
fn float_and_boolean_access_through_find() {
    let doc = pnk!(json::from_json_str(
        Key::NoKey,
        r#"{"f": 1.5, "t": true, "n": null}"#
    ));
    assert_eq!(pnk!(pnk!(doc.find("f")).float()), 1.5);
    assert!(pnk!(pnk!(doc.find("t")).boolean()));
    assert_eq!(pnk!(doc.find("n")).result_type(), Some(FieldType::Null));
    assert!(pnk!(doc.find("t")).unsigned().is_err());
}

#[test]
fn builder_handles_deep_mixed_documents() {
    let json = r#"{
        "name": "sensor-7",
        "series": [1, 2, null, 4],
        "tags": ["a", "b"],
        "meta": {"ok": true, "ratio": 0.5, "nested": [{"k": 1}]}
    }"#;
    let doc = pnk!(json::from_json_str(Key::Auto, json));

    assert_eq!(pnk!(pnk!(doc.find("name")).string()), "sensor-7");
    assert_eq!(
        pnk!(doc.find("series")).result_type(),
        Some(FieldType::Column(ColumnType::U8))
    );
    assert_eq!(pnk!(pnk!(doc.find("tags.1")).string()), "b");
    assert!(pnk!(pnk!(doc.find("meta.ok")).boolean()));
    assert_eq!(pnk!(pnk!(doc.find("meta.nested.0.k")).unsigned()), 1);

    let rendered: serde_json::Value =
        pnk!(serde_json::from_str(&pnk!(doc.to_json_compact())));
    let original: serde_json::Value = pnk!(serde_json::from_str(json));
    assert_eq!(rendered, original);
}
