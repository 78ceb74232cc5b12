use super::*;
use crate::field::ColumnType;
use ruc::*;

fn build(json: &str) -> Carbon {
    pnk!(from_json_str(Key::NoKey, json))
}

#[test]
fn homogeneous_numbers_become_a_column() {
    let doc = build("[1, 2, 3]");
    let f = pnk!(doc.find("0"));
    assert_eq!(
        f.result_type(),
        Some(FieldType::Column(ColumnType::U8))
    );
    assert_eq!(pnk!(f.column()).len(), 3);
}

#[test]
fn nulls_ride_along_in_columns() {
    let doc = build("[1, null, 3]");
    let col = pnk!(pnk!(doc.find("0")).column());
    assert_eq!(col.column_type(), ColumnType::U8);
    assert_eq!(pnk!(col.get(1)), crate::iter::ColValue::Null);
}

#[test]
fn heterogeneous_arrays_stay_arrays() {
    let doc = build(r#"[1, null, 3, "a"]"#);
    // elements spread into the root array
    let f = pnk!(doc.find("3"));
    assert_eq!(f.result_type(), Some(FieldType::String));
    assert_eq!(pnk!(f.string()), "a");
    assert_eq!(pnk!(doc.find("0")).result_type(), Some(FieldType::U8));
}

#[test]
fn width_selection_tracks_the_range() {
    let doc = build("[[1, 2], [1, 300], [1, 70000], [1, 5000000000], [-1, 1]]");
    let expect = [
        ColumnType::U8,
        ColumnType::U16,
        ColumnType::U32,
        ColumnType::U64,
        ColumnType::I8,
    ];
    for (i, ty) in expect.iter().enumerate() {
        let f = pnk!(doc.find(&format!("{}", i)));
        assert_eq!(f.result_type(), Some(FieldType::Column(*ty)), "case {}", i);
    }
}

#[test]
fn null_pattern_values_widen_the_column() {
    // 255 is the u8 null pattern, so the column must widen to u16
    let doc = build("[[255, 1]]");
    let f = pnk!(doc.find("0"));
    assert_eq!(
        f.result_type(),
        Some(FieldType::Column(ColumnType::U16))
    );
}

#[test]
fn boolean_arrays_become_boolean_columns() {
    let doc = build("[[true, false, null]]");
    let col = pnk!(pnk!(doc.find("0")).column());
    assert_eq!(col.column_type(), ColumnType::Boolean);
    assert_eq!(pnk!(col.get(0)), crate::iter::ColValue::Boolean(true));
    assert_eq!(pnk!(col.get(2)), crate::iter::ColValue::Null);
}

#[test]
fn float_arrays_become_float_columns() {
    let doc = build("[[1.5, null, -2.25]]");
    let col = pnk!(pnk!(doc.find("0")).column());
    assert_eq!(col.column_type(), ColumnType::Float);
    assert_eq!(pnk!(col.get(0)), crate::iter::ColValue::Float(1.5));
}

#[test]
fn mixed_ints_and_floats_stay_an_array() {
    let doc = build("[[1, 2.5]]");
    assert_eq!(pnk!(doc.find("0")).result_type(), Some(FieldType::Array));
}

#[test]
fn objects_nest() {
    let doc = build(r#"{"a": {"b": {"c": 9}}}"#);
    assert_eq!(pnk!(pnk!(doc.find("a.b.c")).unsigned()), 9);
}

#[test]
fn compact_output_roundtrips() {
    for json in [
        r#"{"x":"y"}"#,
        r#"[1,2,3]"#,
        r#"{"a":{"b":[1,2]},"c":null,"d":false}"#,
        r#"["Hello","World"]"#,
    ] {
        let doc = build(json);
        assert_eq!(pnk!(doc.to_json_compact()), json);
    }
}

#[test]
fn compact_prints_a_lone_value_bare() {
    let doc = build(r#""alone""#);
    assert_eq!(pnk!(doc.to_json_compact()), r#""alone""#);
}

#[test]
fn extended_output_carries_meta() {
    let doc = pnk!(from_json_str(Key::Unsigned(12), r#"{"x":"y"}"#));
    let v: Value = pnk!(serde_json::from_str(&pnk!(doc.to_json_extended())));
    assert_eq!(v["meta"]["key"]["type"], "ukey");
    assert_eq!(v["meta"]["key"]["value"], 12);
    assert_eq!(
        v["meta"]["commit"],
        Value::String(commit_to_str(doc.commit_hash()))
    );
    assert_eq!(v["doc"][0]["x"], "y");
}

#[test]
fn extended_output_for_nokey_has_null_meta() {
    let doc = build("[1]");
    let v: Value = pnk!(serde_json::from_str(&pnk!(doc.to_json_extended())));
    assert_eq!(v["meta"]["key"]["type"], "nokey");
    assert_eq!(v["meta"]["key"]["value"], Value::Null);
    assert_eq!(v["meta"]["commit"], Value::Null);
}

#[test]
fn key_order_is_preserved() {
    let doc = build(r#"{"z":1,"a":2,"m":3}"#);
    assert_eq!(pnk!(doc.to_json_compact()), r#"{"z":1,"a":2,"m":3}"#);
}

#[test]
fn binary_fields_render_with_their_tag() {
    let doc = pnk!(Carbon::create(Key::NoKey, |ins| {
        crate::insert::FieldSink::insert_binary(ins, &[1, 2, 3], "image/png")
    }));
    let out = pnk!(doc.to_json_compact());
    let v: Value = pnk!(serde_json::from_str(&out));
    assert_eq!(v["type"], "image/png");
    assert_eq!(v["binary"], serde_json::json!([1, 2, 3]));
}
