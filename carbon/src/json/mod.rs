//!
//! # JSON bridge
//!
//! Builder consuming a `serde_json` value tree and printers for the compact
//! and extended interchange forms. Arrays are scanned for homogeneity: an
//! all-numeric (or all-boolean) array, nulls allowed, becomes a column of
//! the narrowest fitting type; anything else stays an array.
//!

#[cfg(test)]
mod test;

use crate::{
    field::{ColumnType, FieldType},
    insert::{ColumnInserter, FieldSink, ObjectInserter},
    iter::{ArrayIter, ColValue, ColumnIter, FieldRef, ObjectIter},
    record::{commit_to_str, Carbon, Key, KeyType},
};
use ruc::*;
use serde_json::{Map, Number, Value};

pub fn from_json_str(key: Key, json: &str) -> Result<Carbon> {
    from_json(key, &serde_json::from_str(json).c(d!())?)
}

/// Build a record from a JSON document.
///
/// A top-level JSON array becomes the record content itself: its elements
/// land in the root array, or in a single column when they are homogeneous.
/// Any other top-level value becomes the single root element.
pub fn from_json(key: Key, v: &Value) -> Result<Carbon> {
    Carbon::create(key, |ins| match v {
        Value::Array(elems) => match column_plan(elems) {
            Some(ty) => emit_column(ins, ty, elems),
            None => elems.iter().try_for_each(|e| insert_value(ins, e)),
        },
        other => insert_value(ins, other),
    })
}

impl Carbon {
    /// Root array content; a lone element prints bare.
    pub fn to_json_compact(&self) -> Result<String> {
        let children = self.render_children().c(d!())?;
        let out = match <[Value; 1]>::try_from(children) {
            Ok([only]) => only,
            Err(children) => Value::Array(children),
        };
        Ok(out.to_string())
    }

    /// `{"meta": {...}, "doc": [...]}` wrapping.
    pub fn to_json_extended(&self) -> Result<String> {
        let key_value = match self.key_type() {
            KeyType::NoKey => Value::Null,
            KeyType::Auto | KeyType::Unsigned => self.key_unsigned().c(d!())?.into(),
            KeyType::Signed => self.key_signed().c(d!())?.into(),
            KeyType::Str => self.key_string().c(d!())?.into(),
        };
        let commit = alt!(
            self.key_type() == KeyType::NoKey,
            Value::Null,
            commit_to_str(self.commit_hash()).into()
        );

        let mut key = Map::new();
        key.insert("type".to_owned(), self.key_type().name().into());
        key.insert("value".to_owned(), key_value);
        let mut meta = Map::new();
        meta.insert("key".to_owned(), Value::Object(key));
        meta.insert("commit".to_owned(), commit);
        let mut root = Map::new();
        root.insert("meta".to_owned(), Value::Object(meta));
        root.insert(
            "doc".to_owned(),
            Value::Array(self.render_children().c(d!())?),
        );
        Ok(Value::Object(root).to_string())
    }

    fn render_children(&self) -> Result<Vec<Value>> {
        let mut out = vec![];
        let mut it = self.iterator();
        while it.next() {
            out.push(render_field_ref(it.field().c(d!())?).c(d!())?);
        }
        Ok(out)
    }
}

/////////////////////////////////////////////////////////////////////////////
// builder
/////////////////////////////////////////////////////////////////////////////

// Narrowest column type covering every element, or None when the array is
// not column-homogeneous. Nulls are wildcards; the widths exclude each
// type's reserved null pattern.
fn column_plan(elems: &[Value]) -> Option<ColumnType> {
    if elems.is_empty() {
        return None;
    }

    let mut bools = 0usize;
    let mut uints = 0usize;
    let mut sints = 0usize;
    let mut floats = 0usize;
    let mut min = i128::MAX;
    let mut max = i128::MIN;

    for e in elems {
        match e {
            Value::Null => {}
            Value::Bool(_) => bools += 1,
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    uints += 1;
                    min = min.min(v as i128);
                    max = max.max(v as i128);
                } else if let Some(v) = n.as_i64() {
                    sints += 1;
                    min = min.min(v as i128);
                    max = max.max(v as i128);
                } else {
                    floats += 1;
                }
            }
            _ => return None,
        }
    }

    let numerics = uints + sints + floats;
    if bools > 0 {
        return alt!(numerics == 0, Some(ColumnType::Boolean), None);
    }
    if numerics == 0 {
        // all null
        return Some(ColumnType::U8);
    }
    if floats > 0 {
        return alt!(uints + sints == 0, Some(ColumnType::Float), None);
    }
    if sints > 0 {
        return Some(if min > i8::MIN as i128 && max <= i8::MAX as i128 {
            ColumnType::I8
        } else if min > i16::MIN as i128 && max <= i16::MAX as i128 {
            ColumnType::I16
        } else if min > i32::MIN as i128 && max <= i32::MAX as i128 {
            ColumnType::I32
        } else {
            ColumnType::I64
        });
    }
    Some(if max < u8::MAX as i128 {
        ColumnType::U8
    } else if max < u16::MAX as i128 {
        ColumnType::U16
    } else if max < u32::MAX as i128 {
        ColumnType::U32
    } else {
        ColumnType::U64
    })
}

fn push_cell(col: &mut ColumnInserter<'_>, v: &Value) -> Result<()> {
    match v {
        Value::Null => col.push_null(),
        Value::Bool(b) => col.push_bool(*b),
        Value::Number(n) => match col.column_type() {
            ColumnType::U8 => col.push_u8(n.as_u64().unwrap() as u8),
            ColumnType::U16 => col.push_u16(n.as_u64().unwrap() as u16),
            ColumnType::U32 => col.push_u32(n.as_u64().unwrap() as u32),
            ColumnType::U64 => col.push_u64(n.as_u64().unwrap()),
            ColumnType::I8 => col.push_i8(n.as_i64().unwrap() as i8),
            ColumnType::I16 => col.push_i16(n.as_i64().unwrap() as i16),
            ColumnType::I32 => col.push_i32(n.as_i64().unwrap() as i32),
            ColumnType::I64 => col.push_i64(n.as_i64().unwrap()),
            ColumnType::Float => col.push_float(n.as_f64().unwrap() as f32),
            ColumnType::Boolean => Err(eg!("TypeMismatch: number in a boolean column")),
        },
        _ => Err(eg!("InternalInvariant: non-scalar slipped past the column plan")),
    }
}

fn emit_column<S: FieldSink>(sink: &mut S, ty: ColumnType, elems: &[Value]) -> Result<()> {
    let mut col = sink.column_begin(ty, elems.len());
    elems.iter().try_for_each(|e| push_cell(&mut col, e))?;
    col.end()
}

fn emit_array<S: FieldSink>(sink: &mut S, elems: &[Value]) -> Result<()> {
    let mut arr = sink.array_begin(elems.len());
    elems.iter().try_for_each(|e| insert_value(&mut arr, e))?;
    arr.end()
}

fn emit_object<S: FieldSink>(sink: &mut S, map: &Map<String, Value>) -> Result<()> {
    let mut obj = sink.object_begin(map.len());
    map.iter().try_for_each(|(k, v)| insert_member(&mut obj, k, v))?;
    obj.end()
}

fn insert_value<S: FieldSink>(sink: &mut S, v: &Value) -> Result<()> {
    match v {
        Value::Null => sink.insert_null(),
        Value::Bool(b) => sink.insert_bool(*b),
        Value::Number(n) => insert_number(sink, n),
        Value::String(s) => sink.insert_string(s),
        Value::Array(elems) => match column_plan(elems) {
            Some(ty) => emit_column(sink, ty, elems),
            None => emit_array(sink, elems),
        },
        Value::Object(map) => emit_object(sink, map),
    }
}

// Scalar integers take the smallest width that fits; the in-band null
// patterns only constrain columns, not scalar fields.
fn insert_number<S: FieldSink>(sink: &mut S, n: &Number) -> Result<()> {
    if let Some(v) = n.as_u64() {
        if v <= u8::MAX as u64 {
            sink.insert_u8(v as u8)
        } else if v <= u16::MAX as u64 {
            sink.insert_u16(v as u16)
        } else if v <= u32::MAX as u64 {
            sink.insert_u32(v as u32)
        } else {
            sink.insert_u64(v)
        }
    } else if let Some(v) = n.as_i64() {
        if v >= i8::MIN as i64 {
            sink.insert_i8(v as i8)
        } else if v >= i16::MIN as i64 {
            sink.insert_i16(v as i16)
        } else if v >= i32::MIN as i64 {
            sink.insert_i32(v as i32)
        } else {
            sink.insert_i64(v)
        }
    } else {
        sink.insert_float(n.as_f64().unwrap_or(f64::NAN) as f32)
    }
}

fn insert_member(obj: &mut ObjectInserter<'_>, name: &str, v: &Value) -> Result<()> {
    match v {
        Value::Null => obj.prop_null(name),
        Value::Bool(b) => obj.prop_bool(name, *b),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                if v <= u8::MAX as u64 {
                    obj.prop_u8(name, v as u8)
                } else if v <= u16::MAX as u64 {
                    obj.prop_u16(name, v as u16)
                } else if v <= u32::MAX as u64 {
                    obj.prop_u32(name, v as u32)
                } else {
                    obj.prop_u64(name, v)
                }
            } else if let Some(v) = n.as_i64() {
                if v >= i8::MIN as i64 {
                    obj.prop_i8(name, v as i8)
                } else if v >= i16::MIN as i64 {
                    obj.prop_i16(name, v as i16)
                } else if v >= i32::MIN as i64 {
                    obj.prop_i32(name, v as i32)
                } else {
                    obj.prop_i64(name, v)
                }
            } else {
                obj.prop_float(name, n.as_f64().unwrap_or(f64::NAN) as f32)
            }
        }
        Value::String(s) => obj.prop_string(name, s),
        Value::Array(elems) => match column_plan(elems) {
            Some(ty) => {
                let mut col = obj.prop_column_begin(name, ty, elems.len());
                elems.iter().try_for_each(|e| push_cell(&mut col, e))?;
                col.end()
            }
            None => {
                let mut arr = obj.prop_array_begin(name, elems.len());
                elems.iter().try_for_each(|e| insert_value(&mut arr, e))?;
                arr.end()
            }
        },
        Value::Object(map) => {
            let mut child = obj.prop_object_begin(name, map.len());
            map.iter()
                .try_for_each(|(k, v)| insert_member(&mut child, k, v))?;
            child.end()
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
// printers
/////////////////////////////////////////////////////////////////////////////

/// Render the field at `off` as a JSON value.
pub(crate) fn render_field(buf: &[u8], off: usize) -> Result<Value> {
    render_field_ref(FieldRef::new(buf, off).c(d!())?)
}

/// Render one column cell as a JSON value.
pub(crate) fn render_cell(buf: &[u8], col_off: usize, idx: usize) -> Result<Value> {
    let col = ColumnIter::new(buf, col_off).c(d!())?;
    render_col_value(col.get(idx).c(d!())?)
}

fn render_field_ref(f: FieldRef<'_>) -> Result<Value> {
    Ok(match f.field_type() {
        FieldType::Null => Value::Null,
        FieldType::True => Value::Bool(true),
        FieldType::False => Value::Bool(false),
        FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => {
            f.unsigned().c(d!())?.into()
        }
        FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 => {
            f.signed().c(d!())?.into()
        }
        FieldType::Float => float_value(f.float().c(d!())?),
        FieldType::String => f.string().c(d!())?.into(),
        FieldType::Binary | FieldType::BinaryCustom => {
            let (tag, payload) = f.binary().c(d!())?;
            let mut out = Map::new();
            out.insert(
                "type".to_owned(),
                String::from_utf8_lossy(tag).into_owned().into(),
            );
            out.insert(
                "binary".to_owned(),
                Value::Array(payload.iter().map(|b| (*b).into()).collect()),
            );
            Value::Object(out)
        }
        FieldType::Array => render_array(f.array().c(d!())?).c(d!())?,
        FieldType::Object => render_object(f.object().c(d!())?).c(d!())?,
        FieldType::Column(_) => {
            let col = f.column().c(d!())?;
            let mut out = Vec::with_capacity(col.len());
            for i in 0..col.len() {
                out.push(render_col_value(col.get(i).c(d!())?).c(d!())?);
            }
            Value::Array(out)
        }
    })
}

fn render_array(mut it: ArrayIter<'_>) -> Result<Value> {
    let mut out = vec![];
    while it.next() {
        out.push(render_field_ref(it.field().c(d!())?).c(d!())?);
    }
    Ok(Value::Array(out))
}

fn render_object(mut it: ObjectIter<'_>) -> Result<Value> {
    let mut out = Map::new();
    while it.next() {
        out.insert(
            it.prop_name().c(d!())?.to_owned(),
            render_field_ref(it.field().c(d!())?).c(d!())?,
        );
    }
    Ok(Value::Object(out))
}

fn render_col_value(v: ColValue) -> Result<Value> {
    Ok(match v {
        ColValue::Null => Value::Null,
        ColValue::Unsigned(v) => v.into(),
        ColValue::Signed(v) => v.into(),
        ColValue::Float(v) => float_value(v),
        ColValue::Boolean(b) => Value::Bool(b),
    })
}

// Going through the decimal form keeps the shortest f32 representation
// instead of the noisy f32-to-f64 widening.
fn float_value(v: f32) -> Value {
    format!("{}", v)
        .parse::<Number>()
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
