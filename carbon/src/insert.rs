//!
//! # Inserter
//!
//! Append primitives for open containers. A top-level [`Inserter`] splices
//! finished fields into the record memfile at its cursor; sub-containers
//! assemble their bytes in a scratch buffer and land in the parent as one
//! splice on `end()`, so capacity hints are allocation hints only.
//!

use crate::{
    field::{
        ColumnType, BOOL_FALSE, BOOL_NULL, BOOL_TRUE, FLOAT_NULL_BITS, I16_NULL, I32_NULL,
        I64_NULL, I8_NULL, MARKER_ARRAY_BEGIN, MARKER_ARRAY_END, MARKER_BINARY,
        MARKER_BINARY_CUSTOM, MARKER_FALSE, MARKER_FLOAT, MARKER_I16, MARKER_I32, MARKER_I64,
        MARKER_I8, MARKER_NULL, MARKER_OBJECT_BEGIN, MARKER_OBJECT_END, MARKER_STRING,
        MARKER_TRUE, MARKER_U16, MARKER_U32, MARKER_U64, MARKER_U8, U16_NULL, U32_NULL,
        U64_NULL, U8_NULL,
    },
    memfile::{uintvar_encode, MemFile},
};
use ruc::*;

/////////////////////////////////////////////////////////////////////////////
// field encoders
/////////////////////////////////////////////////////////////////////////////

pub(crate) fn enc_len_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = uintvar_encode(bytes.len() as u64);
    out.extend_from_slice(bytes);
    out
}

fn enc_marker_payload(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(marker);
    out.extend_from_slice(payload);
    out
}

pub(crate) fn enc_string(bytes: &[u8]) -> Vec<u8> {
    enc_marker_payload(MARKER_STRING, &enc_len_prefixed(bytes))
}

fn enc_binary(marker: u8, tag: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = vec![marker];
    out.extend_from_slice(&enc_len_prefixed(tag));
    out.extend_from_slice(&enc_len_prefixed(payload));
    out
}

/////////////////////////////////////////////////////////////////////////////
// sinks
/////////////////////////////////////////////////////////////////////////////

/// Destination accepting finished entry bytes (a field, or a key/value pair
/// inside an object body).
pub trait RawSink {
    fn accept(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Array-position insertion surface: every operation appends one value.
pub trait FieldSink: RawSink {
    fn insert_null(&mut self) -> Result<()> {
        self.accept(&[MARKER_NULL])
    }

    fn insert_true(&mut self) -> Result<()> {
        self.accept(&[MARKER_TRUE])
    }

    fn insert_false(&mut self) -> Result<()> {
        self.accept(&[MARKER_FALSE])
    }

    fn insert_bool(&mut self, v: bool) -> Result<()> {
        alt!(v, self.insert_true(), self.insert_false())
    }

    fn insert_u8(&mut self, v: u8) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_U8, &v.to_le_bytes()))
    }

    fn insert_u16(&mut self, v: u16) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_U16, &v.to_le_bytes()))
    }

    fn insert_u32(&mut self, v: u32) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_U32, &v.to_le_bytes()))
    }

    fn insert_u64(&mut self, v: u64) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_U64, &v.to_le_bytes()))
    }

    fn insert_i8(&mut self, v: i8) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_I8, &v.to_le_bytes()))
    }

    fn insert_i16(&mut self, v: i16) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_I16, &v.to_le_bytes()))
    }

    fn insert_i32(&mut self, v: i32) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_I32, &v.to_le_bytes()))
    }

    fn insert_i64(&mut self, v: i64) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_I64, &v.to_le_bytes()))
    }

    fn insert_float(&mut self, v: f32) -> Result<()> {
        self.accept(&enc_marker_payload(MARKER_FLOAT, &v.to_le_bytes()))
    }

    fn insert_string(&mut self, s: &str) -> Result<()> {
        self.accept(&enc_string(s.as_bytes()))
    }

    fn insert_string_bytes(&mut self, s: &[u8]) -> Result<()> {
        self.accept(&enc_string(s))
    }

    fn insert_binary(&mut self, payload: &[u8], mime: &str) -> Result<()> {
        self.accept(&enc_binary(MARKER_BINARY, mime.as_bytes(), payload))
    }

    fn insert_binary_custom(&mut self, payload: &[u8], tag: &str) -> Result<()> {
        self.accept(&enc_binary(MARKER_BINARY_CUSTOM, tag.as_bytes(), payload))
    }

    fn array_begin(&mut self, cap_hint: usize) -> ArrayInserter<'_>
    where
        Self: Sized,
    {
        ArrayInserter::new(self, None, cap_hint)
    }

    fn object_begin(&mut self, cap_hint: usize) -> ObjectInserter<'_>
    where
        Self: Sized,
    {
        ObjectInserter::new(self, None, cap_hint)
    }

    fn column_begin(&mut self, ty: ColumnType, cap_hint: usize) -> ColumnInserter<'_>
    where
        Self: Sized,
    {
        ColumnInserter::new(self, None, ty, cap_hint)
    }
}

/////////////////////////////////////////////////////////////////////////////
// top-level inserter
/////////////////////////////////////////////////////////////////////////////

/// Inserter bound into a record memfile; fields land at `pos`.
pub struct Inserter<'m> {
    mf: &'m mut MemFile,
    pos: usize,
}

impl<'m> Inserter<'m> {
    pub(crate) fn at(mf: &'m mut MemFile, pos: usize) -> Self {
        Self { mf, pos }
    }

    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl RawSink for Inserter<'_> {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        self.mf.insert_at(self.pos, bytes).c(d!())?;
        self.pos += bytes.len();
        Ok(())
    }
}

impl FieldSink for Inserter<'_> {}

/////////////////////////////////////////////////////////////////////////////
// sub-container inserters
/////////////////////////////////////////////////////////////////////////////

/// Array under construction; the whole container lands in the parent on
/// [`ArrayInserter::end`].
pub struct ArrayInserter<'p> {
    parent: &'p mut dyn RawSink,
    prefix: Vec<u8>,
    body: Vec<u8>,
}

impl<'p> ArrayInserter<'p> {
    fn new(parent: &'p mut dyn RawSink, prefix: Option<Vec<u8>>, cap_hint: usize) -> Self {
        Self {
            parent,
            prefix: prefix.unwrap_or_default(),
            body: Vec::with_capacity(cap_hint),
        }
    }

    pub fn end(self) -> Result<()> {
        let mut out = self.prefix;
        out.push(MARKER_ARRAY_BEGIN);
        out.extend_from_slice(&self.body);
        out.push(MARKER_ARRAY_END);
        self.parent.accept(&out)
    }
}

impl RawSink for ArrayInserter<'_> {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }
}

impl FieldSink for ArrayInserter<'_> {}

/// Object under construction; entries are added through the `prop_*` family.
pub struct ObjectInserter<'p> {
    parent: &'p mut dyn RawSink,
    prefix: Vec<u8>,
    body: Vec<u8>,
}

impl<'p> ObjectInserter<'p> {
    fn new(parent: &'p mut dyn RawSink, prefix: Option<Vec<u8>>, cap_hint: usize) -> Self {
        Self {
            parent,
            prefix: prefix.unwrap_or_default(),
            body: Vec::with_capacity(cap_hint),
        }
    }

    fn pair(&mut self, name: &str, field: &[u8]) -> Result<()> {
        self.body.extend_from_slice(&enc_len_prefixed(name.as_bytes()));
        self.body.extend_from_slice(field);
        Ok(())
    }

    pub fn prop_null(&mut self, name: &str) -> Result<()> {
        self.pair(name, &[MARKER_NULL])
    }

    pub fn prop_bool(&mut self, name: &str, v: bool) -> Result<()> {
        self.pair(name, &[alt!(v, MARKER_TRUE, MARKER_FALSE)])
    }

    pub fn prop_u8(&mut self, name: &str, v: u8) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_U8, &v.to_le_bytes()))
    }

    pub fn prop_u16(&mut self, name: &str, v: u16) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_U16, &v.to_le_bytes()))
    }

    pub fn prop_u32(&mut self, name: &str, v: u32) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_U32, &v.to_le_bytes()))
    }

    pub fn prop_u64(&mut self, name: &str, v: u64) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_U64, &v.to_le_bytes()))
    }

    pub fn prop_i8(&mut self, name: &str, v: i8) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_I8, &v.to_le_bytes()))
    }

    pub fn prop_i16(&mut self, name: &str, v: i16) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_I16, &v.to_le_bytes()))
    }

    pub fn prop_i32(&mut self, name: &str, v: i32) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_I32, &v.to_le_bytes()))
    }

    pub fn prop_i64(&mut self, name: &str, v: i64) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_I64, &v.to_le_bytes()))
    }

    pub fn prop_float(&mut self, name: &str, v: f32) -> Result<()> {
        self.pair(name, &enc_marker_payload(MARKER_FLOAT, &v.to_le_bytes()))
    }

    pub fn prop_string(&mut self, name: &str, s: &str) -> Result<()> {
        self.pair(name, &enc_string(s.as_bytes()))
    }

    pub fn prop_binary(&mut self, name: &str, payload: &[u8], mime: &str) -> Result<()> {
        self.pair(name, &enc_binary(MARKER_BINARY, mime.as_bytes(), payload))
    }

    pub fn prop_array_begin(&mut self, name: &str, cap_hint: usize) -> ArrayInserter<'_> {
        let prefix = enc_len_prefixed(name.as_bytes());
        ArrayInserter::new(self, Some(prefix), cap_hint)
    }

    pub fn prop_object_begin(&mut self, name: &str, cap_hint: usize) -> ObjectInserter<'_> {
        let prefix = enc_len_prefixed(name.as_bytes());
        ObjectInserter::new(self, Some(prefix), cap_hint)
    }

    pub fn prop_column_begin(
        &mut self,
        name: &str,
        ty: ColumnType,
        cap_hint: usize,
    ) -> ColumnInserter<'_> {
        let prefix = enc_len_prefixed(name.as_bytes());
        ColumnInserter::new(self, Some(prefix), ty, cap_hint)
    }

    pub fn end(self) -> Result<()> {
        let mut out = self.prefix;
        out.push(MARKER_OBJECT_BEGIN);
        out.extend_from_slice(&self.body);
        out.push(MARKER_OBJECT_END);
        self.parent.accept(&out)
    }
}

impl RawSink for ObjectInserter<'_> {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }
}

/// Column under construction; only cells of the declared primitive type are
/// accepted. The emitted capacity equals the final count, slack is never
/// written at build time.
pub struct ColumnInserter<'p> {
    parent: &'p mut dyn RawSink,
    prefix: Vec<u8>,
    ty: ColumnType,
    cells: Vec<u8>,
    count: u64,
}

impl<'p> ColumnInserter<'p> {
    fn new(
        parent: &'p mut dyn RawSink,
        prefix: Option<Vec<u8>>,
        ty: ColumnType,
        cap_hint: usize,
    ) -> Self {
        Self {
            parent,
            prefix: prefix.unwrap_or_default(),
            ty,
            cells: Vec::with_capacity(cap_hint * ty.width()),
            count: 0,
        }
    }

    #[inline(always)]
    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    fn cell(&mut self, expected: ColumnType, bytes: &[u8]) -> Result<()> {
        if self.ty != expected {
            return Err(eg!(format!(
                "TypeMismatch: {:?} cell in a {:?} column",
                expected, self.ty
            )));
        }
        self.cells.extend_from_slice(bytes);
        self.count += 1;
        Ok(())
    }

    pub fn push_u8(&mut self, v: u8) -> Result<()> {
        self.cell(ColumnType::U8, &v.to_le_bytes())
    }

    pub fn push_u16(&mut self, v: u16) -> Result<()> {
        self.cell(ColumnType::U16, &v.to_le_bytes())
    }

    pub fn push_u32(&mut self, v: u32) -> Result<()> {
        self.cell(ColumnType::U32, &v.to_le_bytes())
    }

    pub fn push_u64(&mut self, v: u64) -> Result<()> {
        self.cell(ColumnType::U64, &v.to_le_bytes())
    }

    pub fn push_i8(&mut self, v: i8) -> Result<()> {
        self.cell(ColumnType::I8, &v.to_le_bytes())
    }

    pub fn push_i16(&mut self, v: i16) -> Result<()> {
        self.cell(ColumnType::I16, &v.to_le_bytes())
    }

    pub fn push_i32(&mut self, v: i32) -> Result<()> {
        self.cell(ColumnType::I32, &v.to_le_bytes())
    }

    pub fn push_i64(&mut self, v: i64) -> Result<()> {
        self.cell(ColumnType::I64, &v.to_le_bytes())
    }

    pub fn push_float(&mut self, v: f32) -> Result<()> {
        self.cell(ColumnType::Float, &v.to_le_bytes())
    }

    pub fn push_bool(&mut self, v: bool) -> Result<()> {
        self.cell(ColumnType::Boolean, &[alt!(v, BOOL_TRUE, BOOL_FALSE)])
    }

    /// The declared type's reserved null pattern.
    pub fn push_null(&mut self) -> Result<()> {
        let ty = self.ty;
        match ty {
            ColumnType::U8 => self.cell(ty, &U8_NULL.to_le_bytes()),
            ColumnType::U16 => self.cell(ty, &U16_NULL.to_le_bytes()),
            ColumnType::U32 => self.cell(ty, &U32_NULL.to_le_bytes()),
            ColumnType::U64 => self.cell(ty, &U64_NULL.to_le_bytes()),
            ColumnType::I8 => self.cell(ty, &I8_NULL.to_le_bytes()),
            ColumnType::I16 => self.cell(ty, &I16_NULL.to_le_bytes()),
            ColumnType::I32 => self.cell(ty, &I32_NULL.to_le_bytes()),
            ColumnType::I64 => self.cell(ty, &I64_NULL.to_le_bytes()),
            ColumnType::Float => self.cell(ty, &FLOAT_NULL_BITS.to_le_bytes()),
            ColumnType::Boolean => self.cell(ty, &[BOOL_NULL]),
        }
    }

    pub fn end(self) -> Result<()> {
        let mut out = self.prefix;
        out.push(self.ty.base_marker());
        out.push(self.ty.prim_marker());
        out.extend_from_slice(&uintvar_encode(self.count));
        out.extend_from_slice(&uintvar_encode(self.count));
        out.extend_from_slice(&self.cells);
        self.parent.accept(&out)
    }
}
