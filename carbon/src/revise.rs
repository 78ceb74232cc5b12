//!
//! # Revise engine
//!
//! Copy-on-write mutation: `begin` clones the source record, every operation
//! works on the clone, and `end` reseals it by recomputing the commit hash.
//! The source document is never touched; `abort` simply drops the clone.
//!

use crate::{
    abstracts::{derive_marker, AbstractClass},
    dot::DotPath,
    field::{
        classify, field_span, parse_column, ColumnType, FieldType, BOOL_FALSE, BOOL_NULL,
        BOOL_TRUE, FLOAT_NULL_BITS, I16_NULL, I32_NULL, I64_NULL, I8_NULL, MARKER_FALSE,
        MARKER_FLOAT, MARKER_I16, MARKER_I32, MARKER_I64, MARKER_I8, MARKER_NULL,
        MARKER_OBJECT_END, MARKER_TRUE, MARKER_U16, MARKER_U32, MARKER_U64, MARKER_U8,
        U16_NULL, U32_NULL, U64_NULL, U8_NULL,
    },
    find::{resolve_loc, Loc},
    insert::{enc_string, Inserter},
    iter::mutable::ArrayIterMut,
    memfile::uintvar_encode,
    record::{Carbon, Key},
};
use ruc::*;

// Reserved column slots grow by this factor when an append overflows.
const COLUMN_GROW_FACTOR: f32 = 1.7;

enum UpdateVal {
    Null,
    True,
    False,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
    Str(String),
}

impl UpdateVal {
    /// Marker plus payload of the scalar field form.
    fn enc_field(&self) -> Vec<u8> {
        match self {
            UpdateVal::Null => vec![MARKER_NULL],
            UpdateVal::True => vec![MARKER_TRUE],
            UpdateVal::False => vec![MARKER_FALSE],
            UpdateVal::U8(v) => [&[MARKER_U8][..], &v.to_le_bytes()].concat(),
            UpdateVal::U16(v) => [&[MARKER_U16][..], &v.to_le_bytes()].concat(),
            UpdateVal::U32(v) => [&[MARKER_U32][..], &v.to_le_bytes()].concat(),
            UpdateVal::U64(v) => [&[MARKER_U64][..], &v.to_le_bytes()].concat(),
            UpdateVal::I8(v) => [&[MARKER_I8][..], &v.to_le_bytes()].concat(),
            UpdateVal::I16(v) => [&[MARKER_I16][..], &v.to_le_bytes()].concat(),
            UpdateVal::I32(v) => [&[MARKER_I32][..], &v.to_le_bytes()].concat(),
            UpdateVal::I64(v) => [&[MARKER_I64][..], &v.to_le_bytes()].concat(),
            UpdateVal::Float(v) => [&[MARKER_FLOAT][..], &v.to_le_bytes()].concat(),
            UpdateVal::Str(s) => enc_string(s.as_bytes()),
        }
    }

    /// Packed cell bytes inside a column of type `ty`.
    fn enc_cell(&self, ty: ColumnType) -> Result<Vec<u8>> {
        let cell = match (ty, self) {
            (ColumnType::U8, UpdateVal::U8(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::U16, UpdateVal::U16(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::U32, UpdateVal::U32(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::U64, UpdateVal::U64(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::I8, UpdateVal::I8(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::I16, UpdateVal::I16(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::I32, UpdateVal::I32(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::I64, UpdateVal::I64(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::Float, UpdateVal::Float(v)) => v.to_le_bytes().to_vec(),
            (ColumnType::Boolean, UpdateVal::True) => vec![BOOL_TRUE],
            (ColumnType::Boolean, UpdateVal::False) => vec![BOOL_FALSE],
            (ColumnType::U8, UpdateVal::Null) => U8_NULL.to_le_bytes().to_vec(),
            (ColumnType::U16, UpdateVal::Null) => U16_NULL.to_le_bytes().to_vec(),
            (ColumnType::U32, UpdateVal::Null) => U32_NULL.to_le_bytes().to_vec(),
            (ColumnType::U64, UpdateVal::Null) => U64_NULL.to_le_bytes().to_vec(),
            (ColumnType::I8, UpdateVal::Null) => I8_NULL.to_le_bytes().to_vec(),
            (ColumnType::I16, UpdateVal::Null) => I16_NULL.to_le_bytes().to_vec(),
            (ColumnType::I32, UpdateVal::Null) => I32_NULL.to_le_bytes().to_vec(),
            (ColumnType::I64, UpdateVal::Null) => I64_NULL.to_le_bytes().to_vec(),
            (ColumnType::Float, UpdateVal::Null) => FLOAT_NULL_BITS.to_le_bytes().to_vec(),
            (ColumnType::Boolean, UpdateVal::Null) => vec![BOOL_NULL],
            (ty, _) => {
                return Err(eg!(format!("TypeMismatch: value rejected by {:?} column", ty)));
            }
        };
        Ok(cell)
    }
}

pub struct Revise {
    rev: Carbon,
}

impl Revise {
    /// Open a writable revision: a clone of `doc`.
    pub fn begin(doc: &Carbon) -> Revise {
        let mut rev = pnk!(doc.duplicate());
        rev.mark_dirty();
        Revise { rev }
    }

    /// The revision under construction.
    #[inline(always)]
    pub fn doc(&self) -> &Carbon {
        &self.rev
    }

    /// Appender into the root array.
    pub fn inserter(&mut self) -> Inserter<'_> {
        let closer = self.rev.root_closer();
        Inserter::at(self.rev.mf_mut(), closer)
    }

    /// Mutable iterator over the root array.
    pub fn iterator(&mut self) -> ArrayIterMut<'_> {
        let root = self.rev.root_off();
        pnk!(ArrayIterMut::new(self.rev.mf_mut(), root))
    }

    /// Give the revision a fresh random autokey, converting if necessary.
    /// Returns the generated key.
    pub fn key_generate(&mut self) -> Result<u64> {
        self.set_key(Key::Auto).c(d!())?;
        self.rev.key_unsigned().c(d!())
    }

    pub fn key_set_unsigned(&mut self, v: u64) -> Result<()> {
        self.set_key(Key::Unsigned(v))
    }

    pub fn key_set_signed(&mut self, v: i64) -> Result<()> {
        self.set_key(Key::Signed(v))
    }

    pub fn key_set_string(&mut self, s: &str) -> Result<()> {
        self.set_key(Key::Str(s.to_owned()))
    }

    /// Remove the value at `path`: array elements and object properties are
    /// compacted out, column cells are packed left with the count adjusted.
    pub fn remove_one(&mut self, path: &str) -> Result<()> {
        match self.locate(path).c(d!())? {
            Loc::Field { off, prop_key_off } => {
                let span = field_span(self.rev.bytes(), off).c(d!())?;
                let start = prop_key_off.unwrap_or(off);
                self.rev.mf_mut().remove_range(start, off + span - start);
            }
            Loc::ColumnCell { col_off, idx } => {
                let h = parse_column(self.rev.bytes(), col_off).c(d!())?;
                let w = h.ty.width();
                let from = h.values_off + (idx + 1) * w;
                let upto = h.values_off + h.count * w;
                let to = h.values_off + idx * w;
                self.rev.mf_mut().bytes_mut().copy_within(from..upto, to);
                self.rev
                    .mf_mut()
                    .uintvar_rewrite(h.count_off, h.count as u64 - 1)
                    .c(d!())?;
            }
        }
        Ok(())
    }

    pub fn update_set_null(&mut self, path: &str) -> Result<()> {
        self.update_set(path, UpdateVal::Null)
    }

    pub fn update_set_true(&mut self, path: &str) -> Result<()> {
        self.update_set(path, UpdateVal::True)
    }

    pub fn update_set_false(&mut self, path: &str) -> Result<()> {
        self.update_set(path, UpdateVal::False)
    }

    pub fn update_set_u8(&mut self, path: &str, v: u8) -> Result<()> {
        self.update_set(path, UpdateVal::U8(v))
    }

    pub fn update_set_u16(&mut self, path: &str, v: u16) -> Result<()> {
        self.update_set(path, UpdateVal::U16(v))
    }

    pub fn update_set_u32(&mut self, path: &str, v: u32) -> Result<()> {
        self.update_set(path, UpdateVal::U32(v))
    }

    pub fn update_set_u64(&mut self, path: &str, v: u64) -> Result<()> {
        self.update_set(path, UpdateVal::U64(v))
    }

    pub fn update_set_i8(&mut self, path: &str, v: i8) -> Result<()> {
        self.update_set(path, UpdateVal::I8(v))
    }

    pub fn update_set_i16(&mut self, path: &str, v: i16) -> Result<()> {
        self.update_set(path, UpdateVal::I16(v))
    }

    pub fn update_set_i32(&mut self, path: &str, v: i32) -> Result<()> {
        self.update_set(path, UpdateVal::I32(v))
    }

    pub fn update_set_i64(&mut self, path: &str, v: i64) -> Result<()> {
        self.update_set(path, UpdateVal::I64(v))
    }

    pub fn update_set_float(&mut self, path: &str, v: f32) -> Result<()> {
        self.update_set(path, UpdateVal::Float(v))
    }

    pub fn update_set_string(&mut self, path: &str, s: &str) -> Result<()> {
        self.update_set(path, UpdateVal::Str(s.to_owned()))
    }

    /// Append a cell to the column at `path`, growing the reserved region
    /// when the capacity overflows.
    pub fn column_push_u8(&mut self, path: &str, v: u8) -> Result<()> {
        self.column_push(path, UpdateVal::U8(v))
    }

    pub fn column_push_null(&mut self, path: &str) -> Result<()> {
        self.column_push(path, UpdateVal::Null)
    }

    pub fn column_push_bool(&mut self, path: &str, v: bool) -> Result<()> {
        self.column_push(path, alt!(v, UpdateVal::True, UpdateVal::False))
    }

    pub fn column_push_u64(&mut self, path: &str, v: u64) -> Result<()> {
        self.column_push(path, UpdateVal::U64(v))
    }

    pub fn column_push_i64(&mut self, path: &str, v: i64) -> Result<()> {
        self.column_push(path, UpdateVal::I64(v))
    }

    pub fn column_push_float(&mut self, path: &str, v: f32) -> Result<()> {
        self.column_push(path, UpdateVal::Float(v))
    }

    /// Strengthen the abstract class of the container at `path`.
    pub fn derive_container(&mut self, path: &str, class: AbstractClass) -> Result<()> {
        match self.locate(path).c(d!())? {
            Loc::Field { off, .. } => self.derive_at(off, class),
            Loc::ColumnCell { .. } => Err(eg!("TypeMismatch: cells carry no class")),
        }
    }

    /// Strengthen the abstract class of the root container.
    pub fn derive_root(&mut self, class: AbstractClass) -> Result<()> {
        let root = self.rev.root_off();
        self.derive_at(root, class)
    }

    /// Reclaim column slack and surplus buffer capacity.
    pub fn shrink(&mut self) -> Result<()> {
        let root = self.rev.root_off();
        trim_columns(&mut self.rev, root).c(d!())?;
        self.rev.mf_mut().shrink_to_fit().c(d!())
    }

    /// Reseal: recompute and write the commit hash, return the revision.
    pub fn end(mut self) -> Result<Carbon> {
        self.rev.seal().c(d!())?;
        Ok(self.rev)
    }

    /// Discard the revision; the source was never touched.
    pub fn abort(self) {}

    fn derive_at(&mut self, off: usize, class: AbstractClass) -> Result<()> {
        let marker = self.rev.bytes()[off];
        let derived = derive_marker(marker, class).c(d!())?;
        self.rev.mf_mut().bytes_mut()[off] = derived;
        Ok(())
    }

    fn locate(&self, path: &str) -> Result<Loc> {
        let parsed = DotPath::parse(path).c(d!())?;
        resolve_loc(self.rev.bytes(), self.rev.root_off(), &parsed)
            .c(d!())?
            .ok_or_else(|| eg!(format!("InvalidArgument: no result at '{}'", path)))
    }

    fn update_set(&mut self, path: &str, val: UpdateVal) -> Result<()> {
        match self.locate(path).c(d!())? {
            Loc::Field { off, .. } => {
                let old = classify(self.rev.bytes(), off).c(d!())?;
                let field = val.enc_field();
                let new_width = match val {
                    UpdateVal::U8(_) | UpdateVal::I8(_) => 1,
                    UpdateVal::U16(_) | UpdateVal::I16(_) => 2,
                    UpdateVal::U32(_) | UpdateVal::I32(_) | UpdateVal::Float(_) => 4,
                    UpdateVal::U64(_) | UpdateVal::I64(_) => 8,
                    _ => 0,
                };
                let same_width =
                    new_width != 0 && old.is_numeric() && old.numeric_width() == Some(new_width);
                if same_width {
                    // equal-width numeric overwrite stays in place
                    let mf = self.rev.mf_mut();
                    mf.seek(off).c(d!())?;
                    mf.write(&field).c(d!())?;
                } else {
                    let span = field_span(self.rev.bytes(), off).c(d!())?;
                    let mf = self.rev.mf_mut();
                    mf.remove_range(off, span);
                    mf.insert_at(off, &field).c(d!())?;
                }
            }
            Loc::ColumnCell { col_off, idx } => {
                let h = parse_column(self.rev.bytes(), col_off).c(d!())?;
                let cell = val.enc_cell(h.ty).c(d!())?;
                let at = h.values_off + idx * h.ty.width();
                self.rev.mf_mut().bytes_mut()[at..at + cell.len()].copy_from_slice(&cell);
            }
        }
        Ok(())
    }

    fn column_push(&mut self, path: &str, val: UpdateVal) -> Result<()> {
        let col_off = match self.locate(path).c(d!())? {
            Loc::Field { off, .. } => off,
            Loc::ColumnCell { .. } => {
                return Err(eg!("TypeMismatch: path names a cell, not a column"));
            }
        };
        let mut h = parse_column(self.rev.bytes(), col_off).c(d!())?;
        let cell = val.enc_cell(h.ty).c(d!())?;
        let w = h.ty.width();

        if h.count == h.cap {
            let new_cap = (h.cap + 1).max((h.cap as f32 * COLUMN_GROW_FACTOR).ceil() as usize);
            let mf = self.rev.mf_mut();
            mf.insert_gap(h.values_off + h.cap * w, (new_cap - h.cap) * w)
                .c(d!())?;
            let drift = mf.uintvar_rewrite(h.cap_off, new_cap as u64).c(d!())?;
            h.cap = new_cap;
            h.count_off = (h.count_off as isize + drift) as usize;
            h.values_off = (h.values_off as isize + drift) as usize;
        }

        let at = h.values_off + h.count * w;
        self.rev.mf_mut().bytes_mut()[at..at + w].copy_from_slice(&cell);
        self.rev
            .mf_mut()
            .uintvar_rewrite(h.count_off, h.count as u64 + 1)
            .c(d!())?;
        Ok(())
    }

    fn set_key(&mut self, key: Key) -> Result<()> {
        let commit_off = self.rev.commit_off();
        let mut prefix = Vec::new();
        match key {
            Key::NoKey => prefix.push(crate::record::KEY_NOKEY),
            Key::Auto => {
                prefix.push(crate::record::KEY_AUTOKEY);
                prefix.extend_from_slice(&rand::random::<u64>().to_le_bytes());
            }
            Key::Unsigned(v) => {
                prefix.push(crate::record::KEY_UKEY);
                prefix.extend_from_slice(&v.to_le_bytes());
            }
            Key::Signed(v) => {
                prefix.push(crate::record::KEY_IKEY);
                prefix.extend_from_slice(&v.to_le_bytes());
            }
            Key::Str(s) => {
                prefix.push(crate::record::KEY_SKEY);
                prefix.extend_from_slice(&uintvar_encode(s.len() as u64));
                prefix.extend_from_slice(s.as_bytes());
            }
        }
        let mf = self.rev.mf_mut();
        mf.remove_range(0, commit_off);
        mf.insert_at(0, &prefix).c(d!())?;
        self.rev.relocate().c(d!())
    }
}

// Walk the field at `off`, dropping reserved-but-unused column cells; returns
// the field's span after trimming.
fn trim_columns(doc: &mut Carbon, off: usize) -> Result<usize> {
    match classify(doc.bytes(), off).c(d!())? {
        FieldType::Column(_) => {
            let h = parse_column(doc.bytes(), off).c(d!())?;
            if h.cap > h.count {
                let w = h.ty.width();
                let mf = doc.mf_mut();
                mf.remove_range(h.values_off + h.count * w, (h.cap - h.count) * w);
                mf.uintvar_rewrite(h.cap_off, h.count as u64).c(d!())?;
            }
            parse_column(doc.bytes(), off).map(|h| h.span)
        }
        FieldType::Array => {
            let mut pos = off + 1;
            while doc.bytes()[pos] != crate::field::MARKER_ARRAY_END {
                pos += trim_columns(doc, pos).c(d!())?;
            }
            Ok(pos + 1 - off)
        }
        FieldType::Object => {
            let mut pos = off + 1;
            while doc.bytes()[pos] != MARKER_OBJECT_END {
                let (_, key_n) =
                    crate::field::read_len_prefixed(doc.bytes(), pos).c(d!())?;
                pos += key_n;
                pos += trim_columns(doc, pos).c(d!())?;
            }
            Ok(pos + 1 - off)
        }
        _ => field_span(doc.bytes(), off).c(d!()),
    }
}
