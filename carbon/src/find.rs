//!
//! # Dot-path resolver
//!
//! Walks a record from the root container along a [`DotPath`], yielding a
//! typed result handle. Out-of-range indices and missing keys are "no
//! result", never errors; `_nil` is the JSON rendering of no result.
//!

use crate::{
    dot::{DotAtom, DotPath},
    field::{classify, field_span, FieldType},
    iter::{ArrayIter, ColValue, ColumnIter, FieldRef, ObjectIter},
    json,
    record::Carbon,
};
use ruc::*;

/// Resolved location inside a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Loc {
    Field {
        off: usize,
        /// Start of the surrounding property entry when the field is an
        /// object member; removal must take the key along.
        prop_key_off: Option<usize>,
    },
    ColumnCell {
        col_off: usize,
        idx: usize,
    },
}

/// Result handle of a path lookup; a live borrow into the record bytes.
pub struct Find<'a> {
    buf: &'a [u8],
    loc: Option<Loc>,
}

impl<'a> Find<'a> {
    pub(crate) fn resolve(doc: &'a Carbon, path: &str) -> Result<Self> {
        let path = DotPath::parse(path).c(d!())?;
        Ok(Self {
            buf: doc.bytes(),
            loc: resolve_loc(doc.bytes(), doc.root_off(), &path).c(d!())?,
        })
    }

    #[inline(always)]
    pub fn has_result(&self) -> bool {
        self.loc.is_some()
    }

    pub fn result_type(&self) -> Option<FieldType> {
        match self.loc? {
            Loc::Field { off, .. } => classify(self.buf, off).ok(),
            Loc::ColumnCell { col_off, idx } => ColumnIter::new(self.buf, col_off)
                .and_then(|c| c.cell_field_type(idx))
                .ok(),
        }
    }

    pub fn unsigned(&self) -> Result<u64> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.unsigned(),
            Loc::ColumnCell { .. } => match self.cell()? {
                ColValue::Unsigned(v) => Ok(v),
                v => Err(eg!(format!("TypeMismatch: {:?} is not unsigned", v))),
            },
        }
    }

    pub fn signed(&self) -> Result<i64> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.signed(),
            Loc::ColumnCell { .. } => match self.cell()? {
                ColValue::Signed(v) => Ok(v),
                v => Err(eg!(format!("TypeMismatch: {:?} is not signed", v))),
            },
        }
    }

    pub fn float(&self) -> Result<f32> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.float(),
            Loc::ColumnCell { .. } => match self.cell()? {
                ColValue::Float(v) => Ok(v),
                v => Err(eg!(format!("TypeMismatch: {:?} is not a float", v))),
            },
        }
    }

    pub fn boolean(&self) -> Result<bool> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.boolean(),
            Loc::ColumnCell { .. } => match self.cell()? {
                ColValue::Boolean(v) => Ok(v),
                v => Err(eg!(format!("TypeMismatch: {:?} is not a boolean", v))),
            },
        }
    }

    pub fn string(&self) -> Result<&'a str> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.string(),
            Loc::ColumnCell { .. } => Err(eg!("TypeMismatch: column cells are not strings")),
        }
    }

    pub fn array(&self) -> Result<ArrayIter<'a>> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.array(),
            Loc::ColumnCell { .. } => Err(eg!("TypeMismatch: column cells are not arrays")),
        }
    }

    pub fn object(&self) -> Result<ObjectIter<'a>> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.object(),
            Loc::ColumnCell { .. } => Err(eg!("TypeMismatch: column cells are not objects")),
        }
    }

    pub fn column(&self) -> Result<ColumnIter<'a>> {
        match self.require()? {
            Loc::Field { off, .. } => self.field_at(off)?.column(),
            Loc::ColumnCell { .. } => Err(eg!("TypeMismatch: column cells are not columns")),
        }
    }

    /// JSON rendering of the result; `_nil` when there is none.
    pub fn to_json(&self) -> String {
        match self.loc {
            None => "_nil".to_owned(),
            Some(Loc::Field { off, .. }) => json::render_field(self.buf, off)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "_nil".to_owned()),
            Some(Loc::ColumnCell { col_off, idx }) => json::render_cell(self.buf, col_off, idx)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "_nil".to_owned()),
        }
    }

    fn require(&self) -> Result<Loc> {
        self.loc.ok_or_else(|| eg!("InvalidArgument: no result at path"))
    }

    fn field_at(&self, off: usize) -> Result<FieldRef<'a>> {
        FieldRef::new(self.buf, off)
    }

    fn cell(&self) -> Result<ColValue> {
        match self.require()? {
            Loc::ColumnCell { col_off, idx } => {
                ColumnIter::new(self.buf, col_off).c(d!())?.get(idx)
            }
            _ => unreachable!(),
        }
    }
}

/// Walk the record; `None` is "no result".
pub(crate) fn resolve_loc(buf: &[u8], root_off: usize, path: &DotPath) -> Result<Option<Loc>> {
    let atoms = path.atoms();
    if atoms.is_empty() {
        return Ok(None);
    }

    let mut off = root_off;
    let mut prop_key_off = None;

    // Shortened-root rule: a leading property key may skip the `0.` index
    // when the root holds exactly one object.
    if matches!(atoms[0], DotAtom::Key(_)) {
        match sole_root_object(buf, root_off).c(d!())? {
            Some(obj_off) => off = obj_off,
            None => return Ok(None),
        }
    }

    for (i, atom) in atoms.iter().enumerate() {
        let last = i + 1 == atoms.len();
        match (classify(buf, off).c(d!())?, atom) {
            (FieldType::Array, DotAtom::Idx(k)) => {
                match nth_element(buf, off, *k).c(d!())? {
                    Some(elem) => {
                        off = elem;
                        prop_key_off = None;
                    }
                    None => return Ok(None),
                }
            }
            (FieldType::Object, DotAtom::Key(key)) => {
                match prop_by_key(buf, off, key).c(d!())? {
                    Some((key_off, val_off)) => {
                        off = val_off;
                        prop_key_off = Some(key_off);
                    }
                    None => return Ok(None),
                }
            }
            (FieldType::Column(_), DotAtom::Idx(k)) => {
                let col = ColumnIter::new(buf, off).c(d!())?;
                if !last || *k as usize >= col.len() {
                    return Ok(None);
                }
                return Ok(Some(Loc::ColumnCell {
                    col_off: off,
                    idx: *k as usize,
                }));
            }
            // type mismatch between atom and container: no result
            _ => return Ok(None),
        }
    }

    Ok(Some(Loc::Field { off, prop_key_off }))
}

fn sole_root_object(buf: &[u8], root_off: usize) -> Result<Option<usize>> {
    let first = root_off + 1;
    if buf.get(first) == Some(&crate::field::MARKER_ARRAY_END) {
        return Ok(None);
    }
    if classify(buf, first).c(d!())? != FieldType::Object {
        return Ok(None);
    }
    let span = field_span(buf, first).c(d!())?;
    // exactly one child: the object's closer meets the root closer
    if buf.get(first + span) != Some(&crate::field::MARKER_ARRAY_END) {
        return Ok(None);
    }
    Ok(Some(first))
}

fn nth_element(buf: &[u8], array_off: usize, n: u64) -> Result<Option<usize>> {
    let mut it = ArrayIter::new(buf, array_off).c(d!())?;
    for _ in 0..=n {
        if !it.next() {
            return Ok(None);
        }
    }
    Ok(Some(it.field().c(d!())?.offset()))
}

fn prop_by_key(buf: &[u8], obj_off: usize, key: &str) -> Result<Option<(usize, usize)>> {
    let mut it = ObjectIter::new(buf, obj_off).c(d!())?;
    while it.next() {
        if it.prop_name_bytes().c(d!())? == key.as_bytes() {
            return Ok(Some((
                it.prop_key_off().c(d!())?,
                it.field().c(d!())?.offset(),
            )));
        }
    }
    Ok(None)
}
