//!
//! Mutable twins of the container iterators, reachable only inside a revise
//! session. Removal compacts the memfile in place and leaves the cursor on
//! the byte where the following field now starts.
//!

use super::FieldRef;
use crate::{
    field::{
        field_span, is_array_marker, is_object_marker, read_len_prefixed, FieldType,
        MARKER_ARRAY_END, MARKER_OBJECT_END,
    },
    insert::{enc_len_prefixed, enc_string, Inserter},
    memfile::MemFile,
};
use ruc::*;

pub struct ArrayIterMut<'m> {
    mf: &'m mut MemFile,
    pos: usize,
    cur: Option<usize>,
}

impl<'m> ArrayIterMut<'m> {
    pub(crate) fn new(mf: &'m mut MemFile, container_off: usize) -> Result<Self> {
        let marker = *mf
            .bytes()
            .get(container_off)
            .ok_or_else(|| eg!("IndexOutOfRange: no container marker"))?;
        if !is_array_marker(marker) {
            return Err(eg!(format!(
                "TypeMismatch: 0x{:02x} opens no array",
                marker
            )));
        }
        Ok(Self {
            mf,
            pos: container_off + 1,
            cur: None,
        })
    }

    pub fn next(&mut self) -> bool {
        if self.mf.bytes().get(self.pos) == Some(&MARKER_ARRAY_END) {
            self.cur = None;
            return false;
        }
        self.cur = Some(self.pos);
        self.pos += pnk!(field_span(self.mf.bytes(), self.pos));
        true
    }

    pub fn field(&self) -> Result<FieldRef<'_>> {
        let off = self
            .cur
            .ok_or_else(|| eg!("InvalidArgument: no current element"))?;
        FieldRef::new(self.mf.bytes(), off)
    }

    /// Remove the current element; the following `next()` visits its
    /// successor.
    pub fn remove(&mut self) -> Result<()> {
        let off = self
            .cur
            .take()
            .ok_or_else(|| eg!("InvalidArgument: removal with no current element"))?;
        let span = field_span(self.mf.bytes(), off).c(d!())?;
        self.mf.remove_range(off, span);
        self.pos = off;
        Ok(())
    }

    /// Descend into the current element, which must be an array.
    pub fn enter_array(&mut self) -> Result<ArrayIterMut<'_>> {
        let off = self
            .cur
            .ok_or_else(|| eg!("InvalidArgument: no current element"))?;
        ArrayIterMut::new(self.mf, off)
    }

    /// Descend into the current element, which must be an object.
    pub fn enter_object(&mut self) -> Result<ObjectIterMut<'_>> {
        let off = self
            .cur
            .ok_or_else(|| eg!("InvalidArgument: no current element"))?;
        ObjectIterMut::new(self.mf, off)
    }

    /// Inserter at the cursor: new fields land between the current element
    /// and its successor.
    pub fn inserter(&mut self) -> Inserter<'_> {
        Inserter::at(self.mf, self.pos)
    }
}

pub struct ObjectIterMut<'m> {
    mf: &'m mut MemFile,
    pos: usize,
    cur: Option<(usize, usize)>, // (key_off, val_off)
}

impl<'m> ObjectIterMut<'m> {
    pub(crate) fn new(mf: &'m mut MemFile, container_off: usize) -> Result<Self> {
        let marker = *mf
            .bytes()
            .get(container_off)
            .ok_or_else(|| eg!("IndexOutOfRange: no container marker"))?;
        if !is_object_marker(marker) {
            return Err(eg!(format!(
                "TypeMismatch: 0x{:02x} opens no object",
                marker
            )));
        }
        Ok(Self {
            mf,
            pos: container_off + 1,
            cur: None,
        })
    }

    pub fn next(&mut self) -> bool {
        if self.mf.bytes().get(self.pos) == Some(&MARKER_OBJECT_END) {
            self.cur = None;
            return false;
        }
        let key_off = self.pos;
        let (_, key_n) = pnk!(read_len_prefixed(self.mf.bytes(), key_off));
        let val_off = key_off + key_n;
        self.cur = Some((key_off, val_off));
        self.pos = val_off + pnk!(field_span(self.mf.bytes(), val_off));
        true
    }

    pub fn prop_name(&self) -> Result<String> {
        let (key_off, _) = self.current().c(d!())?;
        let (k, _) = read_len_prefixed(self.mf.bytes(), key_off).c(d!())?;
        String::from_utf8(k.to_vec()).c(d!())
    }

    pub fn prop_type(&self) -> Result<FieldType> {
        self.field().map(|f| f.field_type())
    }

    pub fn field(&self) -> Result<FieldRef<'_>> {
        let (_, val_off) = self.current().c(d!())?;
        FieldRef::new(self.mf.bytes(), val_off)
    }

    /// Remove the current property, key and value.
    pub fn remove(&mut self) -> Result<()> {
        let (key_off, val_off) = self
            .cur
            .take()
            .ok_or_else(|| eg!("InvalidArgument: removal with no current property"))?;
        let span = field_span(self.mf.bytes(), val_off).c(d!())?;
        self.mf.remove_range(key_off, val_off + span - key_off);
        self.pos = key_off;
        Ok(())
    }

    pub fn enter_array(&mut self) -> Result<ArrayIterMut<'_>> {
        let (_, val_off) = self.current().c(d!())?;
        ArrayIterMut::new(self.mf, val_off)
    }

    pub fn enter_object(&mut self) -> Result<ObjectIterMut<'_>> {
        let (_, val_off) = self.current().c(d!())?;
        ObjectIterMut::new(self.mf, val_off)
    }

    /// Splice a string property in at the cursor.
    pub fn insert_prop_string(&mut self, name: &str, s: &str) -> Result<()> {
        let mut entry = enc_len_prefixed(name.as_bytes());
        entry.extend_from_slice(&enc_string(s.as_bytes()));
        self.splice(&entry)
    }

    fn splice(&mut self, entry: &[u8]) -> Result<()> {
        self.mf.insert_at(self.pos, entry).c(d!())?;
        self.pos += entry.len();
        Ok(())
    }

    fn current(&self) -> Result<(usize, usize)> {
        self.cur
            .ok_or_else(|| eg!("InvalidArgument: no current property"))
    }
}
