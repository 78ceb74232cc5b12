//!
//! # Iterators
//!
//! Forward cursors over record containers. Read-side iterators borrow the
//! record bytes and are freely cloneable; the mutable twins used inside a
//! revise session live in [`mutable`].
//!

mod array;
mod column;
mod object;
pub mod mutable;


pub use array::ArrayIter;
pub use column::{ColValue, ColumnIter};
pub use object::ObjectIter;

use crate::field::{classify, field_span, read_len_prefixed, FieldType, FLOAT_NULL_BITS};
use ruc::*;

/// A classified field inside a record, with typed payload accessors.
#[derive(Clone, Copy, Debug)]
pub struct FieldRef<'a> {
    buf: &'a [u8],
    off: usize,
    ty: FieldType,
}

impl<'a> FieldRef<'a> {
    pub(crate) fn new(buf: &'a [u8], off: usize) -> Result<Self> {
        Ok(Self {
            buf,
            off,
            ty: classify(buf, off).c(d!())?,
        })
    }

    #[inline(always)]
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.off
    }

    pub fn span(&self) -> usize {
        // records are validated on entry, a corrupt span is a library bug
        pnk!(field_span(self.buf, self.off))
    }

    pub fn is_null(&self) -> bool {
        self.ty == FieldType::Null
    }

    pub fn boolean(&self) -> Result<bool> {
        match self.ty {
            FieldType::True => Ok(true),
            FieldType::False => Ok(false),
            ty => Err(eg!(format!("TypeMismatch: {:?} is not a boolean", ty))),
        }
    }

    /// Value of any unsigned field, widened to 64 bits.
    pub fn unsigned(&self) -> Result<u64> {
        let p = self.payload();
        match self.ty {
            FieldType::U8 => Ok(p[0] as u64),
            FieldType::U16 => Ok(u16::from_le_bytes([p[0], p[1]]) as u64),
            FieldType::U32 => Ok(u32::from_le_bytes([p[0], p[1], p[2], p[3]]) as u64),
            FieldType::U64 => Ok(u64::from_le_bytes(p[..8].try_into().unwrap())),
            ty => Err(eg!(format!("TypeMismatch: {:?} is not unsigned", ty))),
        }
    }

    /// Value of any signed field, widened to 64 bits.
    pub fn signed(&self) -> Result<i64> {
        let p = self.payload();
        match self.ty {
            FieldType::I8 => Ok(p[0] as i8 as i64),
            FieldType::I16 => Ok(i16::from_le_bytes([p[0], p[1]]) as i64),
            FieldType::I32 => Ok(i32::from_le_bytes([p[0], p[1], p[2], p[3]]) as i64),
            FieldType::I64 => Ok(i64::from_le_bytes(p[..8].try_into().unwrap())),
            ty => Err(eg!(format!("TypeMismatch: {:?} is not signed", ty))),
        }
    }

    pub fn float(&self) -> Result<f32> {
        if self.ty != FieldType::Float {
            return Err(eg!(format!("TypeMismatch: {:?} is not a float", self.ty)));
        }
        let p = self.payload();
        Ok(f32::from_le_bytes([p[0], p[1], p[2], p[3]]))
    }

    pub fn string_bytes(&self) -> Result<&'a [u8]> {
        if self.ty != FieldType::String {
            return Err(eg!(format!("TypeMismatch: {:?} is not a string", self.ty)));
        }
        read_len_prefixed(self.buf, self.off + 1).map(|(s, _)| s)
    }

    pub fn string(&self) -> Result<&'a str> {
        std::str::from_utf8(self.string_bytes().c(d!())?).c(d!())
    }

    /// `(tag, payload)` of a binary field; the tag is a MIME type for
    /// [`FieldType::Binary`] and a user label for [`FieldType::BinaryCustom`].
    pub fn binary(&self) -> Result<(&'a [u8], &'a [u8])> {
        if !matches!(self.ty, FieldType::Binary | FieldType::BinaryCustom) {
            return Err(eg!(format!("TypeMismatch: {:?} is not binary", self.ty)));
        }
        let (tag, tag_n) = read_len_prefixed(self.buf, self.off + 1).c(d!())?;
        let (payload, _) = read_len_prefixed(self.buf, self.off + 1 + tag_n).c(d!())?;
        Ok((tag, payload))
    }

    pub fn array(&self) -> Result<ArrayIter<'a>> {
        ArrayIter::new(self.buf, self.off).c(d!())
    }

    pub fn object(&self) -> Result<ObjectIter<'a>> {
        ObjectIter::new(self.buf, self.off).c(d!())
    }

    pub fn column(&self) -> Result<ColumnIter<'a>> {
        ColumnIter::new(self.buf, self.off).c(d!())
    }

    fn payload(&self) -> &'a [u8] {
        &self.buf[self.off + 1..]
    }
}

/// Bit pattern of the float null.
#[inline(always)]
pub(crate) fn float_is_null(v: f32) -> bool {
    v.to_bits() == FLOAT_NULL_BITS
}
