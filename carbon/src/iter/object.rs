use super::FieldRef;
use crate::field::{field_span, is_object_marker, read_len_prefixed, FieldType, MARKER_OBJECT_END};
use ruc::*;

/// Forward cursor over an object's `(key, value)` pairs.
#[derive(Clone, Debug)]
pub struct ObjectIter<'a> {
    buf: &'a [u8],
    pos: usize,
    cur: Option<Pair>,
}

#[derive(Clone, Copy, Debug)]
struct Pair {
    key_off: usize,
    val_off: usize,
}

impl<'a> ObjectIter<'a> {
    pub(crate) fn new(buf: &'a [u8], container_off: usize) -> Result<Self> {
        let marker = *buf
            .get(container_off)
            .ok_or_else(|| eg!("IndexOutOfRange: no container marker"))?;
        if !is_object_marker(marker) {
            return Err(eg!(format!(
                "TypeMismatch: 0x{:02x} opens no object",
                marker
            )));
        }
        Ok(Self {
            buf,
            pos: container_off + 1,
            cur: None,
        })
    }

    pub fn next(&mut self) -> bool {
        if self.buf.get(self.pos) == Some(&MARKER_OBJECT_END) {
            self.cur = None;
            return false;
        }
        let key_off = self.pos;
        let (_, key_n) = pnk!(read_len_prefixed(self.buf, key_off));
        let val_off = key_off + key_n;
        self.cur = Some(Pair { key_off, val_off });
        self.pos = val_off + pnk!(field_span(self.buf, val_off));
        true
    }

    /// Start of the current property entry (its key length prefix).
    pub(crate) fn prop_key_off(&self) -> Result<usize> {
        self.current().map(|p| p.key_off)
    }

    pub fn prop_name_bytes(&self) -> Result<&'a [u8]> {
        let pair = self.current().c(d!())?;
        read_len_prefixed(self.buf, pair.key_off).map(|(k, _)| k)
    }

    pub fn prop_name(&self) -> Result<&'a str> {
        std::str::from_utf8(self.prop_name_bytes().c(d!())?).c(d!())
    }

    pub fn prop_type(&self) -> Result<FieldType> {
        self.field().map(|f| f.field_type())
    }

    /// The value of the pair `next()` last stopped on.
    pub fn field(&self) -> Result<FieldRef<'a>> {
        let pair = self.current().c(d!())?;
        FieldRef::new(self.buf, pair.val_off)
    }

    fn current(&self) -> Result<Pair> {
        self.cur
            .ok_or_else(|| eg!("InvalidArgument: no current property"))
    }
}
