use super::FieldRef;
use crate::field::{field_span, is_array_marker, MARKER_ARRAY_END};
use ruc::*;

/// Forward cursor over an array container.
///
/// `next()` positions the iterator on the following element and returns
/// false at the closer; stepping past the closer stays a no-op.
#[derive(Clone, Debug)]
pub struct ArrayIter<'a> {
    buf: &'a [u8],
    pos: usize,
    cur: Option<usize>,
}

impl<'a> ArrayIter<'a> {
    pub(crate) fn new(buf: &'a [u8], container_off: usize) -> Result<Self> {
        let marker = *buf
            .get(container_off)
            .ok_or_else(|| eg!("IndexOutOfRange: no container marker"))?;
        if !is_array_marker(marker) {
            return Err(eg!(format!(
                "TypeMismatch: 0x{:02x} opens no array",
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
        if self.buf.get(self.pos) == Some(&MARKER_ARRAY_END) {
            self.cur = None;
            return false;
        }
        self.cur = Some(self.pos);
        self.pos += pnk!(field_span(self.buf, self.pos));
        true
    }

    /// The element `next()` last stopped on.
    pub fn field(&self) -> Result<FieldRef<'a>> {
        let off = self
            .cur
            .ok_or_else(|| eg!("InvalidArgument: no current element"))?;
        FieldRef::new(self.buf, off)
    }

    /// Remaining elements from the current position, consuming the cursor.
    pub fn count_remaining(mut self) -> usize {
        let mut n = 0;
        while self.next() {
            n += 1;
        }
        n
    }
}
