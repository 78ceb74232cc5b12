use super::float_is_null;
use crate::field::{
    parse_column, ColumnHeader, ColumnType, FieldType, BOOL_FALSE, BOOL_NULL, BOOL_TRUE,
    I16_NULL, I32_NULL, I64_NULL, I8_NULL, U16_NULL, U32_NULL, U64_NULL, U8_NULL,
};
use ruc::*;

/// Decoded column cell; in-band null patterns come back as `Null`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColValue {
    Null,
    Unsigned(u64),
    Signed(i64),
    Float(f32),
    Boolean(bool),
}

/// Cursor plus random access over a typed column.
#[derive(Clone, Debug)]
pub struct ColumnIter<'a> {
    buf: &'a [u8],
    header: ColumnHeader,
    cursor: Option<usize>,
}

impl<'a> ColumnIter<'a> {
    pub(crate) fn new(buf: &'a [u8], container_off: usize) -> Result<Self> {
        Ok(Self {
            buf,
            header: parse_column(buf, container_off).c(d!())?,
            cursor: None,
        })
    }

    #[inline(always)]
    pub fn column_type(&self) -> ColumnType {
        self.header.ty
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.header.count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.header.cap
    }

    pub fn next(&mut self) -> bool {
        let next = self.cursor.map(|i| i + 1).unwrap_or(0);
        if next >= self.header.count {
            return false;
        }
        self.cursor = Some(next);
        true
    }

    /// The cell `next()` last stopped on.
    pub fn value(&self) -> Result<ColValue> {
        let i = self
            .cursor
            .ok_or_else(|| eg!("InvalidArgument: no current cell"))?;
        self.get(i)
    }

    pub fn get(&self, i: usize) -> Result<ColValue> {
        if i >= self.header.count {
            return Err(eg!(format!(
                "IndexOutOfRange: cell {} of {}",
                i, self.header.count
            )));
        }
        let w = self.header.ty.width();
        let p = &self.buf[self.header.values_off + i * w..];
        Ok(match self.header.ty {
            ColumnType::U8 => match p[0] {
                U8_NULL => ColValue::Null,
                v => ColValue::Unsigned(v as u64),
            },
            ColumnType::U16 => match u16::from_le_bytes([p[0], p[1]]) {
                U16_NULL => ColValue::Null,
                v => ColValue::Unsigned(v as u64),
            },
            ColumnType::U32 => match u32::from_le_bytes([p[0], p[1], p[2], p[3]]) {
                U32_NULL => ColValue::Null,
                v => ColValue::Unsigned(v as u64),
            },
            ColumnType::U64 => match u64::from_le_bytes(p[..8].try_into().unwrap()) {
                U64_NULL => ColValue::Null,
                v => ColValue::Unsigned(v),
            },
            ColumnType::I8 => match p[0] as i8 {
                I8_NULL => ColValue::Null,
                v => ColValue::Signed(v as i64),
            },
            ColumnType::I16 => match i16::from_le_bytes([p[0], p[1]]) {
                I16_NULL => ColValue::Null,
                v => ColValue::Signed(v as i64),
            },
            ColumnType::I32 => match i32::from_le_bytes([p[0], p[1], p[2], p[3]]) {
                I32_NULL => ColValue::Null,
                v => ColValue::Signed(v as i64),
            },
            ColumnType::I64 => match i64::from_le_bytes(p[..8].try_into().unwrap()) {
                I64_NULL => ColValue::Null,
                v => ColValue::Signed(v),
            },
            ColumnType::Float => {
                let v = f32::from_le_bytes([p[0], p[1], p[2], p[3]]);
                if float_is_null(v) {
                    ColValue::Null
                } else {
                    ColValue::Float(v)
                }
            }
            ColumnType::Boolean => match p[0] {
                BOOL_FALSE => ColValue::Boolean(false),
                BOOL_TRUE => ColValue::Boolean(true),
                BOOL_NULL => ColValue::Null,
                v => return Err(eg!(format!("InternalInvariant: boolean cell {}", v))),
            },
        })
    }

    /// Field type a path lookup reports for cell `i`.
    pub fn cell_field_type(&self, i: usize) -> Result<FieldType> {
        Ok(match self.get(i).c(d!())? {
            ColValue::Null => FieldType::Null,
            ColValue::Boolean(true) => FieldType::True,
            ColValue::Boolean(false) => FieldType::False,
            _ => self.header.ty.field_type(),
        })
    }
}
