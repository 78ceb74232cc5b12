//!
//! # Field taxonomy
//!
//! The closed marker alphabet of the record format. Every value is introduced
//! by one marker byte; readers peek it to classify, writers emit it ahead of
//! the payload. Container markers come in a base form plus derived variants
//! carrying a stronger abstract type class (see [`crate::abstracts`]).
//!

use crate::memfile::uintvar_decode;
use ruc::*;

// constants
pub const MARKER_NULL: u8 = b'n';
pub const MARKER_TRUE: u8 = b't';
pub const MARKER_FALSE: u8 = b'f';

// fixed-width numerics
pub const MARKER_U8: u8 = b'c';
pub const MARKER_U16: u8 = b'd';
pub const MARKER_U32: u8 = b'i';
pub const MARKER_U64: u8 = b'l';
pub const MARKER_I8: u8 = b'C';
pub const MARKER_I16: u8 = b'D';
pub const MARKER_I32: u8 = b'I';
pub const MARKER_I64: u8 = b'L';
pub const MARKER_FLOAT: u8 = b'r';

// strings and binaries
pub const MARKER_STRING: u8 = b's';
pub const MARKER_BINARY: u8 = b'b';
pub const MARKER_BINARY_CUSTOM: u8 = b'x';

// containers, base (= unsorted-multiset / unsorted-multimap) form
pub const MARKER_OBJECT_BEGIN: u8 = b'{';
pub const MARKER_OBJECT_END: u8 = b'}';
pub const MARKER_ARRAY_BEGIN: u8 = b'[';
pub const MARKER_ARRAY_END: u8 = b']';
pub const MARKER_COLUMN_U8: u8 = b'1';
pub const MARKER_COLUMN_U16: u8 = b'2';
pub const MARKER_COLUMN_U32: u8 = b'3';
pub const MARKER_COLUMN_U64: u8 = b'4';
pub const MARKER_COLUMN_I8: u8 = b'5';
pub const MARKER_COLUMN_I16: u8 = b'6';
pub const MARKER_COLUMN_I32: u8 = b'7';
pub const MARKER_COLUMN_I64: u8 = b'8';
pub const MARKER_COLUMN_FLOAT: u8 = b'R';
pub const MARKER_COLUMN_BOOLEAN: u8 = b'B';

// Derived container markers live in a reserved non-ASCII block. Objects and
// arrays take one byte per stronger class; columns take three bytes per
// primitive, one per stronger class, starting at DERIVED_COLUMN_BASE.
pub const DERIVED_OBJECT_SORTED_MULTIMAP: u8 = 0x81;
pub const DERIVED_OBJECT_UNSORTED_MAP: u8 = 0x82;
pub const DERIVED_OBJECT_SORTED_MAP: u8 = 0x83;
pub const DERIVED_ARRAY_SORTED_MULTISET: u8 = 0x84;
pub const DERIVED_ARRAY_UNSORTED_SET: u8 = 0x85;
pub const DERIVED_ARRAY_SORTED_SET: u8 = 0x86;
pub const DERIVED_COLUMN_BASE: u8 = 0x90;

// in-band null patterns
pub const U8_NULL: u8 = u8::MAX;
pub const U16_NULL: u16 = u16::MAX;
pub const U32_NULL: u32 = u32::MAX;
pub const U64_NULL: u64 = u64::MAX;
pub const I8_NULL: i8 = i8::MIN;
pub const I16_NULL: i16 = i16::MIN;
pub const I32_NULL: i32 = i32::MIN;
pub const I64_NULL: i64 = i64::MIN;
pub const FLOAT_NULL_BITS: u32 = 0x7fc0_0000; // canonical quiet NaN

// boolean column cells
pub const BOOL_FALSE: u8 = 0;
pub const BOOL_TRUE: u8 = 1;
pub const BOOL_NULL: u8 = 2;

/// Primitive element type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    Boolean,
}

impl ColumnType {
    pub const ALL: [ColumnType; 10] = [
        ColumnType::U8,
        ColumnType::U16,
        ColumnType::U32,
        ColumnType::U64,
        ColumnType::I8,
        ColumnType::I16,
        ColumnType::I32,
        ColumnType::I64,
        ColumnType::Float,
        ColumnType::Boolean,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Packed cell width in bytes.
    #[inline(always)]
    pub const fn width(self) -> usize {
        match self {
            ColumnType::U8 | ColumnType::I8 | ColumnType::Boolean => 1,
            ColumnType::U16 | ColumnType::I16 => 2,
            ColumnType::U32 | ColumnType::I32 | ColumnType::Float => 4,
            ColumnType::U64 | ColumnType::I64 => 8,
        }
    }

    /// Base (unsorted-multiset) column opener.
    #[inline(always)]
    pub const fn base_marker(self) -> u8 {
        match self {
            ColumnType::U8 => MARKER_COLUMN_U8,
            ColumnType::U16 => MARKER_COLUMN_U16,
            ColumnType::U32 => MARKER_COLUMN_U32,
            ColumnType::U64 => MARKER_COLUMN_U64,
            ColumnType::I8 => MARKER_COLUMN_I8,
            ColumnType::I16 => MARKER_COLUMN_I16,
            ColumnType::I32 => MARKER_COLUMN_I32,
            ColumnType::I64 => MARKER_COLUMN_I64,
            ColumnType::Float => MARKER_COLUMN_FLOAT,
            ColumnType::Boolean => MARKER_COLUMN_BOOLEAN,
        }
    }

    /// Element-type tag written into the column header.
    #[inline(always)]
    pub const fn prim_marker(self) -> u8 {
        match self {
            ColumnType::U8 => MARKER_U8,
            ColumnType::U16 => MARKER_U16,
            ColumnType::U32 => MARKER_U32,
            ColumnType::U64 => MARKER_U64,
            ColumnType::I8 => MARKER_I8,
            ColumnType::I16 => MARKER_I16,
            ColumnType::I32 => MARKER_I32,
            ColumnType::I64 => MARKER_I64,
            ColumnType::Float => MARKER_FLOAT,
            ColumnType::Boolean => MARKER_COLUMN_BOOLEAN,
        }
    }

    /// Scalar field type a non-null cell reads back as.
    #[inline(always)]
    pub const fn field_type(self) -> FieldType {
        match self {
            ColumnType::U8 => FieldType::U8,
            ColumnType::U16 => FieldType::U16,
            ColumnType::U32 => FieldType::U32,
            ColumnType::U64 => FieldType::U64,
            ColumnType::I8 => FieldType::I8,
            ColumnType::I16 => FieldType::I16,
            ColumnType::I32 => FieldType::I32,
            ColumnType::I64 => FieldType::I64,
            ColumnType::Float => FieldType::Float,
            // boolean cells surface as the true/false constants
            ColumnType::Boolean => FieldType::True,
        }
    }

    fn from_index(i: usize) -> Option<ColumnType> {
        Self::ALL.get(i).copied()
    }
}

/// Reader-visible class of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Null,
    True,
    False,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    String,
    Binary,
    BinaryCustom,
    Array,
    Object,
    Column(ColumnType),
}

impl FieldType {
    #[inline(always)]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::U8
                | FieldType::U16
                | FieldType::U32
                | FieldType::U64
                | FieldType::I8
                | FieldType::I16
                | FieldType::I32
                | FieldType::I64
                | FieldType::Float
        )
    }

    #[inline(always)]
    pub fn is_container(self) -> bool {
        matches!(
            self,
            FieldType::Array | FieldType::Object | FieldType::Column(_)
        )
    }

    /// Payload width of a fixed numeric, marker excluded.
    pub fn numeric_width(self) -> Option<usize> {
        match self {
            FieldType::U8 | FieldType::I8 => Some(1),
            FieldType::U16 | FieldType::I16 => Some(2),
            FieldType::U32 | FieldType::I32 | FieldType::Float => Some(4),
            FieldType::U64 | FieldType::I64 => Some(8),
            _ => None,
        }
    }
}

/// Column opener classification covering base and derived markers.
pub fn column_type_of_marker(marker: u8) -> Option<ColumnType> {
    match marker {
        MARKER_COLUMN_U8 => Some(ColumnType::U8),
        MARKER_COLUMN_U16 => Some(ColumnType::U16),
        MARKER_COLUMN_U32 => Some(ColumnType::U32),
        MARKER_COLUMN_U64 => Some(ColumnType::U64),
        MARKER_COLUMN_I8 => Some(ColumnType::I8),
        MARKER_COLUMN_I16 => Some(ColumnType::I16),
        MARKER_COLUMN_I32 => Some(ColumnType::I32),
        MARKER_COLUMN_I64 => Some(ColumnType::I64),
        MARKER_COLUMN_FLOAT => Some(ColumnType::Float),
        MARKER_COLUMN_BOOLEAN => Some(ColumnType::Boolean),
        m if (DERIVED_COLUMN_BASE..DERIVED_COLUMN_BASE + 30).contains(&m) => {
            ColumnType::from_index((m - DERIVED_COLUMN_BASE) as usize / 3)
        }
        _ => None,
    }
}

#[inline(always)]
pub fn is_array_marker(marker: u8) -> bool {
    matches!(
        marker,
        MARKER_ARRAY_BEGIN
            | DERIVED_ARRAY_SORTED_MULTISET
            | DERIVED_ARRAY_UNSORTED_SET
            | DERIVED_ARRAY_SORTED_SET
    )
}

#[inline(always)]
pub fn is_object_marker(marker: u8) -> bool {
    matches!(
        marker,
        MARKER_OBJECT_BEGIN
            | DERIVED_OBJECT_SORTED_MULTIMAP
            | DERIVED_OBJECT_UNSORTED_MAP
            | DERIVED_OBJECT_SORTED_MAP
    )
}

/// Classify the marker byte at `off`.
pub fn classify(buf: &[u8], off: usize) -> Result<FieldType> {
    let marker = *buf
        .get(off)
        .ok_or_else(|| eg!("IndexOutOfRange: no marker byte"))?;
    match marker {
        MARKER_NULL => Ok(FieldType::Null),
        MARKER_TRUE => Ok(FieldType::True),
        MARKER_FALSE => Ok(FieldType::False),
        MARKER_U8 => Ok(FieldType::U8),
        MARKER_U16 => Ok(FieldType::U16),
        MARKER_U32 => Ok(FieldType::U32),
        MARKER_U64 => Ok(FieldType::U64),
        MARKER_I8 => Ok(FieldType::I8),
        MARKER_I16 => Ok(FieldType::I16),
        MARKER_I32 => Ok(FieldType::I32),
        MARKER_I64 => Ok(FieldType::I64),
        MARKER_FLOAT => Ok(FieldType::Float),
        MARKER_STRING => Ok(FieldType::String),
        MARKER_BINARY => Ok(FieldType::Binary),
        MARKER_BINARY_CUSTOM => Ok(FieldType::BinaryCustom),
        m if is_array_marker(m) => Ok(FieldType::Array),
        m if is_object_marker(m) => Ok(FieldType::Object),
        m => column_type_of_marker(m)
            .map(FieldType::Column)
            .ok_or_else(|| eg!(format!("InternalInvariant: unknown marker 0x{:02x}", m))),
    }
}

/// Parsed column header.
#[derive(Clone, Copy, Debug)]
pub struct ColumnHeader {
    pub ty: ColumnType,
    pub cap: usize,
    pub count: usize,
    /// Offset of the packed cells.
    pub values_off: usize,
    /// Offset of the capacity uintvar.
    pub cap_off: usize,
    /// Offset of the count uintvar.
    pub count_off: usize,
    /// Whole field, marker through reserved region.
    pub span: usize,
}

pub fn parse_column(buf: &[u8], off: usize) -> Result<ColumnHeader> {
    let marker = buf[off];
    let ty = column_type_of_marker(marker)
        .ok_or_else(|| eg!("TypeMismatch: not a column field"))?;
    let tag = *buf
        .get(off + 1)
        .ok_or_else(|| eg!("IndexOutOfRange: truncated column header"))?;
    if tag != ty.prim_marker() {
        return Err(eg!(format!(
            "InternalInvariant: column element tag 0x{:02x} contradicts marker 0x{:02x}",
            tag, marker
        )));
    }
    let cap_off = off + 2;
    let (cap, cap_w) = uintvar_decode(buf, cap_off).c(d!())?;
    let count_off = cap_off + cap_w;
    let (count, count_w) = uintvar_decode(buf, count_off).c(d!())?;
    if count > cap {
        return Err(eg!("InternalInvariant: column count exceeds capacity"));
    }
    let values_off = count_off + count_w;
    let span = values_off - off + cap as usize * ty.width();
    if off + span > buf.len() {
        return Err(eg!("IndexOutOfRange: truncated column payload"));
    }
    Ok(ColumnHeader {
        ty,
        cap: cap as usize,
        count: count as usize,
        values_off,
        cap_off,
        count_off,
        span,
    })
}

/// Read a uintvar-length-prefixed byte run (string payloads, property keys).
pub fn read_len_prefixed(buf: &[u8], off: usize) -> Result<(&[u8], usize)> {
    let (len, w) = uintvar_decode(buf, off).c(d!())?;
    let start = off + w;
    let end = start + len as usize;
    if end > buf.len() {
        return Err(eg!("IndexOutOfRange: truncated byte run"));
    }
    Ok((&buf[start..end], w + len as usize))
}

/// Byte length of the whole field at `off`, marker included. Containers are
/// walked to their closers; unknown markers are fatal.
pub fn field_span(buf: &[u8], off: usize) -> Result<usize> {
    let ty = classify(buf, off).c(d!())?;
    match ty {
        FieldType::Null | FieldType::True | FieldType::False => Ok(1),
        _ if ty.numeric_width().is_some() => Ok(1 + ty.numeric_width().unwrap()),
        FieldType::String => {
            let (_, n) = read_len_prefixed(buf, off + 1).c(d!())?;
            Ok(1 + n)
        }
        FieldType::Binary | FieldType::BinaryCustom => {
            let (_, tag_n) = read_len_prefixed(buf, off + 1).c(d!())?;
            let (_, payload_n) = read_len_prefixed(buf, off + 1 + tag_n).c(d!())?;
            Ok(1 + tag_n + payload_n)
        }
        FieldType::Array => {
            let mut pos = off + 1;
            loop {
                if *buf
                    .get(pos)
                    .ok_or_else(|| eg!("InternalInvariant: unterminated array"))?
                    == MARKER_ARRAY_END
                {
                    return Ok(pos + 1 - off);
                }
                pos += field_span(buf, pos).c(d!())?;
            }
        }
        FieldType::Object => {
            let mut pos = off + 1;
            loop {
                if *buf
                    .get(pos)
                    .ok_or_else(|| eg!("InternalInvariant: unterminated object"))?
                    == MARKER_OBJECT_END
                {
                    return Ok(pos + 1 - off);
                }
                let (_, key_n) = read_len_prefixed(buf, pos).c(d!())?;
                pos += key_n;
                pos += field_span(buf, pos).c(d!())?;
            }
        }
        FieldType::Column(_) => parse_column(buf, off).map(|h| h.span),
        _ => unreachable!(),
    }
}
