//!
//! # Carbon record
//!
//! A record is one memfile: a key-type byte, the key value, a 64-bit commit
//! hash, and a root array holding all user data. Keyed records get a commit
//! hash mixing a per-document seed (derived from the key, hence recoverable
//! from the wire) with a Bernstein hash of the payload; `nokey` records pin
//! the commit to 0.
//!


use crate::{
    abstracts::{self, AbstractClass},
    field::{classify, field_span, read_len_prefixed, FieldType, MARKER_ARRAY_BEGIN,
            MARKER_ARRAY_END},
    find::Find,
    insert::Inserter,
    iter::ArrayIter,
    memfile::{uintvar_decode, MemFile},
};
use carbon_core::hash;
use ruc::*;

pub const KEY_NOKEY: u8 = b'?';
pub const KEY_AUTOKEY: u8 = b'*';
pub const KEY_UKEY: u8 = b'+';
pub const KEY_IKEY: u8 = b'-';
pub const KEY_SKEY: u8 = b'!';

/// 16 lowercase hex digits.
pub fn commit_to_str(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Accepts exactly 16 hex digits; anything else parses to 0.
pub fn commit_from_str(s: &str) -> u64 {
    if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return 0;
    }
    u64::from_str_radix(s, 16).unwrap_or(0)
}

/// Key requested at record creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    NoKey,
    /// 64-bit random key generated at creation.
    Auto,
    Unsigned(u64),
    Signed(i64),
    Str(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    NoKey,
    Auto,
    Unsigned,
    Signed,
    Str,
}

impl KeyType {
    fn from_marker(marker: u8) -> Result<Self> {
        match marker {
            KEY_NOKEY => Ok(KeyType::NoKey),
            KEY_AUTOKEY => Ok(KeyType::Auto),
            KEY_UKEY => Ok(KeyType::Unsigned),
            KEY_IKEY => Ok(KeyType::Signed),
            KEY_SKEY => Ok(KeyType::Str),
            m => Err(eg!(format!("InternalInvariant: key marker 0x{:02x}", m))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyType::NoKey => "nokey",
            KeyType::Auto => "autokey",
            KeyType::Unsigned => "ukey",
            KeyType::Signed => "ikey",
            KeyType::Str => "skey",
        }
    }
}

pub struct Carbon {
    mf: MemFile,
    commit_off: usize,
    root_off: usize,
    up_to_date: bool,
}

impl Carbon {
    /// Empty record carrying the given key.
    pub fn new(key: Key) -> Result<Self> {
        Self::create(key, |_| Ok(()))
    }

    /// Build a record: the closure appends into the (still open) root array,
    /// then the record is sealed.
    pub fn create<F>(key: Key, fill: F) -> Result<Self>
    where
        F: FnOnce(&mut Inserter) -> Result<()>,
    {
        let mut mf = MemFile::new().c(d!())?;
        match key {
            Key::NoKey => mf.write_byte(KEY_NOKEY).c(d!())?,
            Key::Auto => {
                mf.write_byte(KEY_AUTOKEY).c(d!())?;
                mf.write_u64(rand::random::<u64>()).c(d!())?;
            }
            Key::Unsigned(v) => {
                mf.write_byte(KEY_UKEY).c(d!())?;
                mf.write_u64(v).c(d!())?;
            }
            Key::Signed(v) => {
                mf.write_byte(KEY_IKEY).c(d!())?;
                mf.write_i64(v).c(d!())?;
            }
            Key::Str(ref s) => {
                mf.write_byte(KEY_SKEY).c(d!())?;
                mf.write_uintvar(s.len() as u64).c(d!())?;
                mf.write(s.as_bytes()).c(d!())?;
            }
        }
        let commit_off = mf.pos();
        mf.write_u64(0).c(d!())?;
        let root_off = mf.pos();
        mf.write(&[MARKER_ARRAY_BEGIN, MARKER_ARRAY_END]).c(d!())?;

        let mut doc = Self {
            mf,
            commit_off,
            root_off,
            up_to_date: false,
        };
        {
            let closer = doc.mf.len() - 1;
            let mut ins = Inserter::at(&mut doc.mf, closer);
            fill(&mut ins).c(d!())?;
        }
        doc.seal().c(d!())?;
        Ok(doc)
    }

    /// Parse and fully validate a wire record; an unknown marker anywhere is
    /// fatal for the record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mf = MemFile::from_bytes(bytes).c(d!())?;
        let mut doc = Self {
            mf,
            commit_off: 0,
            root_off: 0,
            up_to_date: true,
        };
        doc.relocate().c(d!())?;
        Ok(doc)
    }

    // Recompute the prefix offsets and re-validate the root container.
    pub(crate) fn relocate(&mut self) -> Result<()> {
        let buf = self.mf.bytes();
        let key_ty = KeyType::from_marker(
            *buf.get(0)
                .ok_or_else(|| eg!("IndexOutOfRange: empty record"))?,
        )
        .c(d!())?;
        let key_width = match key_ty {
            KeyType::NoKey => 0,
            KeyType::Auto | KeyType::Unsigned | KeyType::Signed => 8,
            KeyType::Str => {
                let (len, w) = uintvar_decode(buf, 1).c(d!())?;
                w + len as usize
            }
        };
        self.commit_off = 1 + key_width;
        self.root_off = self.commit_off + 8;

        if classify(buf, self.root_off).c(d!())? != FieldType::Array {
            return Err(eg!("InternalInvariant: record root is not an array"));
        }
        let span = field_span(buf, self.root_off).c(d!())?;
        if self.root_off + span != buf.len() {
            return Err(eg!("InternalInvariant: trailing bytes after record root"));
        }
        Ok(())
    }

    pub fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            mf: self.mf.duplicate().c(d!())?,
            commit_off: self.commit_off,
            root_off: self.root_off,
            up_to_date: self.up_to_date,
        })
    }

    #[inline(always)]
    pub fn bytes(&self) -> &[u8] {
        self.mf.bytes()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.mf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        // the prefix alone is not user data
        ArrayIter::new(self.bytes(), self.root_off)
            .map(|it| it.count_remaining() == 0)
            .unwrap_or(true)
    }

    pub fn key_type(&self) -> KeyType {
        pnk!(KeyType::from_marker(self.bytes()[0]))
    }

    pub fn key_unsigned(&self) -> Result<u64> {
        match self.key_type() {
            KeyType::Auto | KeyType::Unsigned => Ok(u64::from_le_bytes(
                self.bytes()[1..9].try_into().unwrap(),
            )),
            ty => Err(eg!(format!("TypeMismatch: {} holds no u64", ty.name()))),
        }
    }

    pub fn key_signed(&self) -> Result<i64> {
        match self.key_type() {
            KeyType::Signed => Ok(i64::from_le_bytes(
                self.bytes()[1..9].try_into().unwrap(),
            )),
            ty => Err(eg!(format!("TypeMismatch: {} holds no i64", ty.name()))),
        }
    }

    pub fn key_string(&self) -> Result<&str> {
        match self.key_type() {
            KeyType::Str => {
                let (s, _) = read_len_prefixed(self.bytes(), 1).c(d!())?;
                std::str::from_utf8(s).c(d!())
            }
            ty => Err(eg!(format!("TypeMismatch: {} holds no string", ty.name()))),
        }
    }

    #[inline(always)]
    pub fn commit_hash(&self) -> u64 {
        u64::from_le_bytes(
            self.bytes()[self.commit_off..self.commit_off + 8]
                .try_into()
                .unwrap(),
        )
    }

    /// False only while a revise session owns this document clone.
    #[inline(always)]
    pub fn is_up_to_date(&self) -> bool {
        self.up_to_date
    }

    /// Abstract type class of the root container.
    pub fn root_class(&self) -> AbstractClass {
        pnk!(abstracts::class_of_marker(self.bytes()[self.root_off]))
    }

    /// Iterator over the root array.
    pub fn iterator(&self) -> ArrayIter<'_> {
        pnk!(ArrayIter::new(self.bytes(), self.root_off))
    }

    /// Resolve a dot path against this record.
    pub fn find(&self, path: &str) -> Result<Find<'_>> {
        Find::resolve(self, path)
    }

    #[inline(always)]
    pub(crate) fn root_off(&self) -> usize {
        self.root_off
    }

    #[inline(always)]
    pub(crate) fn commit_off(&self) -> usize {
        self.commit_off
    }

    #[inline(always)]
    pub(crate) fn mf_mut(&mut self) -> &mut MemFile {
        &mut self.mf
    }

    #[inline(always)]
    pub(crate) fn mark_dirty(&mut self) {
        self.up_to_date = false;
    }

    /// Offset one past the last element, i.e. the root closer byte.
    pub(crate) fn root_closer(&self) -> usize {
        debug_assert_eq!(self.bytes()[self.len() - 1], MARKER_ARRAY_END);
        self.len() - 1
    }

    fn seed(&self) -> u64 {
        match self.key_type() {
            KeyType::NoKey => 0,
            KeyType::Auto | KeyType::Unsigned | KeyType::Signed => {
                u64::from_le_bytes(self.bytes()[1..9].try_into().unwrap())
            }
            KeyType::Str => {
                let (s, _) = pnk!(read_len_prefixed(self.bytes(), 1));
                hash::bernstein(s)
            }
        }
    }

    fn commit_compute(&self) -> u64 {
        let payload = &self.bytes()[self.root_off..];
        let mut x = hash::bernstein(payload) ^ self.seed().rotate_left(31);
        x ^= x >> 33;
        x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
        x ^= x >> 33;
        // 0 is reserved for nokey records
        x.max(1)
    }

    /// Write the commit hash; called on creation and at revise end.
    pub(crate) fn seal(&mut self) -> Result<()> {
        let commit = alt!(
            self.key_type() == KeyType::NoKey,
            0,
            self.commit_compute()
        );
        let commit_off = self.commit_off;
        self.mf.seek(commit_off).c(d!())?;
        self.mf.write_u64(commit).c(d!())?;
        self.up_to_date = true;
        Ok(())
    }
}

impl std::fmt::Debug for Carbon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Carbon")
            .field("key_type", &self.key_type().name())
            .field("commit", &commit_to_str(self.commit_hash()))
            .field("len", &self.len())
            .finish()
    }
}
