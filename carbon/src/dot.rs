//!
//! # Dot paths
//!
//! The external addressing syntax: `a.b."quoted key".3`. Atoms are property
//! keys (bare or double-quoted) or non-negative container indices, separated
//! by dots, whitespace-tolerant.
//!

use ruc::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DotAtom {
    Idx(u64),
    Key(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DotPath {
    atoms: Vec<DotAtom>,
}

impl DotPath {
    #[inline(always)]
    pub fn atoms(&self) -> &[DotAtom] {
        &self.atoms
    }

    pub fn parse(input: &str) -> Result<Self> {
        let bytes = input.as_bytes();
        let mut pos = 0;
        let mut atoms = vec![];

        loop {
            skip_ws(bytes, &mut pos);
            atoms.push(atom(bytes, &mut pos).c(d!())?);
            skip_ws(bytes, &mut pos);
            match bytes.get(pos) {
                None => return Ok(Self { atoms }),
                Some(b'.') => pos += 1,
                Some(c) => {
                    return Err(eg!(format!(
                        "MalformedPath: unexpected '{}' at byte {}",
                        *c as char, pos
                    )));
                }
            }
        }
    }
}

fn skip_ws(bytes: &[u8], pos: &mut usize) {
    while bytes.get(*pos).map_or(false, |b| b.is_ascii_whitespace()) {
        *pos += 1;
    }
}

fn atom(bytes: &[u8], pos: &mut usize) -> Result<DotAtom> {
    match bytes.get(*pos) {
        Some(b'"') => quoted(bytes, pos),
        Some(_) => ident(bytes, pos),
        None => Err(eg!("MalformedPath: missing path atom")),
    }
}

fn quoted(bytes: &[u8], pos: &mut usize) -> Result<DotAtom> {
    *pos += 1; // opening quote
    let mut key = Vec::new();
    loop {
        match bytes.get(*pos) {
            None => return Err(eg!("MalformedPath: unterminated quote")),
            Some(b'"') => {
                *pos += 1;
                return String::from_utf8(key).c(d!()).map(DotAtom::Key);
            }
            Some(b'\\') if bytes.get(*pos + 1) == Some(&b'"') => {
                key.push(b'"');
                *pos += 2;
            }
            Some(b) => {
                key.push(*b);
                *pos += 1;
            }
        }
    }
}

fn ident(bytes: &[u8], pos: &mut usize) -> Result<DotAtom> {
    let start = *pos;
    while bytes
        .get(*pos)
        .map_or(false, |b| !b.is_ascii_whitespace() && *b != b'.' && *b != b'"')
    {
        *pos += 1;
    }
    if *pos == start {
        return Err(eg!("MalformedPath: empty path atom"));
    }
    let word = std::str::from_utf8(&bytes[start..*pos]).c(d!())?;
    if word.bytes().all(|b| b.is_ascii_digit()) {
        word.parse::<u64>().c(d!()).map(DotAtom::Idx)
    } else {
        Ok(DotAtom::Key(word.to_owned()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_idents_and_indices() {
        let p = pnk!(DotPath::parse("a.b.3"));
        assert_eq!(
            p.atoms(),
            &[
                DotAtom::Key("a".to_owned()),
                DotAtom::Key("b".to_owned()),
                DotAtom::Idx(3),
            ]
        );
    }

    #[test]
    fn quoted_atoms_accept_anything() {
        let p = pnk!(DotPath::parse(r#"a."x.y z"."esc\"aped""#));
        assert_eq!(
            p.atoms(),
            &[
                DotAtom::Key("a".to_owned()),
                DotAtom::Key("x.y z".to_owned()),
                DotAtom::Key("esc\"aped".to_owned()),
            ]
        );
    }

    #[test]
    fn whitespace_is_tolerated() {
        let p = pnk!(DotPath::parse("  a .  2 . b "));
        assert_eq!(
            p.atoms(),
            &[
                DotAtom::Key("a".to_owned()),
                DotAtom::Idx(2),
                DotAtom::Key("b".to_owned()),
            ]
        );
    }

    #[test]
    fn quoted_digits_stay_keys() {
        let p = pnk!(DotPath::parse(r#""23""#));
        assert_eq!(p.atoms(), &[DotAtom::Key("23".to_owned())]);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(DotPath::parse("").is_err());
        assert!(DotPath::parse("a..b").is_err());
        assert!(DotPath::parse("a.").is_err());
        assert!(DotPath::parse(".a").is_err());
        assert!(DotPath::parse(r#""open"#).is_err());
        assert!(DotPath::parse("a b").is_err());
    }
}
