use super::*;
use ruc::*;

#[test]
fn uintvar_widths() {
    assert_eq!(uintvar_len(0), 1);
    assert_eq!(uintvar_len(127), 1);
    assert_eq!(uintvar_len(128), 2);
    assert_eq!(uintvar_len(16383), 2);
    assert_eq!(uintvar_len(16384), 3);
    assert_eq!(uintvar_len(u64::MAX), 10);
}

#[test]
fn uintvar_roundtrip() {
    for v in [0u64, 1, 127, 128, 300, 16384, 1 << 30, u64::MAX] {
        let enc = uintvar_encode(v);
        assert_eq!(enc.len(), uintvar_len(v));
        let (dec, n) = pnk!(uintvar_decode(&enc, 0));
        assert_eq!(dec, v);
        assert_eq!(n, enc.len());
    }
}

#[test]
fn uintvar_is_little_endian_grouped() {
    // 300 = 0b10_0101100 -> low group 0x2c | 0x80, high group 0x02
    assert_eq!(uintvar_encode(300), vec![0xac, 0x02]);
}

#[test]
fn truncated_uintvar_is_an_error() {
    assert!(uintvar_decode(&[0x80], 0).is_err());
    assert!(uintvar_decode(&[], 0).is_err());
}

#[test]
fn cursor_read_write() {
    let mut mf = pnk!(MemFile::new());
    pnk!(mf.write_byte(7));
    pnk!(mf.write_u32(0xdead_beef));
    pnk!(mf.write_uintvar(300));

    pnk!(mf.seek(0));
    assert_eq!(pnk!(mf.read_byte()), 7);
    assert_eq!(pnk!(mf.read_u32()), 0xdead_beef);
    assert_eq!(pnk!(mf.read_uintvar()), 300);
    assert_eq!(mf.pos(), mf.len());
}

#[test]
fn fixed_width_is_little_endian() {
    let mut mf = pnk!(MemFile::new());
    pnk!(mf.write_u16(0x0102));
    assert_eq!(mf.bytes(), &[0x02, 0x01]);
}

#[test]
fn reads_never_extend() {
    let mut mf = pnk!(MemFile::from_bytes(&[1, 2]));
    pnk!(mf.seek(1));
    assert!(mf.read_u32().is_err());
    assert_eq!(mf.len(), 2);
    assert!(mf.seek(3).is_err());
}

#[test]
fn writes_extend_at_the_tail() {
    let mut mf = pnk!(MemFile::from_bytes(&[1, 2, 3]));
    pnk!(mf.seek(2));
    pnk!(mf.write(&[9, 9, 9]));
    assert_eq!(mf.bytes(), &[1, 2, 9, 9, 9]);
}

#[test]
fn gap_insert_and_remove() {
    let mut mf = pnk!(MemFile::from_bytes(&[1, 2, 5, 6]));
    pnk!(mf.insert_at(2, &[3, 4]));
    assert_eq!(mf.bytes(), &[1, 2, 3, 4, 5, 6]);
    mf.remove_range(1, 3);
    assert_eq!(mf.bytes(), &[1, 5, 6]);
}

#[test]
fn gap_insert_shifts_the_cursor() {
    let mut mf = pnk!(MemFile::from_bytes(&[1, 2, 3]));
    pnk!(mf.seek(2));
    pnk!(mf.insert_gap(0, 2));
    assert_eq!(mf.pos(), 4);
}

#[test]
fn uintvar_rewrite_adjusts_slot_width() {
    let mut mf = pnk!(MemFile::new());
    pnk!(mf.write_uintvar(5));
    pnk!(mf.write_byte(0xEE));

    // widen 1 -> 2 bytes
    assert_eq!(pnk!(mf.uintvar_rewrite(0, 300)), 1);
    let (v, w) = pnk!(uintvar_decode(mf.bytes(), 0));
    assert_eq!((v, w), (300, 2));
    assert_eq!(mf.bytes()[2], 0xEE);

    // narrow 2 -> 1 byte
    assert_eq!(pnk!(mf.uintvar_rewrite(0, 9)), -1);
    assert_eq!(mf.bytes(), &[9, 0xEE]);
}

#[test]
fn duplicate_is_independent() {
    let mut a = pnk!(MemFile::from_bytes(&[1, 2, 3]));
    let mut b = pnk!(a.duplicate());
    pnk!(b.seek(0));
    pnk!(b.write_byte(9));
    pnk!(a.seek(0));
    assert_eq!(pnk!(a.read_byte()), 1);
}
