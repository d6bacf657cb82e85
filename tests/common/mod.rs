#![allow(dead_code)]

/// Plain box: 32-bit size, type, body.
pub fn bx(typ: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut v = ((8 + body.len()) as u32).to_be_bytes().to_vec();
    v.extend_from_slice(typ);
    v.extend_from_slice(body);
    v
}

/// Box whose size field claims `size` regardless of the body length.
pub fn bx_sized(size: u32, typ: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut v = size.to_be_bytes().to_vec();
    v.extend_from_slice(typ);
    v.extend_from_slice(body);
    v
}

/// FullBox: version + 24-bit flags before the body.
pub fn full_bx(typ: &[u8; 4], version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![version];
    payload.extend_from_slice(&flags.to_be_bytes()[1..]);
    payload.extend_from_slice(body);
    bx(typ, &payload)
}

pub fn ftyp() -> Vec<u8> {
    let mut body = b"isom".to_vec();
    body.extend_from_slice(&0x200u32.to_be_bytes());
    body.extend_from_slice(b"isomiso2");
    bx(b"ftyp", &body)
}

/// Visual sample entry body up to (not including) its nested boxes.
pub fn visual_entry_fields(width: u16, height: u16) -> Vec<u8> {
    let mut v = vec![0u8; 6];
    v.extend_from_slice(&1u16.to_be_bytes());
    v.extend_from_slice(&[0; 16]);
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    v.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    v.extend_from_slice(&[0; 4]);
    v.extend_from_slice(&1u16.to_be_bytes());
    let mut name = [0u8; 32];
    name[0] = 4;
    name[1..5].copy_from_slice(b"test");
    v.extend_from_slice(&name);
    v.extend_from_slice(&0x18u16.to_be_bytes());
    v.extend_from_slice(&(-1i16).to_be_bytes());
    v
}
