/// Classic 16-bytes-per-line dump: address, hex bytes, ASCII column.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_sixteen_bytes() {
        let bytes: Vec<u8> = (0x40..0x40 + 20).collect();
        let dump = hex_dump(&bytes, 0x100);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000100  40 41 42"));
        assert!(lines[0].ends_with("|@ABCDEFGHIJKLMNO|"));
        assert!(lines[1].starts_with("00000110  50 51 52 53"));
        assert!(lines[1].ends_with("|PQRS|"));
    }
}
