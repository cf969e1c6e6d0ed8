//! Line source: turns a byte stream into trimmed, non-empty lines.

use std::io::{BufRead, Read};

use crate::parser::traits::ParseError;

/// Read every line from `reader`.
///
/// Lines end at `\n` (a preceding `\r` is dropped too), are decoded lossily
/// as UTF-8, trimmed, and skipped when empty. A line longer than
/// `max_line_size` bytes, terminator excluded, fails the whole read with
/// [`ParseError::LineTooLarge`]. Memory per line stays bounded by the limit.
pub fn read_lines<R: BufRead>(mut reader: R, max_line_size: usize) -> Result<Vec<String>, ParseError> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    // Room for the limit plus a `\r\n` terminator
    let read_limit = (max_line_size as u64).saturating_add(2);
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = (&mut reader).take(read_limit).read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let mut content: &[u8] = &buf;
        if let Some(rest) = content.strip_suffix(b"\n") {
            content = rest;
        }
        if let Some(rest) = content.strip_suffix(b"\r") {
            content = rest;
        }

        if content.len() > max_line_size {
            tracing::warn!(line = line_no, max = max_line_size, "line exceeds maximum size");
            return Err(ParseError::LineTooLarge(content.len(), max_line_size));
        }

        let line = String::from_utf8_lossy(content);
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(input: &[u8], max: usize) -> Result<Vec<String>, ParseError> {
        read_lines(Cursor::new(input.to_vec()), max)
    }

    #[test]
    fn test_splits_and_trims() {
        let lines = read(b"  first  \nsecond\r\n\n   \n\tthird", 64).unwrap();
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(read(b"", 64).unwrap().is_empty());
        assert!(read(b"\n\n  \n", 64).unwrap().is_empty());
    }

    #[test]
    fn test_line_at_limit_is_accepted() {
        let mut input = vec![b'x'; 16];
        input.extend_from_slice(b"\r\nnext\n");

        let lines = read(&input, 16).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 16);
    }

    #[test]
    fn test_line_over_limit_fails() {
        let mut input = b"ok\n".to_vec();
        input.extend(vec![b'x'; 17]);
        input.push(b'\n');

        let err = read(&input, 16).unwrap_err();
        assert!(matches!(err, ParseError::LineTooLarge(_, 16)));
    }

    #[test]
    fn test_unterminated_oversized_line_fails() {
        let input = vec![b'y'; 1000];
        assert!(matches!(read(&input, 100), Err(ParseError::LineTooLarge(_, 100))));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = read(b"ok \xFF\xFE here\n", 64).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ok "));
        assert!(lines[0].contains('\u{FFFD}'));
    }
}
