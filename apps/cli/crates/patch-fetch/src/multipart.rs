//! Parsing of `multipart/byteranges` HTTP response bodies (RFC 7233 §4.1).

/// One requested byte range, inclusive on both ends, paired with the
/// block hash it corresponds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RangeRequest {
    pub start: u64,
    pub end: u64,
}

/// A parsed multipart part: the `Content-Range` bounds it declared and
/// its body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangePart {
    pub start: u64,
    pub end: u64,
    pub body: Vec<u8>,
}

/// Extract the boundary token from a `Content-Type: multipart/byteranges;
/// boundary=...` header value.
pub fn extract_boundary(content_type: &str) -> Option<&str> {
    let (_, rest) = content_type.split_once("boundary=")?;
    Some(rest.trim_matches('"'))
}

/// Split a `multipart/byteranges` body into its constituent parts,
/// matching the server's declared boundary. Parts that don't carry a
/// parseable `Content-Range` header are skipped.
pub fn parse_multipart_byteranges(body: &[u8], boundary: &str) -> Vec<RangePart> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let segments = split_on(body, delimiter);
    let mut parts = Vec::new();

    // The first segment precedes the first boundary and the last follows
    // the closing boundary; only interior segments carry part bodies.
    for segment in segments.iter().skip(1).take(segments.len().saturating_sub(2)) {
        if let Some(part) = parse_one_part(segment) {
            parts.push(part);
        }
    }

    parts
}

fn parse_one_part(segment: &[u8]) -> Option<RangePart> {
    let header_end = find_subslice(segment, b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&segment[..header_end]).ok()?;
    let mut body = &segment[header_end + 4..];
    // Each part's body is followed by a trailing CRLF before the next
    // boundary; trim it the way the body was framed.
    while body.ends_with(b"\n") || body.ends_with(b"\r") {
        body = &body[..body.len() - 1];
    }

    let content_range = headers
        .split("\r\n")
        .find(|line| line.to_ascii_lowercase().starts_with("content-range:"))?;

    let (start, end) = parse_content_range(content_range)?;

    Some(RangePart {
        start,
        end,
        body: body.to_vec(),
    })
}

/// Parse a `Content-Range: bytes START-END/TOTAL` header line.
pub fn parse_content_range(header_line: &str) -> Option<(u64, u64)> {
    let (_, rest) = header_line.split_once("bytes ")?;
    let (range, _total) = rest.split_once('/')?;
    let (start, end) = range.trim().split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    Some((start, end))
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let mut rest = haystack;
    while let Some(pos) = find_subslice(rest, needle) {
        out.push(&rest[..pos]);
        rest = &rest[pos + needle.len()..];
    }
    out.push(rest);
    out
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_boundary_handles_quoted_and_unquoted() {
        assert_eq!(
            extract_boundary("multipart/byteranges; boundary=THIS_STRING_SEPARATES"),
            Some("THIS_STRING_SEPARATES")
        );
        assert_eq!(
            extract_boundary("multipart/byteranges; boundary=\"quoted123\""),
            Some("quoted123")
        );
    }

    #[test]
    fn parse_content_range_extracts_bounds() {
        assert_eq!(
            parse_content_range("Content-Range: bytes 0-99/1000"),
            Some((0, 99))
        );
        assert_eq!(
            parse_content_range("Content-Range: bytes 100-299/1000"),
            Some((100, 299))
        );
    }

    #[test]
    fn s5_parses_two_part_multipart_response() {
        // Testable property S5: a mocked 206 multipart body with two
        // Content-Range parts must yield exactly those two ranges.
        let boundary = "BOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Type: application/octet-stream\r\nContent-Range: bytes 0-99/1000\r\n\r\n{part1}\r\n--{b}\r\nContent-Type: application/octet-stream\r\nContent-Range: bytes 100-299/1000\r\n\r\n{part2}\r\n--{b}--\r\n",
            b = boundary,
            part1 = "a".repeat(100),
            part2 = "b".repeat(200),
        );

        let parts = parse_multipart_byteranges(body.as_bytes(), boundary);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].start, 0);
        assert_eq!(parts[0].end, 99);
        assert_eq!(parts[0].body, "a".repeat(100).into_bytes());
        assert_eq!(parts[1].start, 100);
        assert_eq!(parts[1].end, 299);
        assert_eq!(parts[1].body, "b".repeat(200).into_bytes());
    }

    #[test]
    fn skips_parts_without_content_range() {
        let boundary = "B";
        let body = format!("--{b}\r\nContent-Type: text/plain\r\n\r\nno range here\r\n--{b}--\r\n", b = boundary);
        let parts = parse_multipart_byteranges(body.as_bytes(), boundary);
        assert!(parts.is_empty());
    }
}
