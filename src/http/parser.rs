use std::borrow::Cow;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::Limits;
use crate::http::header::{self, HeaderMap};
use crate::http::request::Version;
use crate::http::Error;

/// Outcome of reading one delimited segment from a buffered stream.
#[derive(Debug, PartialEq, Eq)]
pub enum Segment {
    /// Bytes before the delimiter. The delimiter is consumed but not returned.
    Complete(Vec<u8>),
    /// End of stream before any byte was read.
    Eof,
    /// End of stream in the middle of a segment.
    Truncated,
    /// More than the allowed number of bytes precede the delimiter.
    TooLong,
}

/// Reads up to and including `delim`, never buffering more than `max`
/// bytes of segment content.
pub async fn read_segment<R>(reader: &mut R, delim: u8, max: usize) -> std::io::Result<Segment>
where
    R: AsyncBufRead + Unpin,
{
    let mut out = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(if out.is_empty() {
                Segment::Eof
            } else {
                Segment::Truncated
            });
        }

        match available.iter().position(|&b| b == delim) {
            Some(i) => {
                if out.len() + i > max {
                    return Ok(Segment::TooLong);
                }
                out.extend_from_slice(&available[..i]);
                reader.consume(i + 1);
                return Ok(Segment::Complete(out));
            }
            None => {
                let n = available.len();
                if out.len() + n > max {
                    return Ok(Segment::TooLong);
                }
                out.extend_from_slice(available);
                reader.consume(n);
            }
        }
    }
}

/// Method, target and version from `METHOD SP TARGET SP HTTP/MAJOR.MINOR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: Version,
}

fn trim_left(p: &[u8]) -> &[u8] {
    let i = p.iter().position(|&b| !header::is_space_byte(b)).unwrap_or(p.len());
    &p[i..]
}

fn trim_right(p: &[u8]) -> &[u8] {
    let i = p.iter().rposition(|&b| !header::is_space_byte(b)).map_or(0, |i| i + 1);
    &p[..i]
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

fn parse_decimal(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Parses a request line with its terminator already removed.
pub fn parse_request_line(line: &[u8]) -> Result<RequestLine, Error> {
    let end = line
        .iter()
        .rposition(|&b| !matches!(b, b'\r' | b'\n' | b' '))
        .map_or(0, |i| i + 1);
    let line = &line[..end];

    let method_len = line.iter().take_while(|&&b| header::is_token_byte(b)).count();
    if method_len == 0 || line.get(method_len) != Some(&b' ') {
        return Err(Error::BadRequestLine);
    }
    let method = &line[..method_len];
    let rest = &line[method_len + 1..];

    let target_len = rest.iter().position(|&b| b == b' ').ok_or(Error::BadRequestLine)?;
    if target_len == 0 {
        return Err(Error::BadRequestLine);
    }
    let target = std::str::from_utf8(&rest[..target_len]).map_err(|_| Error::BadRequestLine)?;

    let version = rest[target_len + 1..]
        .strip_prefix(b"HTTP/")
        .ok_or(Error::BadRequestLine)?;
    let dot = version.iter().position(|&b| b == b'.').ok_or(Error::BadRequestLine)?;
    let major = parse_decimal(&version[..dot]).ok_or(Error::BadRequestLine)?;
    let minor = parse_decimal(&version[dot + 1..]).ok_or(Error::BadRequestLine)?;

    Ok(RequestLine {
        method: String::from_utf8_lossy(method).into_owned(),
        target: target.to_string(),
        version: Version::new(major, minor),
    })
}

/// Reads the request line.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly before
/// sending anything, which ends a keep-alive session without error.
pub async fn read_request_line<R>(reader: &mut R, limits: &Limits) -> Result<Option<RequestLine>, Error>
where
    R: AsyncBufRead + Unpin,
{
    // +1 leaves room for the CR of a CRLF terminator.
    match read_segment(reader, b'\n', limits.max_line_len + 1).await? {
        Segment::Eof => Ok(None),
        Segment::Truncated => Err(Error::UnexpectedEof),
        Segment::TooLong => Err(Error::LineTooLong),
        Segment::Complete(line) => {
            let line = strip_cr(line);
            if line.len() > limits.max_line_len {
                return Err(Error::LineTooLong);
            }
            parse_request_line(&line).map(Some)
        }
    }
}

/// Reads header lines up to and including the blank line ending the head.
pub async fn read_header<R>(reader: &mut R, limits: &Limits) -> Result<HeaderMap, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HeaderMap::new();
    let mut last_key: Option<String> = None;
    let mut count = 0;

    loop {
        let line = match read_segment(reader, b'\n', limits.max_line_len + 1).await? {
            Segment::Complete(line) => strip_cr(line),
            Segment::Eof | Segment::Truncated => return Err(Error::UnexpectedEof),
            Segment::TooLong => return Err(Error::LineTooLong),
        };

        if line.is_empty() {
            return Ok(headers);
        }
        if line.len() > limits.max_line_len {
            return Err(Error::LineTooLong);
        }

        if header::is_space_byte(line[0]) {
            let key = last_key.as_deref().ok_or(Error::BadHeaderLine)?;
            let more = trim_left(trim_right(&line));
            if more.is_empty() {
                continue;
            }
            let value = headers.last_value_mut(key).ok_or(Error::BadHeaderLine)?;
            let more = String::from_utf8_lossy(more);
            let folded = if value.is_empty() {
                more.into_owned()
            } else {
                format!("{} {}", value, more)
            };
            if folded.len() > limits.max_value_len {
                return Err(Error::HeaderTooLong);
            }
            *value = folded;
            continue;
        }

        count += 1;
        if count > limits.max_headers {
            return Err(Error::TooManyHeaders);
        }

        let key_len = line.iter().take_while(|&&b| header::is_token_byte(b)).count();
        if key_len == 0 {
            return Err(Error::BadHeaderLine);
        }
        // Token bytes are ASCII.
        let key = header::canonical_name(&String::from_utf8_lossy(&line[..key_len]));

        let rest = trim_left(&line[key_len..]);
        let value = match rest.split_first() {
            Some((b':', value)) => trim_left(trim_right(value)),
            _ => return Err(Error::BadHeaderLine),
        };
        if value.len() > limits.max_value_len {
            return Err(Error::HeaderTooLong);
        }

        let value: Cow<'_, str> = String::from_utf8_lossy(value);
        headers.append(&key, value.into_owned());
        last_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_segment_stops_at_limit() {
        let mut input: &[u8] = b"abcdef\n";
        let seg = read_segment(&mut input, b'\n', 3).await.unwrap();
        assert_eq!(seg, Segment::TooLong);
    }

    #[tokio::test]
    async fn read_segment_reports_truncation() {
        let mut input: &[u8] = b"GET / HT";
        let seg = read_segment(&mut input, b'\n', 64).await.unwrap();
        assert_eq!(seg, Segment::Truncated);

        let seg = read_segment(&mut input, b'\n', 64).await.unwrap();
        assert_eq!(seg, Segment::Eof);
    }

    #[test]
    fn parse_simple_get() {
        let line = parse_request_line(b"GET / HTTP/1.1").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.target, "/");
        assert_eq!(line.version, Version::HTTP_11);
    }
}
