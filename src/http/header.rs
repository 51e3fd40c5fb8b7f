//! Multi-valued header mapping with canonical header names.

pub const CONNECTION: &str = "Connection";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const EXPECT: &str = "Expect";
pub const HOST: &str = "Host";
pub const ORIGIN: &str = "Origin";
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const UPGRADE: &str = "Upgrade";
pub const SEC_WEBSOCKET_KEY1: &str = "Sec-Websocket-Key1";
pub const SEC_WEBSOCKET_KEY2: &str = "Sec-Websocket-Key2";
pub const SEC_WEBSOCKET_PROTOCOL: &str = "Sec-Websocket-Protocol";

/// Returns true for bytes allowed in an HTTP token (RFC 7230 `tchar`).
pub fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}

pub fn is_space_byte(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Canonical form of a header name: the first letter and every letter
/// following a `-` upper case, everything else lower case.
///
/// ```
/// # use tether::http::header::canonical_name;
/// assert_eq!(canonical_name("content-LENGTH"), "Content-Length");
/// assert_eq!(canonical_name("x-forwarded-for"), "X-Forwarded-For");
/// ```
pub fn canonical_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Header names mapped to their values in arrival order.
///
/// Keys are canonicalized on insert and on lookup, so lookups are
/// case-insensitive. Entries keep first-insertion order, which makes
/// rendered responses deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from name/value pairs, appending repeated names.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.append(name, value);
        }
        map
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = canonical_name(name);
        self.entries.iter().position(|(k, _)| *k == key)
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self
                .entries
                .push((canonical_name(name), vec![value.into()])),
        }
    }

    /// Replaces every value stored under `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self
                .entries
                .push((canonical_name(name), vec![value.into()])),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let i = self.position(name)?;
        Some(self.entries.remove(i).1)
    }

    /// Mutable access to the last value under `name`, used to fold
    /// continuation lines.
    pub(crate) fn last_value_mut(&mut self, name: &str) -> Option<&mut String> {
        let i = self.position(name)?;
        self.entries[i].1.last_mut()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs, one per stored value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }
}
