/// A header-like value captured by the proxy, either still raw or already
/// turned into text.
#[derive(Clone, Copy, Debug)]
pub enum HeaderValue<'a> {
	Bytes(&'a [u8]),
	Text(&'a str),
}

impl<'a> From<&'a [u8]> for HeaderValue<'a> {
	fn from(b: &'a [u8]) -> Self {
		Self::Bytes(b)
	}
}

impl<'a> From<&'a str> for HeaderValue<'a> {
	fn from(s: &'a str) -> Self {
		Self::Text(s)
	}
}

/// Decodes header bytes using ISO-8859-1, so every octet maps to exactly one
/// code point and decoding never fails.
pub fn decode_header<'a, V: Into<HeaderValue<'a>>>(value: V) -> String {
	match value.into() {
		HeaderValue::Bytes(b) => b.iter().map(|&c| c as char).collect(),
		HeaderValue::Text(s) => s.to_string(),
	}
}

/// Inverse of [`decode_header`]. Returns `None` if `text` holds a character
/// outside of the single-byte range.
pub fn encode_header(text: &str) -> Option<Vec<u8>> {
	text.chars().map(|c| u8::try_from(c).ok()).collect()
}
