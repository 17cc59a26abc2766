use crate::codec::{decode_header, encode_header};
use crate::error::{Error, Result};
use crate::har::{HarContent, HarEntry, HarNameValue, HarRequest, HarResponse, HarTimings};
use crate::http_message::{RawRequest, RawResponse};
use crate::multimap::MultiMap;
use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::hash::Hash;
use url::Url;

const BURP_TIME_FORMATS: &[&str] = &["%a %b %d %H:%M:%S %Z %Y", "%a %b %d %H:%M:%S %Y"];
const QUERY_BASE_URL: &str = "http://localhost/";

/// Raw message as stored in the log, either base64-encoded or as plain text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
	Base64(String),
	Plain(String),
}

impl Payload {
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		match self {
			Self::Base64(s) => {
				let s: String = s.split_ascii_whitespace().collect();
				Ok(general_purpose::STANDARD.decode(s)?)
			}
			Self::Plain(s) => Ok(encode_header(s).unwrap_or_else(|| s.as_bytes().to_vec())),
		}
	}
}

/// One captured request/response exchange.
#[derive(Clone, Debug)]
pub struct LogItem {
	pub time: String,
	pub url: String,
	pub comment: Option<String>,
	pub request: Payload,
	pub response: Payload,
}

pub fn make_har_entry(item: &LogItem) -> anyhow::Result<HarEntry> {
	let request_bytes = item
		.request
		.to_bytes()
		.context("unable to decode the request")?;
	let response_bytes = item
		.response
		.to_bytes()
		.context("unable to decode the response")?;
	let request = RawRequest::from_bytes(&request_bytes).context("unable to parse the request")?;
	let response =
		RawResponse::from_bytes(&response_bytes).context("unable to parse the response")?;
	let started_date_time = parse_timestamp(&item.time)?;

	let mime_type = response.header("content-type").unwrap_or_default();
	let redirect_url = response.header("location").unwrap_or_default();

	Ok(HarEntry {
		started_date_time,
		request: HarRequest {
			method: decode_header(request.start_line.method),
			url: item.url.clone(),
			http_version: decode_header(request.start_line.version),
			cookies: name_values(&request.cookies),
			headers: name_values(&request.headers),
			query_string: query_string(&item.url, request.start_line.target),
			headers_size: request.headers_size(),
			body_size: request.body_size(),
		},
		response: HarResponse {
			status: response.start_line.status,
			status_text: decode_header(response.start_line.reason),
			http_version: decode_header(response.start_line.version),
			cookies: name_values(&response.cookies),
			headers: name_values(&response.headers),
			content: HarContent::from_body(&response.body, decode_header(mime_type)),
			redirect_url: decode_header(redirect_url),
			headers_size: response.headers_size(),
			body_size: response.body_size(),
		},
		timings: HarTimings::uniform(crate::PLACEHOLDER_TIMING),
		comment: item.comment.clone(),
	})
}

fn name_values<K, V>(map: &MultiMap<K, V>) -> Vec<HarNameValue>
where
	K: AsRef<[u8]> + Hash + Eq,
	V: AsRef<[u8]>,
{
	map.pairs()
		.map(|(k, v)| HarNameValue::new(decode_header(k.as_ref()), decode_header(v.as_ref())))
		.collect()
}

/// Query parameters of the logged URL, grouped by name. Falls back on the
/// request target when the URL cannot be parsed.
fn query_string(url: &str, target: &[u8]) -> Vec<HarNameValue> {
	let parsed = Url::parse(url)
		.or_else(|_| Url::parse(QUERY_BASE_URL).and_then(|base| base.join(&decode_header(target))));
	match parsed {
		Ok(url) => url
			.query_pairs()
			.map(|(k, v)| (k.into_owned(), v.into_owned()))
			.collect::<MultiMap<String, String>>()
			.pairs()
			.map(|(k, v)| HarNameValue::new(k.as_str(), v.as_str()))
			.collect(),
		Err(_) => Vec::new(),
	}
}

fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>> {
	let s = s.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Ok(dt);
	}
	if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
		return Ok(dt);
	}
	BURP_TIME_FORMATS
		.iter()
		.find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
		.map(|dt| dt.and_utc().fixed_offset())
		.ok_or_else(|| Error::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	const REQ_B64: &str = "R0VUIC9mb28/YT0xJmE9MiBIVFRQLzEuMQ0KSG9zdDogZXhhbXBsZS5jb20NCg0K";
	const RESP_01: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhi";
	const RESP_02: &str = "HTTP/1.1 302 Found\r\nLocation: /login\r\nSet-Cookie: sid=abc; Path=/\r\n\r\n";

	fn item(request: Payload, response: Payload) -> LogItem {
		LogItem {
			time: "Mon Oct 12 10:20:30 CEST 2020".into(),
			url: "http://example.com/foo?a=1&a=2".into(),
			comment: None,
			request,
			response,
		}
	}

	#[test]
	fn base64_request_plain_response() {
		let entry = make_har_entry(&item(
			Payload::Base64(REQ_B64.into()),
			Payload::Plain(RESP_01.into()),
		))
		.unwrap();
		assert_eq!(entry.request.method, "GET");
		assert_eq!(entry.request.url, "http://example.com/foo?a=1&a=2");
		assert_eq!(entry.request.http_version, "HTTP/1.1");
		assert_eq!(
			entry.request.query_string,
			vec![HarNameValue::new("a", "1"), HarNameValue::new("a", "2")]
		);
		assert_eq!(entry.request.headers, vec![HarNameValue::new("host", "example.com")]);
		assert!(entry.request.cookies.is_empty());
		assert_eq!(entry.request.headers_size, 48);
		assert_eq!(entry.request.body_size, 0);

		assert_eq!(entry.response.status, 200);
		assert_eq!(entry.response.status_text, "OK");
		assert_eq!(entry.response.content.mime_type, "text/plain");
		assert_eq!(entry.response.content.text, "aGk=");
		assert_eq!(entry.response.content.size, 2);
		assert_eq!(entry.response.body_size, 2);
		assert_eq!(entry.response.headers_size, 45);
		assert_eq!(entry.response.redirect_url, "");
		assert_eq!(entry.comment, None);
	}

	#[test]
	fn redirect_and_response_cookies() {
		let mut it = item(Payload::Base64(REQ_B64.into()), Payload::Plain(RESP_02.into()));
		it.comment = Some("redirect".into());
		let entry = make_har_entry(&it).unwrap();
		assert_eq!(entry.response.redirect_url, "/login");
		assert_eq!(entry.response.content.mime_type, "");
		assert_eq!(entry.response.content.text, "");
		assert_eq!(entry.response.cookies, vec![HarNameValue::new("sid", "abc")]);
		assert_eq!(entry.comment.as_deref(), Some("redirect"));
	}

	#[test]
	fn request_cookies_and_latin1_values() {
		let req = "GET / HTTP/1.1\r\nCookie: a=1; b=caf\u{e9}\r\nX-Bin: \u{ff}\u{0}\r\n\r\n";
		let entry = make_har_entry(&item(Payload::Plain(req.into()), Payload::Plain(RESP_01.into()))).unwrap();
		assert_eq!(
			entry.request.cookies,
			vec![HarNameValue::new("a", "1"), HarNameValue::new("b", "caf\u{e9}")]
		);
		assert_eq!(entry.request.headers[1], HarNameValue::new("x-bin", "\u{ff}\u{0}"));
	}

	#[test]
	fn query_string_falls_back_on_target() {
		let mut it = item(
			Payload::Plain("GET /search?q=a+b&q=%C3%A9&x= HTTP/1.1\r\n\r\n".into()),
			Payload::Plain(RESP_01.into()),
		);
		it.url = "not a url".into();
		let entry = make_har_entry(&it).unwrap();
		assert_eq!(
			entry.request.query_string,
			vec![
				HarNameValue::new("q", "a b"),
				HarNameValue::new("q", "\u{e9}"),
				HarNameValue::new("x", ""),
			]
		);
	}

	#[test]
	fn query_string_is_grouped() {
		let q = query_string("http://example.com/?a=1&b=2&a=3", b"/");
		assert_eq!(
			q,
			vec![
				HarNameValue::new("a", "1"),
				HarNameValue::new("a", "3"),
				HarNameValue::new("b", "2"),
			]
		);
	}

	#[test]
	fn invalid_base64() {
		let err = make_har_entry(&item(Payload::Base64("@@@".into()), Payload::Plain(RESP_01.into())))
			.unwrap_err();
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Decode(_))));
		assert_eq!(err.to_string(), "unable to decode the request");
	}

	#[test]
	fn malformed_response() {
		let err = make_har_entry(&item(
			Payload::Base64(REQ_B64.into()),
			Payload::Plain("HTTP/1.1 200 OK\r\nbroken\r\n\r\n".into()),
		))
		.unwrap_err();
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MalformedHeader(_))));
		assert_eq!(err.to_string(), "unable to parse the response");
	}

	#[test]
	fn timestamps() {
		let burp = parse_timestamp("Mon Oct 12 10:20:30 CEST 2020").unwrap();
		assert_eq!(burp.to_rfc3339(), "2020-10-12T10:20:30+00:00");
		let rfc3339 = parse_timestamp("2020-10-12T10:20:30.250+02:00").unwrap();
		assert_eq!(rfc3339.to_rfc3339(), "2020-10-12T10:20:30.250+02:00");
		let rfc2822 = parse_timestamp("Mon, 12 Oct 2020 10:20:30 +0200").unwrap();
		assert_eq!(rfc2822, rfc3339 - chrono::Duration::milliseconds(250));
		assert!(matches!(
			parse_timestamp("yesterday"),
			Err(Error::InvalidTimestamp(_))
		));
	}

	#[test]
	fn invalid_timestamp_aborts_entry() {
		let mut it = item(Payload::Base64(REQ_B64.into()), Payload::Plain(RESP_01.into()));
		it.time = "garbage".into();
		let err = make_har_entry(&it).unwrap_err();
		assert_eq!(err.to_string(), "garbage: invalid timestamp");
	}
}
