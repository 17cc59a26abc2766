use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::time::Duration;

pub const HAR_VERSION: &str = "1.2";
pub const CONTENT_ENCODING: &str = "base64";

#[derive(Clone, Debug, Serialize)]
pub struct HarCreator {
	pub name: String,
	pub version: String,
	pub comment: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HarNameValue {
	pub name: String,
	pub value: String,
}

impl HarNameValue {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
	pub method: String,
	pub url: String,
	pub http_version: String,
	pub cookies: Vec<HarNameValue>,
	pub headers: Vec<HarNameValue>,
	pub query_string: Vec<HarNameValue>,
	pub headers_size: usize,
	pub body_size: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
	pub size: usize,
	pub mime_type: String,
	pub text: String,
	pub encoding: &'static str,
}

impl HarContent {
	pub fn from_body(body: &[u8], mime_type: String) -> Self {
		Self {
			size: body.len(),
			mime_type,
			text: general_purpose::STANDARD.encode(body),
			encoding: CONTENT_ENCODING,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
	pub status: i64,
	pub status_text: String,
	pub http_version: String,
	pub cookies: Vec<HarNameValue>,
	pub headers: Vec<HarNameValue>,
	pub content: HarContent,
	#[serde(rename = "redirectURL")]
	pub redirect_url: String,
	pub headers_size: usize,
	pub body_size: usize,
}

/// Phase durations, written in milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct HarTimings {
	pub send: Duration,
	pub receive: Duration,
	pub wait: Duration,
	pub connect: Duration,
	pub ssl: Duration,
}

impl HarTimings {
	pub fn uniform(d: Duration) -> Self {
		Self {
			send: d,
			receive: d,
			wait: d,
			connect: d,
			ssl: d,
		}
	}

	pub fn total(&self) -> Duration {
		self.send + self.receive + self.wait + self.connect + self.ssl
	}
}

fn millis(d: Duration) -> f64 {
	d.as_nanos() as f64 / 1_000_000.0
}

impl Serialize for HarTimings {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut s = serializer.serialize_struct("HarTimings", 5)?;
		s.serialize_field("send", &millis(self.send))?;
		s.serialize_field("receive", &millis(self.receive))?;
		s.serialize_field("wait", &millis(self.wait))?;
		s.serialize_field("connect", &millis(self.connect))?;
		s.serialize_field("ssl", &millis(self.ssl))?;
		s.end()
	}
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct HarCache {}

#[derive(Clone, Debug)]
pub struct HarEntry {
	pub started_date_time: DateTime<FixedOffset>,
	pub request: HarRequest,
	pub response: HarResponse,
	pub timings: HarTimings,
	pub comment: Option<String>,
}

impl Serialize for HarEntry {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let nb_fields = if self.comment.is_some() { 7 } else { 6 };
		let mut s = serializer.serialize_struct("HarEntry", nb_fields)?;
		s.serialize_field(
			"startedDateTime",
			&self
				.started_date_time
				.to_rfc3339_opts(SecondsFormat::Millis, true),
		)?;
		s.serialize_field("time", &millis(self.timings.total()))?;
		s.serialize_field("request", &self.request)?;
		s.serialize_field("response", &self.response)?;
		s.serialize_field("cache", &HarCache::default())?;
		s.serialize_field("timings", &self.timings)?;
		if let Some(comment) = &self.comment {
			s.serialize_field("comment", comment)?;
		}
		s.end()
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct Har {
	pub version: String,
	pub creator: HarCreator,
	pub entries: Vec<HarEntry>,
}

#[derive(Serialize)]
struct HarDocument<'a> {
	log: &'a Har,
}

impl Har {
	pub fn new(creator: HarCreator, entries: Vec<HarEntry>) -> Self {
		Self {
			version: HAR_VERSION.to_string(),
			creator,
			entries,
		}
	}

	pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
		serde_json::to_vec(&HarDocument { log: self })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{json, Value};

	fn sample_entry(comment: Option<&str>) -> HarEntry {
		HarEntry {
			started_date_time: DateTime::parse_from_rfc3339("2020-10-12T10:20:30+02:00").unwrap(),
			request: HarRequest {
				method: "GET".into(),
				url: "http://example.com/?q=1".into(),
				http_version: "HTTP/1.1".into(),
				cookies: vec![HarNameValue::new("sid", "1"), HarNameValue::new("sid", "2")],
				headers: vec![HarNameValue::new("host", "example.com")],
				query_string: vec![HarNameValue::new("q", "1")],
				headers_size: 40,
				body_size: 0,
			},
			response: HarResponse {
				status: 302,
				status_text: "Found".into(),
				http_version: "HTTP/1.1".into(),
				cookies: Vec::new(),
				headers: vec![HarNameValue::new("location", "/next")],
				content: HarContent::from_body(b"hi", "text/plain".into()),
				redirect_url: "/next".into(),
				headers_size: 50,
				body_size: 2,
			},
			timings: HarTimings::uniform(Duration::from_millis(1)),
			comment: comment.map(String::from),
		}
	}

	fn sample_har(comment: Option<&str>) -> Value {
		let creator = HarCreator {
			name: "logpirate".into(),
			version: "0.1.0".into(),
			comment: "logpirate".into(),
		};
		let har = Har::new(creator, vec![sample_entry(comment)]);
		serde_json::from_slice(&har.to_json().unwrap()).unwrap()
	}

	#[test]
	fn creator_fields_are_not_swapped() {
		let v = sample_har(None);
		assert_eq!(v["log"]["version"], "1.2");
		assert_eq!(
			v["log"]["creator"],
			json!({"name": "logpirate", "version": "0.1.0", "comment": "logpirate"})
		);
	}

	#[test]
	fn entry_layout() {
		let v = sample_har(None);
		let entry = &v["log"]["entries"][0];
		assert_eq!(entry["startedDateTime"], "2020-10-12T10:20:30.000+02:00");
		assert_eq!(entry["time"], 5.0);
		assert_eq!(entry["cache"], json!({}));
		assert_eq!(
			entry["timings"],
			json!({"send": 1.0, "receive": 1.0, "wait": 1.0, "connect": 1.0, "ssl": 1.0})
		);
		assert_eq!(entry["request"]["httpVersion"], "HTTP/1.1");
		assert_eq!(entry["request"]["headersSize"], 40);
		assert_eq!(
			entry["request"]["cookies"],
			json!([{"name": "sid", "value": "1"}, {"name": "sid", "value": "2"}])
		);
		assert_eq!(entry["request"]["queryString"], json!([{"name": "q", "value": "1"}]));
		assert_eq!(entry["response"]["statusText"], "Found");
		assert_eq!(entry["response"]["redirectURL"], "/next");
	}

	#[test]
	fn content_is_base64() {
		let v = sample_har(None);
		let content = &v["log"]["entries"][0]["response"]["content"];
		assert_eq!(
			content,
			&json!({"size": 2, "mimeType": "text/plain", "text": "aGk=", "encoding": "base64"})
		);
	}

	#[test]
	fn comment_only_when_present() {
		let v = sample_har(None);
		assert!(v["log"]["entries"][0].get("comment").is_none());
		let v = sample_har(Some(""));
		assert_eq!(v["log"]["entries"][0]["comment"], "");
		let v = sample_har(Some("interesting"));
		assert_eq!(v["log"]["entries"][0]["comment"], "interesting");
	}

	#[test]
	fn field_order() {
		let entry = serde_json::to_string(&sample_entry(Some("c"))).unwrap();
		let keys = [
			"\"startedDateTime\"",
			"\"time\"",
			"\"request\"",
			"\"response\"",
			"\"cache\"",
			"\"timings\"",
			"\"comment\"",
		];
		let positions: Vec<usize> = keys.iter().map(|k| entry.find(k).unwrap()).collect();
		assert!(positions.windows(2).all(|w| w[0] < w[1]));
	}

	#[test]
	fn timings_total() {
		let t = HarTimings {
			send: Duration::from_millis(1),
			receive: Duration::from_micros(2500),
			..Default::default()
		};
		assert_eq!(t.total(), Duration::from_micros(3500));
		assert_eq!(millis(t.total()), 3.5);
	}
}
