use crate::entry::{LogItem, Payload};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const ITEM_TAG: &[u8] = b"item";

#[derive(Clone, Copy, Debug)]
enum Field {
	Time,
	Url,
	Comment,
	Request(bool),
	Response(bool),
	Ignored,
}

impl Field {
	fn from_element(e: &BytesStart<'_>) -> Result<Self> {
		let field = match e.name().as_ref() {
			b"time" => Self::Time,
			b"url" => Self::Url,
			b"comment" => Self::Comment,
			b"request" => Self::Request(is_base64(e)?),
			b"response" => Self::Response(is_base64(e)?),
			_ => Self::Ignored,
		};
		Ok(field)
	}
}

fn is_base64(e: &BytesStart<'_>) -> Result<bool> {
	match e.try_get_attribute("base64")? {
		Some(attr) => Ok(attr.unescape_value()?.trim().eq_ignore_ascii_case("true")),
		None => Ok(false),
	}
}

#[derive(Default)]
struct ItemBuilder {
	time: Option<String>,
	url: Option<String>,
	comment: Option<String>,
	request: Option<Payload>,
	response: Option<Payload>,
}

impl ItemBuilder {
	/// Payloads are kept verbatim, the other fields are trimmed.
	fn set(&mut self, field: Field, text: String) {
		let payload = |base64: bool, text: String| {
			if base64 {
				Payload::Base64(text)
			} else {
				Payload::Plain(text)
			}
		};
		match field {
			Field::Time => self.time = Some(text.trim().to_string()),
			Field::Url => self.url = Some(text.trim().to_string()),
			Field::Comment => self.comment = Some(text.trim().to_string()).filter(|c| !c.is_empty()),
			Field::Request(b64) => self.request = Some(payload(b64, text)),
			Field::Response(b64) => self.response = Some(payload(b64, text)),
			Field::Ignored => {}
		}
	}

	fn build(self, index: usize) -> Result<LogItem> {
		let missing = |name: &str| Error::InvalidLog(format!("item #{index}: missing <{name}> element"));
		Ok(LogItem {
			time: self.time.ok_or_else(|| missing("time"))?,
			url: self.url.ok_or_else(|| missing("url"))?,
			comment: self.comment,
			request: self.request.ok_or_else(|| missing("request"))?,
			response: self.response.ok_or_else(|| missing("response"))?,
		})
	}
}

/// Reads every `<item>` of a Burp Suite "save items" XML export, in document
/// order.
pub fn read_items(xml: &str) -> Result<Vec<LogItem>> {
	let mut reader = Reader::from_str(xml);
	let mut items = Vec::new();
	let mut item: Option<ItemBuilder> = None;
	let mut field: Option<Field> = None;
	let mut text = String::new();
	loop {
		match reader.read_event()? {
			Event::Start(e) if e.name().as_ref() == ITEM_TAG => {
				item = Some(ItemBuilder::default());
			}
			Event::Start(e) if item.is_some() => {
				field = Some(Field::from_element(&e)?);
				text.clear();
			}
			Event::Empty(e) if e.name().as_ref() != ITEM_TAG => {
				if let Some(builder) = item.as_mut() {
					builder.set(Field::from_element(&e)?, String::new());
				}
			}
			Event::Text(e) if field.is_some() => {
				text.push_str(&e.unescape()?);
			}
			Event::CData(e) if field.is_some() => {
				text.push_str(&String::from_utf8_lossy(&e.into_inner()));
			}
			Event::End(e) if e.name().as_ref() == ITEM_TAG => {
				if let Some(builder) = item.take() {
					items.push(builder.build(items.len())?);
				}
			}
			Event::End(_) => {
				if let (Some(f), Some(builder)) = (field.take(), item.as_mut()) {
					builder.set(f, std::mem::take(&mut text));
				}
			}
			Event::Eof => break,
			_ => {}
		}
	}
	if item.is_some() {
		return Err(Error::InvalidLog(format!(
			"item #{}: unexpected end of file",
			items.len()
		)));
	}
	Ok(items)
}
