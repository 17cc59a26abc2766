use crate::display_bytes;
use crate::error::{Error, Result};
use crate::multimap::MultiMap;
use nom::bytes::complete::{tag, take_till, take_till1, take_while, take_while1};
use nom::combinator::rest;
use nom::IResult;

pub type Headers<'a> = MultiMap<Vec<u8>, &'a [u8]>;
pub type Cookies<'a> = MultiMap<&'a [u8], &'a [u8]>;

/// How cookies are carried by a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieSyntax {
	/// `Cookie: a=1; b=2`, every pair is a cookie.
	Request,
	/// `Set-Cookie: a=1; Path=/; HttpOnly`, only the leading pair is a cookie.
	Response,
}

impl CookieSyntax {
	fn header_name(&self) -> &'static [u8] {
		match self {
			Self::Request => b"cookie",
			Self::Response => b"set-cookie",
		}
	}
}

pub trait StartLine<'a>: Sized {
	const COOKIE_SYNTAX: CookieSyntax;

	fn from_bytes(line: &'a [u8]) -> Result<Self>;
}

#[derive(Debug)]
pub struct RequestLine<'a> {
	pub method: &'a [u8],
	pub target: &'a [u8],
	pub version: &'a [u8],
}

impl<'a> StartLine<'a> for RequestLine<'a> {
	const COOKIE_SYNTAX: CookieSyntax = CookieSyntax::Request;

	fn from_bytes(line: &'a [u8]) -> Result<Self> {
		let (_, (method, target, version)) = parse_start_line(line)
			.ok()
			.filter(|(_, (_, _, version))| !version.is_empty())
			.ok_or_else(|| Error::MalformedStartLine(display_bytes!(line)))?;
		Ok(Self {
			method,
			target,
			version,
		})
	}
}

#[derive(Debug)]
pub struct StatusLine<'a> {
	pub version: &'a [u8],
	pub status: i64,
	pub reason: &'a [u8],
}

impl<'a> StartLine<'a> for StatusLine<'a> {
	const COOKIE_SYNTAX: CookieSyntax = CookieSyntax::Response;

	fn from_bytes(line: &'a [u8]) -> Result<Self> {
		let malformed = || Error::MalformedStartLine(display_bytes!(line));
		let (_, (version, status, reason)) = parse_start_line(line).map_err(|_| malformed())?;
		let status = std::str::from_utf8(status)
			.ok()
			.and_then(|s| s.parse().ok())
			.ok_or_else(malformed)?;
		Ok(Self {
			version,
			status,
			reason,
		})
	}
}

/// One HTTP/1.x message split into its parts.
///
/// Header names are lower-cased, every other field borrows from the
/// original bytes except for the body, which is rebuilt from the lines
/// following the empty line.
#[derive(Debug)]
pub struct RawMessage<'a, L> {
	pub start_line: L,
	pub headers: Headers<'a>,
	pub cookies: Cookies<'a>,
	pub body: Vec<u8>,
	len: usize,
}

pub type RawRequest<'a> = RawMessage<'a, RequestLine<'a>>;
pub type RawResponse<'a> = RawMessage<'a, StatusLine<'a>>;

impl<'a, L: StartLine<'a>> RawMessage<'a, L> {
	pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
		let mut lines = split_crlf(data);
		let start_line = L::from_bytes(lines.next().unwrap_or_default())?;
		let mut headers = Headers::new();
		for line in lines.by_ref() {
			if line.is_empty() {
				break;
			}
			let (name, value) = parse_header_line(line)?;
			headers.append(name.to_ascii_lowercase(), value);
		}
		let cookies = parse_cookies(&headers, L::COOKIE_SYNTAX)?;
		let body = lines.collect::<Vec<_>>().concat();
		Ok(Self {
			start_line,
			headers,
			cookies,
			body,
			len: data.len(),
		})
	}
}

impl<'a, L> RawMessage<'a, L> {
	/// First value of a header, `name` being lower-case.
	pub fn header(&self, name: &str) -> Option<&'a [u8]> {
		self.headers.first(name.as_bytes()).copied()
	}

	pub fn headers_size(&self) -> usize {
		self.len - self.body.len()
	}

	pub fn body_size(&self) -> usize {
		self.body.len()
	}
}

fn split_crlf(mut data: &[u8]) -> impl Iterator<Item = &[u8]> {
	let mut done = false;
	std::iter::from_fn(move || {
		if done {
			return None;
		}
		match data.windows(2).position(|w| w == b"\r\n") {
			Some(pos) => {
				let line = &data[..pos];
				data = &data[pos + 2..];
				Some(line)
			}
			None => {
				done = true;
				Some(data)
			}
		}
	})
}

fn is_wsp(c: u8) -> bool {
	c.is_ascii_whitespace() || c == 0x0b
}

fn trim_wsp(data: &[u8]) -> &[u8] {
	let start = data.iter().position(|&c| !is_wsp(c)).unwrap_or(data.len());
	let end = data.iter().rposition(|&c| !is_wsp(c)).map_or(start, |p| p + 1);
	&data[start..end]
}

fn trim_wsp_end(data: &[u8]) -> &[u8] {
	let end = data.iter().rposition(|&c| !is_wsp(c)).map_or(0, |p| p + 1);
	&data[..end]
}

fn parse_token(input: &[u8]) -> IResult<&[u8], &[u8]> {
	take_till1(is_wsp)(input)
}

fn parse_separator(input: &[u8]) -> IResult<&[u8], &[u8]> {
	take_while1(is_wsp)(input)
}

/// Splits a start line in at most three fields, the last one being the
/// remainder of the line. It may be empty, a status line having an empty
/// reason phrase.
fn parse_start_line(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8], &[u8])> {
	let (input, first) = parse_token(input)?;
	let (input, _) = parse_separator(input)?;
	let (input, second) = parse_token(input)?;
	let (input, _) = parse_separator(input)?;
	let (input, third) = rest(input)?;
	Ok((input, (first, second, third)))
}

fn parse_header(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
	let (input, name) = take_till(|c| c == b':')(input)?;
	let (input, _) = tag(":")(input)?;
	let (input, _) = take_while(is_wsp)(input)?;
	let (input, value) = rest(input)?;
	Ok((input, (trim_wsp_end(name), value)))
}

fn parse_header_line(line: &[u8]) -> Result<(&[u8], &[u8])> {
	let (_, header) = parse_header(line).map_err(|_| Error::MalformedHeader(display_bytes!(line)))?;
	Ok(header)
}

fn parse_cookie_pair(pair: &[u8]) -> Result<(&[u8], &[u8])> {
	let eq_pos = pair
		.iter()
		.position(|&c| c == b'=')
		.ok_or_else(|| Error::MalformedCookie(display_bytes!(pair)))?;
	Ok((trim_wsp(&pair[..eq_pos]), trim_wsp(&pair[eq_pos + 1..])))
}

fn parse_cookies<'a>(headers: &Headers<'a>, syntax: CookieSyntax) -> Result<Cookies<'a>> {
	let mut cookies = Cookies::new();
	for &value in headers.get(syntax.header_name()).unwrap_or_default() {
		let mut pairs = value.split(|&c| c == b';').map(trim_wsp);
		// A Set-Cookie without a name=value leading pair is ignored.
		let pairs: Vec<&[u8]> = match syntax {
			CookieSyntax::Request => pairs.filter(|p| !p.is_empty()).collect(),
			CookieSyntax::Response => pairs.next().filter(|p| p.contains(&b'=')).into_iter().collect(),
		};
		for pair in pairs {
			let (name, value) = parse_cookie_pair(pair)?;
			cookies.append(name, value);
		}
	}
	Ok(cookies)
}
