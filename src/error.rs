use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid base64 payload: {0}")]
	Decode(#[from] base64::DecodeError),

	#[error("malformed start line: \"{0}\"")]
	MalformedStartLine(String),

	#[error("malformed header line: \"{0}\"")]
	MalformedHeader(String),

	#[error("malformed cookie: \"{0}\"")]
	MalformedCookie(String),

	#[error("{0}: invalid timestamp")]
	InvalidTimestamp(String),

	#[error("invalid log file: {0}")]
	InvalidLog(String),

	#[error("{}: {source}", .path.display())]
	InputRead {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("{}: {source}", .path.display())]
	OutputWrite {
		path: PathBuf,
		source: std::io::Error,
	},
}

impl From<quick_xml::Error> for Error {
	fn from(e: quick_xml::Error) -> Self {
		Self::InvalidLog(e.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
