mod burp_log;
mod codec;
mod config;
mod entry;
mod error;
mod har;
mod http_message;
mod logs;
mod multimap;

use anyhow::Context;
use config::Config;
use entry::{make_har_entry, LogItem};
use error::Error;
use futures::stream::{self, StreamExt};
use har::{Har, HarCreator, HarEntry};
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const CREATOR_COMMENT: &str = "logpirate";
const CREATOR_NAME: &str = env!("CARGO_PKG_NAME");
const CREATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_STYLE_ENV_VAR: &str = "LOGPIRATE_LOG_STYLE";
const PLACEHOLDER_TIMING: Duration = Duration::from_millis(1);
const TMP_FILE_EXT: &str = "tmp";

#[macro_export]
macro_rules! display_bytes {
	($bytes: expr) => {
		$bytes
			.iter()
			.map(|b| {
				let v: Vec<u8> = std::ascii::escape_default(*b).collect();
				String::from_utf8_lossy(&v).to_string()
			})
			.collect::<String>()
	};
}

#[tokio::main]
async fn main() {
	match Config::init() {
		Ok(cnf) => {
			logs::init_log_system(&cnf);
			log::debug!("{cnf:?}");
			if let Err(e) = convert(&cnf).await {
				log::error!("{e:#}");
				std::process::exit(1);
			}
		}
		Err(e) => {
			eprintln!("{e}");
			std::process::exit(1);
		}
	}
}

async fn convert(cnf: &Config) -> anyhow::Result<()> {
	let input = cnf.burp_log();
	let xml = tokio::fs::read_to_string(input)
		.await
		.map_err(|source| Error::InputRead {
			path: input.to_path_buf(),
			source,
		})?;
	let items = burp_log::read_items(&xml).with_context(|| input.display().to_string())?;
	log::debug!("{}: {} items found", input.display(), items.len());
	let entries = build_entries(items, cnf.jobs(), cnf.skip_invalid()).await?;
	let har = Har::new(creator(), entries);
	let data = har.to_json()?;
	write_har(cnf.har_file(), &data).await?;
	log::info!("Saved {} request/response pairs", har.entries.len());
	log::info!("{} bytes written", data.len());
	Ok(())
}

fn creator() -> HarCreator {
	HarCreator {
		name: CREATOR_NAME.to_string(),
		version: CREATOR_VERSION.to_string(),
		comment: CREATOR_COMMENT.to_string(),
	}
}

/// Assembles the entries on the blocking pool, at most `jobs` at a time, and
/// returns them in log order.
async fn build_entries(
	items: Vec<LogItem>,
	jobs: NonZeroUsize,
	skip_invalid: bool,
) -> anyhow::Result<Vec<HarEntry>> {
	let mut results = stream::iter(items.into_iter().enumerate())
		.map(|(index, item)| async move {
			let res = tokio::task::spawn_blocking(move || make_har_entry(&item)).await;
			(index, res)
		})
		.buffered(jobs.get());
	let mut entries = Vec::new();
	while let Some((index, res)) = results.next().await {
		match res?.with_context(|| format!("entry #{index}")) {
			Ok(entry) => {
				log::debug!(
					"entry #{index}: {} {} -> {}",
					entry.request.method,
					entry.request.url,
					entry.response.status
				);
				entries.push(entry);
			}
			Err(e) if skip_invalid => log::warn!("skipping {e:#}"),
			Err(e) => return Err(e),
		}
	}
	Ok(entries)
}

fn tmp_path(path: &Path) -> PathBuf {
	let mut name = OsString::from(".");
	name.push(path.file_name().unwrap_or_default());
	name.push(format!(".{}.{TMP_FILE_EXT}", Uuid::new_v4().simple()));
	path.with_file_name(name)
}

/// Writes the whole document next to `path` and renames it into place, so
/// `path` never holds a partial file.
async fn write_har(path: &Path, data: &[u8]) -> Result<(), Error> {
	let tmp = tmp_path(path);
	log::trace!("writing to {}", tmp.display());
	let res = match tokio::fs::write(&tmp, data).await {
		Ok(()) => tokio::fs::rename(&tmp, path).await,
		Err(e) => Err(e),
	};
	if let Err(source) = res {
		let _ = tokio::fs::remove_file(&tmp).await;
		return Err(Error::OutputWrite {
			path: path.to_path_buf(),
			source,
		});
	}
	Ok(())
}
