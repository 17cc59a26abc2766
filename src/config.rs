use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
	Critical,
	Error,
	Warning,
	Info,
	Debug,
}

impl LogLevel {
	pub fn level_filter(&self) -> LevelFilter {
		match self {
			Self::Critical | Self::Error => LevelFilter::Error,
			Self::Warning => LevelFilter::Warn,
			Self::Info => LevelFilter::Info,
			Self::Debug => LevelFilter::Debug,
		}
	}
}

fn default_jobs() -> NonZeroUsize {
	std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	#[arg(long, value_enum, ignore_case = true, global = true, default_value_t = LogLevel::Info)]
	loglevel: LogLevel,
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Convert a Burp Suite XML log into a HAR file
	Convert(ConvertArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
	/// Number of entries processed in parallel [default: number of CPUs]
	#[arg(short, long, value_name = "N")]
	jobs: Option<NonZeroUsize>,
	/// Skip the items that cannot be parsed instead of aborting
	#[arg(long)]
	skip_invalid: bool,
	#[arg(value_name = "BURPLOG")]
	burp_log: PathBuf,
	#[arg(value_name = "HARFILE")]
	har_file: PathBuf,
}

impl Config {
	pub fn init() -> Result<Self, String> {
		Self::parse().check()
	}

	fn check(self) -> Result<Self, String> {
		let args = self.convert_args();
		if args.burp_log == args.har_file {
			return Err(format!(
				"{}: input and output must be different files",
				args.har_file.display()
			));
		}
		Ok(self)
	}

	fn convert_args(&self) -> &ConvertArgs {
		let Command::Convert(args) = &self.command;
		args
	}

	pub fn log_level(&self) -> LevelFilter {
		self.loglevel.level_filter()
	}

	pub fn jobs(&self) -> NonZeroUsize {
		self.convert_args().jobs.unwrap_or_else(default_jobs)
	}

	pub fn skip_invalid(&self) -> bool {
		self.convert_args().skip_invalid
	}

	pub fn burp_log(&self) -> &Path {
		&self.convert_args().burp_log
	}

	pub fn har_file(&self) -> &Path {
		&self.convert_args().har_file
	}

	#[cfg(test)]
	pub fn from_args<I, T>(args: I) -> Result<Self, String>
	where
		I: IntoIterator<Item = T>,
		T: Into<std::ffi::OsString> + Clone,
	{
		Self::try_parse_from(args).map_err(|e| e.to_string())?.check()
	}
}
