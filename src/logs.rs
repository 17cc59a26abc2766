use crate::config::Config;
use env_logger::{Builder, Env, Target};

pub fn init_log_system(cnf: &Config) {
	let env = Env::new().write_style_or(crate::LOG_STYLE_ENV_VAR, "never");
	let mut builder = Builder::from_env(env);
	builder.filter_level(cnf.log_level());
	builder.target(Target::Stderr);
	builder.init();
}
