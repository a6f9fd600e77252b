//! Errors raised while constructing values

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid regular expression `{pattern}`: {message}")]
	InvalidRegex { pattern: String, message: String },
	#[error("invalid regular expression flag `{flag}` in `{flags}`")]
	InvalidRegexFlags { flags: String, flag: char },
}

pub type CoreResult<T> = Result<T, CoreError>;
