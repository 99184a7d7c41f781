use thiserror::Error;
use crate::version::Version;

/// The root cause of every error this crate produces.
///
/// Functions return [`anyhow::Result`], use [`anyhow::Error::downcast_ref`] to get at this type:
/// ```
/// # use duke_attributes::AttributeError;
/// # fn check(error: anyhow::Error) {
/// if let Some(AttributeError::Malformed { attribute, offset, .. }) = error.downcast_ref::<AttributeError>() {
///     eprintln!("broken {attribute} attribute at byte {offset}");
/// }
/// # }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
	/// The bytes of an attribute don't form a valid body of that attribute.
	///
	/// `offset` is the position in the class bytes at which the problem was detected.
	#[error("malformed {attribute} attribute at offset {offset}: {reason}")]
	Malformed { attribute: &'static str, offset: usize, reason: String },
	/// The codec of this attribute can't write it, another component has to produce the bytes.
	#[error("the {0} attribute does not support direct encoding")]
	EncodeUnsupported(&'static str),
	/// An encoder was handed the value of another attribute.
	#[error("the {expected} codec cannot encode a {found} attribute")]
	WrongVariant { expected: &'static str, found: &'static str },
	/// The value can't be represented in the class file format.
	#[error("invalid {attribute} attribute: {reason}")]
	InvalidValue { attribute: &'static str, reason: String },
	/// The attribute isn't allowed in class files of the target version.
	#[error("the {attribute} attribute requires class file version {required}, but the target is {target}")]
	VersionTooOld { attribute: &'static str, required: Version, target: Version },
	/// The attribute may only appear once on a structure.
	#[error("only one {0} attribute is allowed")]
	DuplicateAttribute(&'static str),
}

impl AttributeError {
	pub(crate) fn malformed(attribute: &'static str, offset: usize, reason: impl Into<String>) -> AttributeError {
		AttributeError::Malformed { attribute, offset, reason: reason.into() }
	}

	pub(crate) fn invalid(attribute: &'static str, reason: impl Into<String>) -> AttributeError {
		AttributeError::InvalidValue { attribute, reason: reason.into() }
	}

	/// Errors caused by the input bytes. Retrying won't help.
	pub fn is_malformed(&self) -> bool {
		matches!(self, AttributeError::Malformed { .. })
	}

	/// Errors caused by the caller using the API wrong.
	pub fn is_programming_error(&self) -> bool {
		matches!(self, AttributeError::EncodeUnsupported(_) | AttributeError::WrongVariant { .. } | AttributeError::InvalidValue { .. })
	}
}

#[cfg(test)]
mod testing {
	use anyhow::{Context, Result};
	use pretty_assertions::assert_eq;
	use crate::error::AttributeError;

	fn failing() -> Result<()> {
		Err(AttributeError::malformed("SourceFile", 12, "expected 2 bytes"))
			.context("while reading field attributes")
			.context("while reading class Foo")
	}

	#[test]
	fn downcast_through_context() {
		let error = failing().unwrap_err();
		let cause = error.downcast_ref::<AttributeError>();
		assert_eq!(cause, Some(&AttributeError::malformed("SourceFile", 12, "expected 2 bytes")));
		assert!(cause.is_some_and(AttributeError::is_malformed));
	}

	#[test]
	fn categories() {
		assert!(AttributeError::EncodeUnsupported("Code").is_programming_error());
		assert!(!AttributeError::EncodeUnsupported("Code").is_malformed());
		assert!(!AttributeError::DuplicateAttribute("Record").is_programming_error());
		assert_eq!(
			AttributeError::malformed("Exceptions", 3, "truncated").to_string(),
			"malformed Exceptions attribute at offset 3: truncated"
		);
	}
}
