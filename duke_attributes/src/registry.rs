use std::sync::OnceLock;
use indexmap::IndexMap;
use java_string::JavaStr;
use log::trace;
use crate::AttributeCodec;
use crate::codecs::ALL;

/// Maps attribute names to the codecs of the standard attributes.
///
/// There's only one instance, see [`registry()`]. It never changes after it's built.
#[derive(Debug)]
pub struct Registry {
	codecs: IndexMap<&'static str, &'static dyn AttributeCodec>,
}

impl Registry {
	fn new() -> Registry {
		let codecs: IndexMap<_, _> = ALL.iter()
			.map(|&codec| (codec.name(), codec))
			.collect();

		trace!("built attribute registry with {} codecs", codecs.len());

		Registry { codecs }
	}

	/// Looks up the codec for an attribute name. Names that aren't standard attributes give [`None`].
	pub fn resolve(&self, name: &JavaStr) -> Option<&'static dyn AttributeCodec> {
		self.resolve_str(name.as_str().ok()?)
	}

	pub fn resolve_str(&self, name: &str) -> Option<&'static dyn AttributeCodec> {
		self.codecs.get(name).copied()
	}

	/// Iterates over all codecs, in the order of [`codecs::ALL`](crate::codecs::ALL).
	pub fn iter(&self) -> impl Iterator<Item=&'static dyn AttributeCodec> + '_ {
		self.codecs.values().copied()
	}

	pub fn len(&self) -> usize {
		self.codecs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.codecs.is_empty()
	}
}

/// The registry of all standard attributes.
pub fn registry() -> &'static Registry {
	static REGISTRY: OnceLock<Registry> = OnceLock::new();
	REGISTRY.get_or_init(Registry::new)
}

/// Shorthand for `registry().resolve(name)`.
pub fn resolve(name: &JavaStr) -> Option<&'static dyn AttributeCodec> {
	registry().resolve(name)
}

#[cfg(test)]
mod testing {
	use java_string::{JavaStr, JavaString};
	use pretty_assertions::assert_eq;
	use crate::registry::{registry, resolve};

	#[test]
	fn resolve_names() {
		assert_eq!(resolve(JavaStr::from_str("Signature")).map(|codec| codec.name()), Some("Signature"));
		assert_eq!(resolve(JavaStr::from_str("CompilationID")).map(|codec| codec.name()), Some("CompilationID"));
		assert!(resolve(JavaStr::from_str("signature")).is_none());
		assert!(resolve(JavaStr::from_str("")).is_none());
	}

	#[test]
	fn unpaired_surrogate() {
		// not valid utf8, so never a standard name
		let name = JavaString::from_modified_utf8(vec![0xed, 0xa0, 0x80]);
		assert!(name.is_ok_and(|name| resolve(&name).is_none()));
	}

	#[test]
	fn built_once() {
		assert!(std::ptr::eq(registry(), registry()));
		assert_eq!(registry().len(), 36);
		assert_eq!(registry().iter().count(), 36);
	}
}
