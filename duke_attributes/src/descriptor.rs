use crate::version::Version;

/// The static facts about one kind of attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeDescriptor {
	/// The name under which the attribute is stored in the constant pool.
	pub name: &'static str,
	/// The first class file version in which the attribute may appear.
	pub minimum_version: Version,
	/// Whether a structure may carry more than one attribute of this kind.
	pub allow_multiple: bool,
}

impl AttributeDescriptor {
	pub const fn new(name: &'static str, minimum_version: Version, allow_multiple: bool) -> AttributeDescriptor {
		AttributeDescriptor { name, minimum_version, allow_multiple }
	}

	pub fn is_allowed_in(&self, version: Version) -> bool {
		self.minimum_version <= version
	}
}
