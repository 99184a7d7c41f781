use std::collections::HashSet;
use anyhow::{anyhow, Context, Result};
use java_string::JavaStr;
use log::debug;
use crate::{registry, write_attribute, AttributeError, ClassAttribute, ClassWrite, ConstantPoolBuilder, Version};
use crate::descriptor::AttributeDescriptor;
use crate::tree::Attribute;

const ATTRIBUTE_INFO: &str = "attribute_info";

/// What to do with an attribute that's newer than the target class file version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
	/// Fail with [`AttributeError::VersionTooOld`].
	#[default]
	Reject,
	/// Leave the attribute out.
	Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
	/// The version of the class file being written.
	pub target: Version,
	pub version_policy: VersionPolicy,
	/// Reject a second attribute of a kind that may only appear once.
	pub check_multiplicity: bool,
}

impl Default for WriterOptions {
	fn default() -> Self {
		WriterOptions {
			target: Version::LATEST,
			version_policy: VersionPolicy::Reject,
			check_multiplicity: true,
		}
	}
}

/// Collects the attributes of one class, field, method or record component, and writes them as an attribute table.
#[derive(Debug, Clone)]
pub struct AttributesWriter {
	options: WriterOptions,
	buffer: Vec<u8>,
	count: u16,
	seen: HashSet<&'static str>,
}

impl AttributesWriter {
	pub fn new(options: WriterOptions) -> AttributesWriter {
		AttributesWriter {
			options,
			buffer: Vec::new(),
			count: 0,
			seen: HashSet::new(),
		}
	}

	pub fn options(&self) -> &WriterOptions {
		&self.options
	}

	/// Checks the version and multiplicity rules. Returns `false` if the attribute is to be left out.
	fn admit(&self, descriptor: &AttributeDescriptor) -> Result<bool> {
		let target = self.options.target;
		if !descriptor.is_allowed_in(target) {
			match self.options.version_policy {
				VersionPolicy::Reject => {
					return Err(AttributeError::VersionTooOld {
						attribute: descriptor.name,
						required: descriptor.minimum_version,
						target,
					}.into());
				},
				VersionPolicy::Omit => {
					debug!("omitting {} attribute, it requires {} but the target is {target}", descriptor.name, descriptor.minimum_version);
					return Ok(false);
				},
			}
		}

		if self.options.check_multiplicity && !descriptor.allow_multiple && self.seen.contains(descriptor.name) {
			return Err(AttributeError::DuplicateAttribute(descriptor.name).into());
		}

		Ok(true)
	}

	/// The count after adding another attribute.
	fn next_count(&self, name: &'static str) -> Result<u16> {
		self.count.checked_add(1)
			.ok_or_else(|| AttributeError::invalid(name, "an attribute table can't hold more than 65535 attributes").into())
	}

	/// Adds a standard attribute, putting its name into the constant pool.
	///
	/// Returns `false` if the attribute was left out because of [`VersionPolicy::Omit`].
	pub fn write(&mut self, pool: &mut impl ConstantPoolBuilder, attribute: &Attribute) -> Result<bool> {
		let codec = match attribute {
			Attribute::Unknown(_) => return Err(AttributeError::invalid("Unknown",
				"an attribute without a codec has no name, use write_custom for it"
			).into()),
			attribute => attribute.codec()
				.with_context(|| anyhow!("no codec for the {} attribute", attribute.name()))?,
		};
		let descriptor = codec.descriptor();

		if !self.admit(descriptor)? {
			return Ok(false);
		}

		let count = self.next_count(descriptor.name)?;

		let name_index = pool.put_utf8(JavaStr::from_str(descriptor.name))?;
		write_attribute(&mut self.buffer, name_index, attribute)?;
		self.count = count;
		self.seen.insert(descriptor.name);
		Ok(true)
	}

	/// Adds an attribute that has no codec.
	///
	/// Fails for the names of standard attributes, since those bytes could violate the rules [`AttributesWriter::write`] checks.
	pub fn write_custom(&mut self, pool: &mut impl ConstantPoolBuilder, name: &JavaStr, body: &[u8]) -> Result<()> {
		if let Some(codec) = registry().resolve(name) {
			return Err(AttributeError::invalid(codec.name(), "standard attributes can't be written as custom attributes").into());
		}

		let length = u32::try_from(body.len())
			.map_err(|_| AttributeError::invalid(ATTRIBUTE_INFO, format!("the body of {name:?} is too long")))?;
		let count = self.next_count(ATTRIBUTE_INFO)?;

		let name_index = pool.put_utf8(name)?;
		self.buffer.write_u16(name_index)?;
		self.buffer.write_u32(length)?;
		self.buffer.write_u8_slice(body)?;
		self.count = count;
		Ok(())
	}

	/// Copies a read attribute byte for byte. The constant pool must be the one it was read with.
	///
	/// Standard attributes are subject to the same rules as in [`AttributesWriter::write`].
	pub fn copy(&mut self, attribute: &ClassAttribute<'_>) -> Result<bool> {
		match attribute {
			ClassAttribute::Standard { attribute: bound, .. } => {
				let descriptor = bound.descriptor();
				if !self.admit(descriptor)? {
					return Ok(false);
				}
				let count = self.next_count(descriptor.name)?;
				attribute.write_to(&mut self.buffer)?;
				self.count = count;
				self.seen.insert(descriptor.name);
			},
			ClassAttribute::Custom(_) => {
				let count = self.next_count(ATTRIBUTE_INFO)?;
				attribute.write_to(&mut self.buffer)?;
				self.count = count;
			},
		}
		Ok(true)
	}

	/// The number of attributes added so far.
	pub fn len(&self) -> usize {
		self.count.into()
	}

	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// Writes `attributes_count` and all the attributes.
	pub fn finish(self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_u16(self.count)?;
		writer.write_u8_slice(&self.buffer)
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::{AttributeError, AttributesWriter, Pool, Version, VersionPolicy, WriterOptions};
	use crate::tree::Attribute;

	#[test]
	fn write_and_finish() -> Result<()> {
		let mut pool = Pool::new();
		let file = pool.put_utf8(JavaStr::from_str("Main.java"))?;

		let mut writer = AttributesWriter::new(WriterOptions::default());
		assert!(writer.is_empty());
		assert!(writer.write(&mut pool, &Attribute::SourceFile(file))?);
		assert!(writer.write(&mut pool, &Attribute::Deprecated)?);
		assert!(writer.write(&mut pool, &Attribute::Deprecated)?);
		assert_eq!(writer.len(), 3);

		let mut bytes = Vec::new();
		writer.finish(&mut bytes)?;
		assert_eq!(bytes, [
			0x00, 0x03,
			0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01,
			0x00, 0x03, 0x00, 0x00, 0x00, 0x00,
			0x00, 0x03, 0x00, 0x00, 0x00, 0x00,
		]);
		Ok(())
	}

	#[test]
	fn duplicate() -> Result<()> {
		let mut pool = Pool::new();
		let mut writer = AttributesWriter::new(WriterOptions::default());
		writer.write(&mut pool, &Attribute::Synthetic)?;
		let error = writer.write(&mut pool, &Attribute::Synthetic).unwrap_err();
		assert_eq!(error.downcast_ref::<AttributeError>(), Some(&AttributeError::DuplicateAttribute("Synthetic")));
		assert_eq!(writer.len(), 1);

		let mut writer = AttributesWriter::new(WriterOptions { check_multiplicity: false, ..WriterOptions::default() });
		writer.write(&mut pool, &Attribute::Synthetic)?;
		writer.write(&mut pool, &Attribute::Synthetic)?;
		assert_eq!(writer.len(), 2);
		Ok(())
	}

	#[test]
	fn version_policy() -> Result<()> {
		let mut pool = Pool::new();
		let options = WriterOptions { target: Version::V1_8, ..WriterOptions::default() };

		let mut writer = AttributesWriter::new(options);
		let error = writer.write(&mut pool, &Attribute::NestHost(1)).unwrap_err();
		assert_eq!(error.downcast_ref::<AttributeError>(), Some(&AttributeError::VersionTooOld {
			attribute: "NestHost",
			required: Version::V11,
			target: Version::V1_8,
		}));

		let mut writer = AttributesWriter::new(WriterOptions { version_policy: VersionPolicy::Omit, ..options });
		assert!(!writer.write(&mut pool, &Attribute::NestHost(1))?);
		assert!(writer.write(&mut pool, &Attribute::Signature(1))?);
		assert_eq!(writer.len(), 1);
		Ok(())
	}

	#[test]
	fn custom() -> Result<()> {
		let mut pool = Pool::new();
		let mut writer = AttributesWriter::new(WriterOptions::default());

		assert!(writer.write(&mut pool, &Attribute::Unknown(vec![1])).is_err());
		assert!(writer.write_custom(&mut pool, JavaStr::from_str("Synthetic"), &[]).is_err());

		writer.write_custom(&mut pool, JavaStr::from_str("VendorInfo"), &[0xab])?;
		let mut bytes = Vec::new();
		writer.finish(&mut bytes)?;
		assert_eq!(bytes, [0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0xab]);
		Ok(())
	}

	#[test]
	fn too_many_attributes() -> Result<()> {
		let mut pool = Pool::new();
		let mut writer = AttributesWriter::new(WriterOptions::default());
		for _ in 0..u16::MAX {
			writer.write(&mut pool, &Attribute::Deprecated)?;
		}
		assert_eq!(writer.len(), 65535);

		let error = writer.write(&mut pool, &Attribute::Deprecated).unwrap_err();
		assert!(matches!(error.downcast_ref::<AttributeError>(), Some(AttributeError::InvalidValue { attribute: "Deprecated", .. })));
		let error = writer.write_custom(&mut pool, JavaStr::from_str("VendorInfo"), &[]).unwrap_err();
		assert!(error.downcast_ref::<AttributeError>().is_some_and(AttributeError::is_programming_error));

		let mut bytes = Vec::new();
		writer.finish(&mut bytes)?;
		assert_eq!(bytes.len(), 2 + 65535 * 6);
		Ok(())
	}
}
