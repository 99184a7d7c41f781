use std::collections::hash_map::Entry;
use std::collections::HashMap;
use anyhow::{anyhow, bail, Context, Result};
use java_string::{JavaStr, JavaString};
use crate::class_constants::pool;
use crate::ClassWrite;

/// The read-only view of a constant pool the attribute codecs need.
///
/// The pool must outlive every [`BoundAttribute`](crate::BoundAttribute) decoded with it, and may be shared between threads.
pub trait ConstantPool: Sync {
	/// The value of `constant_pool_count`, one more than the largest valid index.
	fn count(&self) -> u16;

	/// Gets the contents of the `CONSTANT_Utf8_info` at `index`.
	fn get_utf8(&self, index: u16) -> Result<&JavaStr>;

	/// Checks if `index` is a valid index into this pool. Index `0` never is.
	fn contains(&self, index: u16) -> bool {
		index >= 1 && index < self.count()
	}
}

/// Allows adding entries to a constant pool while writing attributes.
pub trait ConstantPoolBuilder {
	/// Returns the index of a `CONSTANT_Utf8_info` with the given contents, adding one if needed.
	fn put_utf8(&mut self, value: &JavaStr) -> Result<u16>;
}

/// An entry of a [`Pool`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolEntry {
	Utf8 { string: JavaString },
	Integer { bytes: i32 },
	Class { name_index: u16 },
	String { string_index: u16 },
	NameAndType { name_index: u16, descriptor_index: u16 },
	Module { name_index: u16 },
	Package { name_index: u16 },
}

/// A small in-memory constant pool. Entries are deduplicated.
///
/// Only holds the kinds of entries attributes refer to directly.
#[derive(Debug, Clone, Default)]
pub struct Pool {
	/// The entry for index `i` is stored at `i - 1`.
	entries: Vec<PoolEntry>,
	map: HashMap<PoolEntry, u16>,
}

impl Pool {
	pub fn new() -> Pool {
		Pool::default()
	}

	pub fn get(&self, index: u16) -> Option<&PoolEntry> {
		let index = usize::from(index).checked_sub(1)?;
		self.entries.get(index)
	}

	fn put(&mut self, entry: PoolEntry) -> Result<u16> {
		match self.map.entry(entry) {
			Entry::Occupied(entry) => Ok(*entry.get()),
			Entry::Vacant(entry) => {
				let index = u16::try_from(self.entries.len() + 1)
					.ok()
					.filter(|&index| index < u16::MAX)
					.with_context(|| anyhow!("constant pool is full, can't add {:?}", entry.key()))?;

				self.entries.push(entry.key().clone());
				entry.insert(index);

				Ok(index)
			},
		}
	}

	pub fn put_utf8(&mut self, value: &JavaStr) -> Result<u16> {
		self.put(PoolEntry::Utf8 { string: value.to_owned() })
	}

	pub fn put_integer(&mut self, value: i32) -> Result<u16> {
		self.put(PoolEntry::Integer { bytes: value })
	}

	pub fn put_class(&mut self, name: &JavaStr) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		self.put(PoolEntry::Class { name_index })
	}

	pub fn put_string(&mut self, value: &JavaStr) -> Result<u16> {
		let string_index = self.put_utf8(value)?;
		self.put(PoolEntry::String { string_index })
	}

	pub fn put_name_and_type(&mut self, name: &JavaStr, descriptor: &JavaStr) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		let descriptor_index = self.put_utf8(descriptor)?;
		self.put(PoolEntry::NameAndType { name_index, descriptor_index })
	}

	pub fn put_module(&mut self, name: &JavaStr) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		self.put(PoolEntry::Module { name_index })
	}

	pub fn put_package(&mut self, name: &JavaStr) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		self.put(PoolEntry::Package { name_index })
	}

	/// Writes the constant pool, starting with `constant_pool_count`.
	pub fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_u16(self.count())?;

		for entry in &self.entries {
			match entry {
				PoolEntry::Utf8 { string } => {
					writer.write_u8(pool::UTF8)?;
					let vec = string.to_modified_utf8();
					writer.write_usize_as_u16(vec.len()).context("failed to write length of string")?;
					writer.write_u8_slice(&vec)?;
				},
				&PoolEntry::Integer { bytes } => {
					writer.write_u8(pool::INTEGER)?;
					writer.write_i32(bytes)?;
				},
				&PoolEntry::Class { name_index } => {
					writer.write_u8(pool::CLASS)?;
					writer.write_u16(name_index)?;
				},
				&PoolEntry::String { string_index } => {
					writer.write_u8(pool::STRING)?;
					writer.write_u16(string_index)?;
				},
				&PoolEntry::NameAndType { name_index, descriptor_index } => {
					writer.write_u8(pool::NAME_AND_TYPE)?;
					writer.write_u16(name_index)?;
					writer.write_u16(descriptor_index)?;
				},
				&PoolEntry::Module { name_index } => {
					writer.write_u8(pool::MODULE)?;
					writer.write_u16(name_index)?;
				},
				&PoolEntry::Package { name_index } => {
					writer.write_u8(pool::PACKAGE)?;
					writer.write_u16(name_index)?;
				},
			}
		}

		Ok(())
	}
}

impl ConstantPool for Pool {
	fn count(&self) -> u16 {
		// put never lets the pool grow past u16::MAX - 1 entries
		u16::try_from(self.entries.len() + 1).unwrap_or(u16::MAX)
	}

	fn get_utf8(&self, index: u16) -> Result<&JavaStr> {
		match self.get(index) {
			Some(PoolEntry::Utf8 { string }) => Ok(string),
			Some(entry) => bail!("constant pool entry {index} is not an utf8 entry: {entry:?}"),
			None => bail!("constant pool index {index} is out of bounds for a pool of size {}", self.count()),
		}
	}
}

impl ConstantPoolBuilder for Pool {
	fn put_utf8(&mut self, value: &JavaStr) -> Result<u16> {
		Pool::put_utf8(self, value)
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::{ConstantPool, Pool, PoolEntry};

	#[test]
	fn deduplicates() -> Result<()> {
		let mut pool = Pool::new();
		let a = pool.put_utf8(JavaStr::from_str("java/lang/Object"))?;
		let class = pool.put_class(JavaStr::from_str("java/lang/Object"))?;
		let b = pool.put_utf8(JavaStr::from_str("java/lang/Object"))?;

		assert_eq!(a, 1);
		assert_eq!(class, 2);
		assert_eq!(b, a);
		assert_eq!(pool.count(), 3);
		assert_eq!(pool.get(2), Some(&PoolEntry::Class { name_index: 1 }));
		assert_eq!(pool.get(0), None);
		Ok(())
	}

	#[test]
	fn get_utf8() -> Result<()> {
		let mut pool = Pool::new();
		pool.put_integer(5)?;
		pool.put_utf8(JavaStr::from_str("Code"))?;

		assert_eq!(pool.get_utf8(2)?, JavaStr::from_str("Code"));
		assert!(pool.get_utf8(1).is_err());
		assert!(pool.get_utf8(3).is_err());
		assert!(!pool.contains(0));
		assert!(pool.contains(2));
		assert!(!pool.contains(3));
		Ok(())
	}

	#[test]
	fn write() -> Result<()> {
		let mut pool = Pool::new();
		pool.put_string(JavaStr::from_str("\0"))?;
		pool.put_integer(-2)?;

		let mut vec = Vec::new();
		pool.write(&mut vec)?;
		assert_eq!(vec, [
			0x00, 0x04,
			0x01, 0x00, 0x02, 0xc0, 0x80,
			0x08, 0x00, 0x01,
			0x03, 0xff, 0xff, 0xff, 0xfe,
		]);
		Ok(())
	}
}
