//! A crate for reading and writing the attributes of [Java Class Files](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.7).
//!
//! Every standard attribute has a codec, a static implementing [`AttributeCodec`]. The [`registry()`] maps
//! attribute names to these codecs. Decoding an attribute gives a [`BoundAttribute`], which borrows the bytes of
//! the class file and the constant pool, and only materializes the [`Attribute`](tree::Attribute) tree when asked to.
//!
//! ```
//! # use anyhow::Result;
//! # use java_string::JavaStr;
//! # use duke_attributes::{registry, DecodeContext, Pool};
//! # use duke_attributes::tree::Attribute;
//! # fn main() -> Result<()> {
//! let mut pool = Pool::new();
//! pool.put_utf8(JavaStr::from_str("SourceFile"))?;
//! let file = pool.put_utf8(JavaStr::from_str("Main.java"))?;
//!
//! let bytes = [0x00, 0x02];
//! let codec = registry().resolve(JavaStr::from_str("SourceFile")).expect("SourceFile is a standard attribute");
//! let attribute = codec.decode(DecodeContext::new(&bytes, &pool), 0, 2)?;
//! assert_eq!(attribute.value()?, &Attribute::SourceFile(file));
//! # Ok(())
//! # }
//! ```

pub mod class_constants;
pub mod tree;
pub mod codecs;
mod attributes;
mod bound;
mod codec;
mod descriptor;
mod error;
mod macros;
mod pool;
mod registry;
mod version;
mod writer;

use std::io::Write;
use std::num::NonZeroU16;
use anyhow::{anyhow, Context, Result};

pub use attributes::{read_attribute, read_attributes, write_attribute, ClassAttribute, CustomAttribute};
pub use bound::{BoundAttribute, BoundTable, TableEntry};
pub use codec::{AttributeCodec, AttributeEncoder, BodyLayout, DecodeContext};
pub use descriptor::AttributeDescriptor;
pub use error::AttributeError;
pub use pool::{ConstantPool, ConstantPoolBuilder, Pool, PoolEntry};
pub use registry::{registry, resolve, Registry};
pub use version::Version;
pub use writer::{AttributesWriter, VersionPolicy, WriterOptions};

/// A cursor over the bytes of a class file, restricted to one region of it.
///
/// All positions are absolute, so that errors point into the class file. Every failure is an
/// [`AttributeError::Malformed`] naming the attribute the region belongs to.
#[derive(Debug, Clone)]
pub struct ClassReader<'a> {
	bytes: &'a [u8],
	position: usize,
	end: usize,
	attribute: &'static str,
}

impl<'a> ClassReader<'a> {
	/// Creates a reader for `length` bytes starting at `start`. Fails if that region isn't inside of `bytes`.
	pub fn new(bytes: &'a [u8], start: usize, length: usize, attribute: &'static str) -> Result<ClassReader<'a>> {
		let end = start.checked_add(length)
			.filter(|&end| end <= bytes.len())
			.ok_or_else(|| AttributeError::malformed(attribute, start,
				format!("region of {length} bytes doesn't fit into the {} bytes of the class file", bytes.len())
			))?;

		Ok(ClassReader { bytes, position: start, end, attribute })
	}

	pub fn position(&self) -> usize {
		self.position
	}

	/// The name of the attribute the region belongs to.
	pub fn attribute(&self) -> &'static str {
		self.attribute
	}

	pub fn remaining(&self) -> usize {
		self.end - self.position
	}

	/// Creates the error for malformed input at the current position.
	pub fn malformed(&self, reason: impl Into<String>) -> anyhow::Error {
		AttributeError::malformed(self.attribute, self.position, reason).into()
	}

	/// Succeeds only if all bytes of the region were read.
	pub fn finish(self) -> Result<()> {
		if self.position != self.end {
			return Err(self.malformed(format!("{} unexpected trailing bytes", self.remaining())));
		}
		Ok(())
	}

	pub fn skip(&mut self, n: usize) -> Result<()> {
		self.read_slice(n)?;
		Ok(())
	}

	pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(self.malformed(format!("expected {n} more bytes, but only {} are left", self.remaining())));
		}
		let slice = self.bytes.get(self.position..self.position + n)
			.ok_or_else(|| self.malformed("region outside of the class file"))?;
		self.position += n;
		Ok(slice)
	}

	pub fn read_n<const N: usize>(&mut self) -> Result<[u8; N]> {
		let slice = self.read_slice(N)?;
		let mut buf = [0u8; N];
		buf.copy_from_slice(slice);
		Ok(buf)
	}
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(u8::from_be_bytes(self.read_n()?))
	}
	pub fn read_u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.read_n()?))
	}
	pub fn read_u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.read_n()?))
	}
	pub fn read_i32(&mut self) -> Result<i32> {
		Ok(i32::from_be_bytes(self.read_n()?))
	}

	pub fn read_u8_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u8()? as usize)
	}
	pub fn read_u16_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u16()? as usize)
	}
	pub fn read_u32_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u32()? as usize)
	}

	pub fn read_vec<T, S, E>(&mut self, get_size: S, mut get_element: E) -> Result<Vec<T>>
		where
			S: FnOnce(&mut Self) -> Result<usize>,
			E: FnMut(&mut Self) -> Result<T>
	{
		let size = get_size(self)?;
		// the size comes from the input, don't trust it for the allocation
		let mut vec = Vec::with_capacity(size.min(self.remaining()));
		for _ in 0..size {
			vec.push(get_element(self)?);
		}
		Ok(vec)
	}

	/// Reads a constant pool index that must point into the pool.
	pub fn read_index(&mut self, pool: &dyn ConstantPool) -> Result<u16> {
		let index = self.read_u16()?;
		if !pool.contains(index) {
			self.position -= 2;
			return Err(self.malformed(format!("constant pool index {index} is out of bounds for a pool of size {}", pool.count())));
		}
		Ok(index)
	}

	/// Reads a constant pool index where zero means "absent".
	pub fn read_optional_index(&mut self, pool: &dyn ConstantPool) -> Result<Option<NonZeroU16>> {
		let index = self.read_u16()?;
		match NonZeroU16::new(index) {
			Some(index) if !pool.contains(index.get()) => {
				self.position -= 2;
				Err(self.malformed(format!("constant pool index {index} is out of bounds for a pool of size {}", pool.count())))
			},
			index => Ok(index),
		}
	}
}

/// Big endian writing of the primitives of the class file format.
pub trait ClassWrite {
	fn write_u8(&mut self, a: u8) -> Result<()> {
		self.write_u8_slice(&[a]).context("couldn't write u8")
	}
	fn write_u16(&mut self, value: u16) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u16")
	}
	fn write_u32(&mut self, value: u32) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u32")
	}
	fn write_i32(&mut self, value: i32) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write i32")
	}

	fn write_usize_as_u8(&mut self, value: usize) -> Result<()> {
		self.write_u8(u8::try_from(value).with_context(|| anyhow!("failed to convert {value} to u8 for writing: value too large"))?)
	}
	fn write_usize_as_u16(&mut self, value: usize) -> Result<()> {
		self.write_u16(u16::try_from(value).with_context(|| anyhow!("failed to convert {value} to u16 for writing: value too large"))?)
	}
	fn write_usize_as_u32(&mut self, value: usize) -> Result<()> {
		self.write_u32(u32::try_from(value).with_context(|| anyhow!("failed to convert {value} to u32 for writing: value too large"))?)
	}

	/// Writes `0` for [`None`].
	fn write_optional_index(&mut self, index: Option<NonZeroU16>) -> Result<()> {
		self.write_u16(index.map_or(0, NonZeroU16::get))
	}

	fn write_u8_slice(&mut self, buf: &[u8]) -> Result<()>;
	#[allow(clippy::needless_lifetimes)]
	fn write_slice<'t, T>(
		&mut self,
		slice: &'t [T],
		put_size: impl FnOnce(&mut Self, usize) -> Result<()>,
		mut put_element: impl FnMut(&mut Self, &'t T) -> Result<()>
	) -> Result<()> {
		put_size(self, slice.len())?;
		for value in slice {
			put_element(self, value)?;
		}
		Ok(())
	}
}

impl<T: Write> ClassWrite for T {
	fn write_u8_slice(&mut self, buf: &[u8]) -> Result<()> {
		self.write_all(buf).context("failed to write &[u8]")
	}
}
