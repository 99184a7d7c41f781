use std::fmt::{Debug, Formatter};
use anyhow::Result;
use crate::{AttributeError, BoundAttribute, ClassReader, ConstantPool};
use crate::descriptor::AttributeDescriptor;
use crate::tree::Attribute;
use crate::tree::stack_map::VerificationType;

/// How the length of an attribute body relates to its contents.
///
/// Used to validate the declared length of an attribute without parsing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLayout {
	/// The body always has exactly this many bytes.
	Fixed(usize),
	/// A count of `count_width` bytes followed by that many records of `record_size` bytes each.
	Table { count_width: u8, record_size: usize },
	/// Opaque bytes, any length is valid.
	Blob,
	/// The length can only be checked by parsing the body.
	Variable,
}

/// Everything a codec may look at while decoding: the bytes of the class file, its constant pool, and
/// for a `StackMapTable` the locals implied by the descriptor of the enclosing method.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
	bytes: &'a [u8],
	pool: &'a dyn ConstantPool,
	initial_locals: Option<&'a [VerificationType]>,
}

impl<'a> DecodeContext<'a> {
	pub fn new(bytes: &'a [u8], pool: &'a dyn ConstantPool) -> DecodeContext<'a> {
		DecodeContext { bytes, pool, initial_locals: None }
	}

	/// Gives `StackMapTable` decoding the locals of the method entry, so that it can check how the frames fold.
	pub fn with_initial_locals(self, initial_locals: &'a [VerificationType]) -> DecodeContext<'a> {
		DecodeContext { initial_locals: Some(initial_locals), ..self }
	}

	pub fn bytes(&self) -> &'a [u8] {
		self.bytes
	}

	pub fn pool(&self) -> &'a dyn ConstantPool {
		self.pool
	}

	pub fn initial_locals(&self) -> Option<&'a [VerificationType]> {
		self.initial_locals
	}
}

impl Debug for DecodeContext<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DecodeContext")
			.field("bytes", &self.bytes.len())
			.field("pool", &self.pool.count())
			.field("initial_locals", &self.initial_locals)
			.finish()
	}
}

/// The decoding half of an attribute codec. There's exactly one codec for each standard attribute,
/// see [`codecs`](crate::codecs).
pub trait AttributeCodec: Debug + Send + Sync {
	fn descriptor(&self) -> &AttributeDescriptor;

	fn layout(&self) -> BodyLayout;

	/// Parses the complete body. The reader is restricted to the body, and
	/// must be exhausted afterwards.
	fn read(&self, context: &DecodeContext<'_>, reader: &mut ClassReader<'_>) -> Result<Attribute>;

	/// Returns [`None`] if the attribute can't be written on its own.
	fn encoder(&self) -> Option<&dyn AttributeEncoder>;
}

/// The encoding half of an attribute codec.
pub trait AttributeEncoder: AttributeCodec {
	/// Appends the body (without the `attribute_info` header) to `writer`.
	fn encode(&self, writer: &mut Vec<u8>, attribute: &Attribute) -> Result<()>;
}

impl dyn AttributeCodec {
	pub fn name(&self) -> &'static str {
		self.descriptor().name
	}

	/// Decodes the attribute body of `length` bytes at `position` in the bytes of `context`.
	///
	/// The declared length is validated against the [layout](AttributeCodec::layout). Bodies without a fixed structure are
	/// parsed completely, others are parsed when their value is first needed.
	pub fn decode<'a>(&'static self, context: DecodeContext<'a>, position: usize, length: u32) -> Result<BoundAttribute<'a>> {
		BoundAttribute::new(self, context, position, length)
	}

	/// Appends the body of `attribute` to `writer`.
	///
	/// Fails with [`AttributeError::EncodeUnsupported`] for attributes that can't be written on their own, like `Code`.
	pub fn encode(&self, writer: &mut Vec<u8>, attribute: &Attribute) -> Result<()> {
		match self.encoder() {
			Some(encoder) => encoder.encode(writer, attribute),
			None => Err(AttributeError::EncodeUnsupported(self.name()).into()),
		}
	}
}

/// Reads the body at `[position, position + length)` with `codec`, requiring all bytes to be consumed.
pub(crate) fn read_body(codec: &dyn AttributeCodec, context: &DecodeContext<'_>, position: usize, length: usize) -> Result<Attribute> {
	let mut reader = ClassReader::new(context.bytes(), position, length, codec.descriptor().name)?;
	let attribute = codec.read(context, &mut reader)?;
	reader.finish()?;
	Ok(attribute)
}

/// Gives an error of an encoder a typed cause, if it doesn't have one already.
///
/// Writing to a [`Vec`] can't fail, so such an error is always a value the class file format can't hold.
pub(crate) fn invalid_unless_typed(attribute: &'static str, error: anyhow::Error) -> anyhow::Error {
	if error.downcast_ref::<AttributeError>().is_some() {
		error
	} else {
		AttributeError::invalid(attribute, format!("{error:#}")).into()
	}
}
