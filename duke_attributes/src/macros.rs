/// Creates a codec for one attribute: a struct holding its descriptor, its static instance and the
/// [`AttributeCodec`](crate::AttributeCodec) implementation.
///
/// ```ignore
/// codec! {
///     /// docs for the struct
///     SourceFileCodec = SOURCE_FILE (attribute::SOURCE_FILE, Version::V1_0, false, BodyLayout::Fixed(2)) {
///         read(context, reader) {
///             Ok(Attribute::SourceFile(reader.read_index(context.pool())?))
///         }
///         write(writer, Attribute::SourceFile(index)) {
///             writer.write_u16(*index)
///         }
///     }
/// }
/// ```
/// The `write` part is optional. If it's given, the struct also implements [`AttributeEncoder`](crate::AttributeEncoder),
/// and the pattern is matched against the attribute to encode. A value not matching the pattern is an
/// [`AttributeError::WrongVariant`](crate::AttributeError::WrongVariant). Values that don't fit, like a list longer
/// than its count allows, are an [`AttributeError::InvalidValue`](crate::AttributeError::InvalidValue).
macro_rules! codec {
	(
		$( #[$doc:meta] )*
		$name:ident = $instance:ident ( $attribute:expr, $version:expr, $multiple:expr, $layout:expr ) {
			read ( $context:ident, $reader:ident ) $read:block
			$( write ( $writer:ident, $pattern:pat ) $write:block )?
		}
	) => {
		$( #[$doc] )*
		#[derive(Debug)]
		pub struct $name {
			descriptor: $crate::AttributeDescriptor,
		}

		#[doc = concat!("The instance of [`", stringify!($name), "`].")]
		pub static $instance: $name = $name {
			descriptor: $crate::AttributeDescriptor::new($attribute, $version, $multiple),
		};

		impl $crate::AttributeCodec for $name {
			fn descriptor(&self) -> &$crate::AttributeDescriptor {
				&self.descriptor
			}

			fn layout(&self) -> $crate::BodyLayout {
				$layout
			}

			fn read(&self, $context: &$crate::DecodeContext<'_>, $reader: &mut $crate::ClassReader<'_>) -> anyhow::Result<$crate::tree::Attribute> $read

			fn encoder(&self) -> Option<&dyn $crate::AttributeEncoder> {
				$crate::macros::codec!(@encoder self $( $writer )?)
			}
		}

		$(
			impl $name {
				fn write_body(&self, $writer: &mut Vec<u8>, attribute: &$crate::tree::Attribute) -> anyhow::Result<()> {
					let $pattern = attribute else {
						return Err($crate::AttributeError::WrongVariant {
							expected: self.descriptor.name,
							found: attribute.name(),
						}.into());
					};
					$write
				}
			}

			impl $crate::AttributeEncoder for $name {
				fn encode(&self, writer: &mut Vec<u8>, attribute: &$crate::tree::Attribute) -> anyhow::Result<()> {
					self.write_body(writer, attribute)
						.map_err(|error| $crate::codec::invalid_unless_typed(self.descriptor.name, error))
				}
			}
		)?
	};
	(@encoder $self:ident $writer:ident) => { Some($self) };
	(@encoder $self:ident) => { None };
}

pub(crate) use codec;
