use crate::tree::annotation::Annotation;

/// An annotation on a use of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
	/// One of the constants of [`type_annotation`](crate::class_constants::type_annotation). Decides which
	/// variant `target_info` has.
	pub target_type: u8,
	pub target_info: TargetInfo,
	/// The path to the annotated part of the type, empty if the annotation is directly on the type.
	pub target_path: Vec<TypePathEntry>,
	pub annotation: Annotation,
}

/// States exactly on which type the annotation is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInfo {
	/// For `0x00` and `0x01`.
	TypeParameter { index: u8 },
	/// For `0x10`. An index of `65535` means the superclass, otherwise it's an index into the interfaces.
	Supertype { index: u16 },
	/// For `0x11` and `0x12`.
	TypeParameterBound { type_parameter_index: u8, bound_index: u8 },
	/// For `0x13`, `0x14` and `0x15`.
	Empty,
	/// For `0x16`.
	FormalParameter { index: u8 },
	/// For `0x17`, an index into the `Exceptions` attribute.
	Throws { index: u16 },
	/// For `0x40` and `0x41`.
	LocalVariable(Vec<LocalVariableTarget>),
	/// For `0x42`, an index into the exception table of the `Code` attribute.
	Catch { exception_table_index: u16 },
	/// For `0x43` to `0x46`.
	Offset { offset: u16 },
	/// For `0x47` to `0x4B`.
	TypeArgument { offset: u16, type_argument_index: u8 },
}

/// A live range of a local variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalVariableTarget {
	pub start: u16,
	pub length: u16,
	pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePathEntry {
	/// `0` for array types, `1` for nested types, `2` for wildcard bounds and `3` for type arguments.
	pub kind: u8,
	pub argument_index: u8,
}
