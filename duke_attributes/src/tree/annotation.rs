/// An annotation, as found in the `Runtime*Annotations` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
	/// Index of a field descriptor, the type of the annotation.
	pub type_index: u16,
	pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementValuePair {
	pub name_index: u16,
	pub value: ElementValue,
}

/// The value of an annotation element.
///
/// The primitive variants hold the index of the constant pool entry with the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
	Byte(u16),
	Char(u16),
	Double(u16),
	Float(u16),
	Int(u16),
	Long(u16),
	Short(u16),
	Boolean(u16),
	/// Index of an utf8 entry, not of a `CONSTANT_String_info`.
	String(u16),
	Enum { type_name_index: u16, const_name_index: u16 },
	/// Index of a return descriptor.
	Class(u16),
	Annotation(Annotation),
	Array(Vec<ElementValue>),
}

impl ElementValue {
	/// The `tag` of this element value.
	pub fn tag(&self) -> u8 {
		use crate::class_constants::element_value;
		match self {
			ElementValue::Byte(_) => element_value::BYTE,
			ElementValue::Char(_) => element_value::CHAR,
			ElementValue::Double(_) => element_value::DOUBLE,
			ElementValue::Float(_) => element_value::FLOAT,
			ElementValue::Int(_) => element_value::INT,
			ElementValue::Long(_) => element_value::LONG,
			ElementValue::Short(_) => element_value::SHORT,
			ElementValue::Boolean(_) => element_value::BOOLEAN,
			ElementValue::String(_) => element_value::STRING,
			ElementValue::Enum { .. } => element_value::ENUM,
			ElementValue::Class(_) => element_value::CLASS,
			ElementValue::Annotation(_) => element_value::ANNOTATION,
			ElementValue::Array(_) => element_value::ARRAY,
		}
	}
}
