use crate::tree::AttributeInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordComponent {
	pub name_index: u16,
	pub descriptor_index: u16,
	pub attributes: Vec<AttributeInfo>,
}
