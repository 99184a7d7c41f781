use std::num::NonZeroU16;

/// The contents of the `Module` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAttribute {
	/// Index of a `CONSTANT_Module_info`.
	pub name: u16,
	pub flags: u16,
	pub version: Option<NonZeroU16>,

	pub requires: Vec<ModuleRequires>,
	pub exports: Vec<ModuleExports>,
	pub opens: Vec<ModuleOpens>,
	/// Indices of `CONSTANT_Class_info` entries.
	pub uses: Vec<u16>,
	pub provides: Vec<ModuleProvides>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleRequires {
	pub module: u16,
	pub flags: u16,
	pub version: Option<NonZeroU16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExports {
	/// Index of a `CONSTANT_Package_info`.
	pub package: u16,
	pub flags: u16,
	/// The modules the package is exported to, empty for an unqualified export.
	pub to: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOpens {
	pub package: u16,
	pub flags: u16,
	pub to: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProvides {
	pub service: u16,
	/// Must not be empty.
	pub with: Vec<u16>,
}
