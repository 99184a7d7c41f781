use anyhow::Result;
use crate::class_constants::attribute;
use crate::codecs::{read_index_list, write_index_list};
use crate::macros::codec;
use crate::{BodyLayout, ClassReader, ClassWrite, ConstantPool, Version};
use crate::tree::Attribute;
use crate::tree::module::{ModuleAttribute, ModuleExports, ModuleOpens, ModuleProvides, ModuleRequires};

fn read_module(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<ModuleAttribute> {
	Ok(ModuleAttribute {
		name: reader.read_index(pool)?,
		flags: reader.read_u16()?,
		version: reader.read_optional_index(pool)?,
		requires: reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(ModuleRequires {
				module: r.read_index(pool)?,
				flags: r.read_u16()?,
				version: r.read_optional_index(pool)?,
			})
		)?,
		exports: reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(ModuleExports {
				package: r.read_index(pool)?,
				flags: r.read_u16()?,
				to: read_index_list(r, pool)?,
			})
		)?,
		opens: reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(ModuleOpens {
				package: r.read_index(pool)?,
				flags: r.read_u16()?,
				to: read_index_list(r, pool)?,
			})
		)?,
		uses: read_index_list(reader, pool)?,
		provides: reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(ModuleProvides {
				service: r.read_index(pool)?,
				with: read_index_list(r, pool)?,
			})
		)?,
	})
}

fn write_module(writer: &mut Vec<u8>, module: &ModuleAttribute) -> Result<()> {
	writer.write_u16(module.name)?;
	writer.write_u16(module.flags)?;
	writer.write_optional_index(module.version)?;
	writer.write_slice(&module.requires,
		|w, size| w.write_usize_as_u16(size),
		|w, requires| {
			w.write_u16(requires.module)?;
			w.write_u16(requires.flags)?;
			w.write_optional_index(requires.version)
		}
	)?;
	writer.write_slice(&module.exports,
		|w, size| w.write_usize_as_u16(size),
		|w, exports| {
			w.write_u16(exports.package)?;
			w.write_u16(exports.flags)?;
			write_index_list(w, &exports.to)
		}
	)?;
	writer.write_slice(&module.opens,
		|w, size| w.write_usize_as_u16(size),
		|w, opens| {
			w.write_u16(opens.package)?;
			w.write_u16(opens.flags)?;
			write_index_list(w, &opens.to)
		}
	)?;
	write_index_list(writer, &module.uses)?;
	writer.write_slice(&module.provides,
		|w, size| w.write_usize_as_u16(size),
		|w, provides| {
			w.write_u16(provides.service)?;
			write_index_list(w, &provides.with)
		}
	)
}

codec! {
	/// The description of a module, only present in `module-info.class`.
	ModuleCodec = MODULE (attribute::MODULE, Version::V9, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::Module(read_module(reader, context.pool())?))
		}
		write(writer, Attribute::Module(module)) {
			write_module(writer, module)
		}
	}
}
