use crate::attributes::{read_attribute_infos, write_attribute_infos};
use crate::class_constants::attribute;
use crate::macros::codec;
use crate::{BodyLayout, ClassWrite, Version};
use crate::tree::Attribute;
use crate::tree::record::RecordComponent;

codec! {
	/// The components of a record class. Each one carries its own attributes.
	RecordCodec = RECORD (attribute::RECORD, Version::V16, false, BodyLayout::Variable) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::Record(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(RecordComponent {
					name_index: r.read_index(pool)?,
					descriptor_index: r.read_index(pool)?,
					attributes: read_attribute_infos(context, r)?,
				})
			)?))
		}
		write(writer, Attribute::Record(components)) {
			writer.write_slice(components,
				|w, size| w.write_usize_as_u16(size),
				|w, component| {
					w.write_u16(component.name_index)?;
					w.write_u16(component.descriptor_index)?;
					write_attribute_infos(w, &component.attributes)
				}
			)
		}
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::{AttributeCodec, AttributeEncoder, AttributeError, DecodeContext, Pool};
	use crate::codecs::RECORD;
	use crate::tree::{Attribute, AttributeInfo};
	use crate::tree::record::RecordComponent;

	#[test]
	fn round_trip() -> Result<()> {
		let mut pool = Pool::new();
		let name = pool.put_utf8(JavaStr::from_str("x"))?;
		let descriptor = pool.put_utf8(JavaStr::from_str("I"))?;
		let signature_name = pool.put_utf8(JavaStr::from_str("Signature"))?;
		let vendor_name = pool.put_utf8(JavaStr::from_str("VendorInfo"))?;

		let bytes = [
			0x00, 0x01,
			0x00, 0x01, 0x00, 0x02,
			0x00, 0x02,
			0x00, 0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02,
			0x00, 0x04, 0x00, 0x00, 0x00, 0x03, 0xaa, 0xbb, 0xcc,
		];
		let expected = Attribute::Record(vec![RecordComponent {
			name_index: name,
			descriptor_index: descriptor,
			attributes: vec![
				AttributeInfo { name_index: signature_name, attribute: Attribute::Signature(descriptor) },
				AttributeInfo { name_index: vendor_name, attribute: Attribute::Unknown(vec![0xaa, 0xbb, 0xcc]) },
			],
		}]);

		let codec: &'static dyn AttributeCodec = &RECORD;
		let attribute = codec.decode(DecodeContext::new(&bytes, &pool), 0, u32::try_from(bytes.len())?)?;
		assert_eq!(attribute.value()?, &expected);

		let mut written = Vec::new();
		RECORD.encode(&mut written, &expected)?;
		assert_eq!(written, bytes);
		Ok(())
	}

	#[test]
	fn nested_length_mismatch() -> Result<()> {
		let mut pool = Pool::new();
		pool.put_utf8(JavaStr::from_str("x"))?;
		pool.put_utf8(JavaStr::from_str("I"))?;
		pool.put_utf8(JavaStr::from_str("Signature"))?;

		// the Signature attribute claims 3 bytes
		let bytes = [
			0x00, 0x01,
			0x00, 0x01, 0x00, 0x02,
			0x00, 0x01,
			0x00, 0x03, 0x00, 0x00, 0x00, 0x03, 0x00, 0x02, 0x00,
		];
		let codec: &'static dyn AttributeCodec = &RECORD;
		assert!(codec.decode(DecodeContext::new(&bytes, &pool), 0, u32::try_from(bytes.len())?).is_err());
		Ok(())
	}

	/// A record whose only component has a `Record` attribute, `levels` times over.
	fn nested_records(levels: usize) -> Vec<u8> {
		let mut body = vec![0x00, 0x00];
		for _ in 0..levels {
			let mut outer = vec![
				0x00, 0x01,
				0x00, 0x01, 0x00, 0x02,
				0x00, 0x01,
				0x00, 0x03,
			];
			outer.extend_from_slice(&(body.len() as u32).to_be_bytes());
			outer.extend_from_slice(&body);
			body = outer;
		}
		body
	}

	#[test]
	fn nested_record() -> Result<()> {
		let mut pool = Pool::new();
		pool.put_utf8(JavaStr::from_str("x"))?;
		pool.put_utf8(JavaStr::from_str("I"))?;
		pool.put_utf8(JavaStr::from_str("Record"))?;
		let codec: &'static dyn AttributeCodec = &RECORD;

		let bytes = nested_records(1);
		assert_eq!(bytes.len(), 16);

		for levels in [1, 2, 5000] {
			let bytes = nested_records(levels);
			let error = codec.decode(DecodeContext::new(&bytes, &pool), 0, u32::try_from(bytes.len())?).unwrap_err();
			assert!(matches!(
				error.downcast_ref::<AttributeError>(),
				Some(AttributeError::Malformed { attribute: "Record", offset: 8, .. })
			), "{levels} levels gave {error:?}");
		}
		Ok(())
	}

	#[test]
	fn nested_record_not_encodable() {
		let component = |attributes| RecordComponent { name_index: 1, descriptor_index: 2, attributes };
		let inner = Attribute::Record(vec![component(Vec::new())]);
		let outer = Attribute::Record(vec![component(vec![AttributeInfo { name_index: 3, attribute: inner }])]);

		let error = RECORD.encode(&mut Vec::new(), &outer).unwrap_err();
		assert!(error.downcast_ref::<AttributeError>().is_some_and(AttributeError::is_programming_error));
	}
}
