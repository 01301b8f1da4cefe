//! The binary container assembler.
//!
//! Layout: a 16-byte header, the data section (encoded constants), then the
//! code section.
//!
//! ```text
//! bytes 0..4    four-character magic (PBO3, NBO2, ...)
//! bytes 4..8    entry-point offset into the code section (u32 LE, 0)
//! bytes 8..12   data-section length (u32 LE)
//! bytes 12..16  code-section length (u32 LE)
//! ```
//!
//! Each constant is written as `length (u32 LE) || encoded bytes`, with the
//! length-prefixed raw value encoding; objects serialize to canonical
//! (sorted-key) JSON.

use crate::emitter::constants::Const;

/// Serializes constants and code into a byte container with the given
/// magic.
pub fn assemble(magic: &[u8; 4], code: &[u8], constants: &[Const]) -> Vec<u8> {
    let mut data = Vec::new();
    for constant in constants {
        let encoded = encode_constant(constant);
        data.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        data.extend_from_slice(&encoded);
    }

    let mut container = Vec::with_capacity(16 + data.len() + code.len());
    container.extend_from_slice(magic);
    container.extend_from_slice(&0u32.to_le_bytes());
    container.extend_from_slice(&(data.len() as u32).to_le_bytes());
    container.extend_from_slice(&(code.len() as u32).to_le_bytes());
    container.extend_from_slice(&data);
    container.extend_from_slice(code);
    container
}

fn encode_constant(constant: &Const) -> Vec<u8> {
    match constant {
        Const::Str(s) => s.as_bytes().to_vec(),
        Const::Number(n) => n.to_le_bytes().to_vec(),
        Const::Null => vec![0x00],
        Const::Bool(b) => vec![u8::from(*b)],
        Const::BigInt(i) => i.to_le_bytes().to_vec(),
        Const::Object(value) => {
            // serde_json maps are sorted by key, which is the canonical form.
            serde_json::to_string(value)
                .unwrap_or_default()
                .into_bytes()
        }
        Const::Undefined => vec![0x00],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let code = [0x01, 0x00, 0x00, 0x00, 0x00, 0xFF];
        let constants = [Const::Number(1.0), Const::Str("x".into())];
        let container = assemble(b"PBO3", &code, &constants);

        assert_eq!(&container[0..4], b"PBO3");
        assert_eq!(u32::from_le_bytes(container[4..8].try_into().unwrap()), 0);

        let data_len = u32::from_le_bytes(container[8..12].try_into().unwrap()) as usize;
        let code_len = u32::from_le_bytes(container[12..16].try_into().unwrap()) as usize;
        assert_eq!(data_len, 4 + 8 + 4 + 1);
        assert_eq!(code_len, code.len());
        assert_eq!(container.len(), 16 + data_len + code_len);
        assert_eq!(&container[16 + data_len..], &code);
    }

    #[test]
    fn test_number_encoding() {
        let container = assemble(b"PBO3", &[], &[Const::Number(1.5)]);
        assert_eq!(
            u32::from_le_bytes(container[16..20].try_into().unwrap()),
            8
        );
        assert_eq!(&container[20..28], &1.5f64.to_le_bytes());
    }

    #[test]
    fn test_string_encoding_is_utf8() {
        let container = assemble(b"PBO3", &[], &[Const::Str("héllo".into())]);
        let len = u32::from_le_bytes(container[16..20].try_into().unwrap()) as usize;
        assert_eq!(&container[20..20 + len], "héllo".as_bytes());
    }

    #[test]
    fn test_scalar_one_byte_encodings() {
        for (constant, byte) in [
            (Const::Null, 0x00),
            (Const::Undefined, 0x00),
            (Const::Bool(false), 0x00),
            (Const::Bool(true), 0x01),
        ] {
            let container = assemble(b"PBO3", &[], &[constant]);
            assert_eq!(
                u32::from_le_bytes(container[16..20].try_into().unwrap()),
                1
            );
            assert_eq!(container[20], byte);
        }
    }

    #[test]
    fn test_bigint_encoding() {
        let container = assemble(b"PBO3", &[], &[Const::BigInt(-2)]);
        assert_eq!(&container[20..28], &(-2i64).to_le_bytes());
    }

    #[test]
    fn test_object_canonical_keys() {
        let value = serde_json::json!({"zeta": 1, "alpha": 2});
        let container = assemble(b"NBO2", &[], &[Const::Object(value)]);
        let len = u32::from_le_bytes(container[16..20].try_into().unwrap()) as usize;
        let text = std::str::from_utf8(&container[20..20 + len]).unwrap();
        assert_eq!(text, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_empty_sections() {
        let container = assemble(b"NBO2", &[], &[]);
        assert_eq!(container.len(), 16);
    }
}
