//! AML opcode constants and the EISA identifier packing used by `_HID`.

pub const OP_ZERO: u8 = 0x00;
pub const OP_ONE: u8 = 0x01;
pub const OP_ALIAS: u8 = 0x06;
pub const OP_NAME: u8 = 0x08;
pub const OP_BYTE_PREFIX: u8 = 0x0A;
pub const OP_WORD_PREFIX: u8 = 0x0B;
pub const OP_DWORD_PREFIX: u8 = 0x0C;
pub const OP_STRING_PREFIX: u8 = 0x0D;
pub const OP_QWORD_PREFIX: u8 = 0x0E;
pub const OP_SCOPE: u8 = 0x10;
pub const OP_BUFFER: u8 = 0x11;
pub const OP_PACKAGE: u8 = 0x12;
pub const OP_METHOD: u8 = 0x14;
pub const OP_CREATE_DWORD_FIELD: u8 = 0x8A;
pub const OP_CREATE_WORD_FIELD: u8 = 0x8B;
pub const OP_CREATE_BYTE_FIELD: u8 = 0x8C;
pub const OP_CREATE_BIT_FIELD: u8 = 0x8D;
pub const OP_CREATE_QWORD_FIELD: u8 = 0x8F;
pub const OP_RETURN: u8 = 0xA4;
pub const OP_ONES: u8 = 0xFF;

pub const EXT_PREFIX: u8 = 0x5B;
pub const EXT_MUTEX: u8 = 0x01;
pub const EXT_EVENT: u8 = 0x02;
pub const EXT_CREATE_FIELD: u8 = 0x13;
pub const EXT_OP_REGION: u8 = 0x80;
pub const EXT_FIELD: u8 = 0x81;
pub const EXT_DEVICE: u8 = 0x82;
pub const EXT_PROCESSOR: u8 = 0x83;
pub const EXT_POWER_RES: u8 = 0x84;
pub const EXT_THERMAL_ZONE: u8 = 0x85;
pub const EXT_INDEX_FIELD: u8 = 0x86;
pub const EXT_BANK_FIELD: u8 = 0x87;

pub const NAME_ROOT_PREFIX: u8 = 0x5C; // '\'
pub const NAME_PARENT_PREFIX: u8 = 0x5E; // '^'
pub const NAME_DUAL_PREFIX: u8 = 0x2E;
pub const NAME_MULTI_PREFIX: u8 = 0x2F;
pub const NAME_NULL: u8 = 0x00;

pub fn is_lead_name_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_uppercase() || b.is_ascii_lowercase()
}

pub fn is_name_char(b: u8) -> bool {
    is_lead_name_char(b) || b.is_ascii_digit()
}

/// Pack a 7-character EISA ID (e.g. `"PNP0C31"`) into its `_HID` DWORD form.
pub fn eisa_id_to_u32(id: &str) -> Option<u32> {
    let bytes = id.as_bytes();
    if bytes.len() != 7 {
        return None;
    }
    let c1 = bytes[0];
    let c2 = bytes[1];
    let c3 = bytes[2];
    if !c1.is_ascii_uppercase() || !c2.is_ascii_uppercase() || !c3.is_ascii_uppercase() {
        return None;
    }

    fn hex_val(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'A'..=b'F' => Some(c - b'A' + 10),
            b'a'..=b'f' => Some(c - b'a' + 10),
            _ => None,
        }
    }

    let b0 = ((c1 - b'@') << 2) | ((c2 - b'@') >> 3);
    let b1 = (((c2 - b'@') & 0x07) << 5) | (c3 - b'@');
    let b2 = (hex_val(bytes[3])? << 4) | hex_val(bytes[4])?;
    let b3 = (hex_val(bytes[5])? << 4) | hex_val(bytes[6])?;
    Some(u32::from_le_bytes([b0, b1, b2, b3]))
}

/// Unpack an `_HID` DWORD back into its textual EISA form.
pub fn eisa_id_to_string(id: u32) -> Option<String> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let [b0, b1, b2, b3] = id.to_le_bytes();

    let c1 = (b0 >> 2) + b'@';
    let c2 = (((b0 & 0x03) << 3) | (b1 >> 5)) + b'@';
    let c3 = (b1 & 0x1F) + b'@';
    if !c1.is_ascii_uppercase() || !c2.is_ascii_uppercase() || !c3.is_ascii_uppercase() {
        return None;
    }

    let out = [
        c1,
        c2,
        c3,
        HEX[(b2 >> 4) as usize],
        HEX[(b2 & 0x0F) as usize],
        HEX[(b3 >> 4) as usize],
        HEX[(b3 & 0x0F) as usize],
    ];
    Some(String::from_utf8(out.to_vec()).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eisa_round_trip() {
        for id in ["PNP0C31", "PNP0A08", "MSFT0000"] {
            // MSFT0101-style 8-char ACPI IDs are not EISA-packable.
            if id.len() != 7 {
                assert_eq!(eisa_id_to_u32(id), None);
                continue;
            }
            let packed = eisa_id_to_u32(id).unwrap();
            assert_eq!(eisa_id_to_string(packed).unwrap(), id);
        }
    }

    #[test]
    fn eisa_rejects_lowercase_vendor() {
        assert_eq!(eisa_id_to_u32("pnp0c31"), None);
    }
}
