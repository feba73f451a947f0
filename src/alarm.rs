//! Alarm bitmap decoding.
//!
//! Registers 306-307 expose a 32-bit alarm bitmap. The assignments below come
//! from the MXR6020B manual; bits not listed are reserved and are omitted
//! from decoded output.

/// Bit index to description, ascending by bit.
pub const ALARM_BITS: [(u8, &str); 16] = [
    (0, "Power failure"),
    (1, "Power protection"),
    (4, "Input undervoltage"),
    (5, "Input overvoltage"),
    (6, "Input phase loss"),
    (10, "Serious uneven flow"),
    (12, "Address duplication"),
    (13, "Output status (0:on,1:off)"),
    (14, "Power derating"),
    (15, "Temperature derating"),
    (16, "AC derating"),
    (17, "Output overvoltage"),
    (18, "Output undervoltage"),
    (19, "Output short"),
    (20, "Over temperature"),
    (21, "Low temperature"),
];

/// Description for a single alarm bit, if the manual assigns one.
pub fn describe(bit: u8) -> Option<&'static str> {
    ALARM_BITS
        .iter()
        .find(|(b, _)| *b == bit)
        .map(|(_, description)| *description)
}

/// Decode an alarm bitmap into `"bit{N}: {description}"` entries, in
/// ascending bit order. Reserved bits are omitted.
pub fn decode_alarms(mask: u32) -> Vec<String> {
    ALARM_BITS
        .iter()
        .filter(|(bit, _)| mask & (1u32 << bit) != 0)
        .map(|(bit, description)| format!("bit{bit}: {description}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_alarms() {
        assert!(decode_alarms(0).is_empty());
    }

    #[test]
    fn test_known_bits_ascending() {
        let alarms = decode_alarms((1 << 0) | (1 << 17));
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0], "bit0: Power failure");
        assert_eq!(alarms[1], "bit17: Output overvoltage");
    }

    #[test]
    fn test_reserved_bits_omitted() {
        // Bits 2, 3 and anything above 21 are reserved
        assert!(decode_alarms((1 << 2) | (1 << 3) | (1 << 31)).is_empty());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(0), Some("Power failure"));
        assert_eq!(describe(21), Some("Low temperature"));
        assert_eq!(describe(2), None);
    }
}
