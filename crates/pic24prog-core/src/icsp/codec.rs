//! Packing of 24-bit instruction words into 16-bit working registers
//!
//! Four instruction words travel through six W registers: the low 16 bits
//! of each word occupy one register and the upper bytes of two neighbouring
//! words share the register between them.
//!
//! ```text
//! W0 = w0[15:0]
//! W1 = w1[23:16] : w0[23:16]
//! W2 = w1[15:0]
//! W3 = w2[15:0]
//! W4 = w3[23:16] : w2[23:16]
//! W5 = w3[15:0]
//! ```

/// Pack four 24-bit words into six register values
pub fn pack(words: &[u32; 4]) -> [u16; 6] {
    let [w0, w1, w2, w3] = *words;
    [
        (w0 & 0xFFFF) as u16,
        (((w1 & 0xFF_0000) >> 8) | ((w0 & 0xFF_0000) >> 16)) as u16,
        (w1 & 0xFFFF) as u16,
        (w2 & 0xFFFF) as u16,
        (((w3 & 0xFF_0000) >> 8) | ((w2 & 0xFF_0000) >> 16)) as u16,
        (w3 & 0xFFFF) as u16,
    ]
}

/// Unpack six register values into four 24-bit words
pub fn unpack(regs: &[u16; 6]) -> [u32; 4] {
    let r: [u32; 6] = regs.map(u32::from);
    [
        ((r[1] & 0x00FF) << 16) | r[0],
        ((r[1] & 0xFF00) << 8) | r[2],
        ((r[4] & 0x00FF) << 16) | r[3],
        ((r[4] & 0xFF00) << 8) | r[5],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let regs = pack(&[0x11_2233, 0x44_5566, 0x77_8899, 0xAA_BBCC]);
        assert_eq!(regs, [0x2233, 0x4411, 0x5566, 0x8899, 0xAA77, 0xBBCC]);
    }

    #[test]
    fn test_unpack_inverts_pack() {
        let cases = [
            [0, 0, 0, 0],
            [0xFF_FFFF, 0xFF_FFFF, 0xFF_FFFF, 0xFF_FFFF],
            [0x00_0001, 0x01_0000, 0x80_8080, 0x7F_7F7F],
            [0x12_3456, 0xAB_CDEF, 0x00_FF00, 0xFF_00FF],
        ];
        for words in cases {
            assert_eq!(unpack(&pack(&words)), words);
        }
    }

    #[test]
    fn test_upper_byte_ignored() {
        let regs = pack(&[0xFF12_3456, 0, 0, 0]);
        assert_eq!(unpack(&regs)[0], 0x12_3456);
    }
}
