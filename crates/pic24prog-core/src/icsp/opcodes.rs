//! dsPIC33/PIC24 instruction opcodes used during ICSP
//!
//! Only the handful of instructions the programming scripts need are
//! defined here. Register-parameterised forms are built by the `const fn`
//! helpers at the bottom.

// ============================================================================
// Special function registers (data space addresses)
// ============================================================================

/// Table page register
pub const TBLPAG: u16 = 0x0032;
/// Flash controller command register
pub const NVMCON: u16 = 0x0760;
/// Visibility register shifted out by REGOUT
pub const VISI: u16 = 0x0784;

/// NVMCON write/erase start bit
pub const NVMCON_WR: u16 = 0x8000;
/// NVMCON value: program one 64-word row
pub const NVMCON_ROW_PROGRAM: u16 = 0x4001;
/// NVMCON value: program one word (configuration registers)
pub const NVMCON_WORD_PROGRAM: u16 = 0x4000;
/// NVMCON value: erase all code memory
pub const NVMCON_CHIP_ERASE: u16 = 0x404F;

// ============================================================================
// Fixed instructions
// ============================================================================

/// No operation
pub const NOP: u32 = 0x00_0000;
/// GOTO 0x200 (reset the program counter into a safe location)
pub const GOTO_0X200: u32 = 0x04_0200;
/// MOV W0, TBLPAG
pub const MOV_W0_TBLPAG: u32 = 0x88_0190;
/// MOV W10, NVMCON
pub const MOV_W10_NVMCON: u32 = 0x88_3B0A;
/// MOV NVMCON, W0
pub const MOV_NVMCON_W0: u32 = 0x80_3B00;
/// MOV W0, VISI
pub const MOV_W0_VISI: u32 = 0x88_3C20;
/// CLR W6
pub const CLR_W6: u32 = 0xEB_0300;
/// CLR W7
pub const CLR_W7: u32 = 0xEB_0380;
/// BSET NVMCON, #WR
pub const BSET_NVMCON_WR: u32 = 0xA8_E761;

// ============================================================================
// Table reads (source [W6], destination W0..W5 through [W7])
// ============================================================================

/// TBLRDL [W6], [W7++]
pub const TBLRDL_W6_W7PP: u32 = 0xBA_1B96;
/// TBLRDH.B [W6++], [W7++]
pub const TBLRDHB_W6PP_W7PP: u32 = 0xBA_DBB6;
/// TBLRDH.B [++W6], [W7++]
pub const TBLRDHB_PPW6_W7PP: u32 = 0xBA_DBD6;
/// TBLRDL [W6++], [W7++]
pub const TBLRDL_W6PP_W7PP: u32 = 0xBA_1BB6;

/// Table reads moving two instruction words into three W registers
pub const READ_PAIR: [u32; 4] = [
    TBLRDL_W6_W7PP,
    TBLRDHB_W6PP_W7PP,
    TBLRDHB_PPW6_W7PP,
    TBLRDL_W6PP_W7PP,
];

// ============================================================================
// Table writes (source W0..W5 through [W6], destination [W7])
// ============================================================================

/// TBLWTL [W6++], [W7]
pub const TBLWTL_W6PP_W7: u32 = 0xBB_0BB6;
/// TBLWTH.B [W6++], [W7++]
pub const TBLWTHB_W6PP_W7PP: u32 = 0xBB_DBB6;
/// TBLWTH.B [W6++], [++W7]
pub const TBLWTHB_W6PP_PPW7: u32 = 0xBB_EBB6;
/// TBLWTL [W6++], [W7++]
pub const TBLWTL_W6PP_W7PP: u32 = 0xBB_1BB6;
/// TBLWTL W0, [W7++]
pub const TBLWTL_W0_W7PP: u32 = 0xBB_1B80;

/// Table writes moving three W registers into two instruction latches
pub const WRITE_PAIR: [u32; 4] = [
    TBLWTL_W6PP_W7,
    TBLWTHB_W6PP_W7PP,
    TBLWTHB_W6PP_PPW7,
    TBLWTL_W6PP_W7PP,
];

// ============================================================================
// Parameterised forms
// ============================================================================

/// MOV #lit16, Wd
pub const fn mov_lit16(lit: u16, wd: u8) -> u32 {
    0x20_0000 | ((lit as u32) << 4) | (wd as u32 & 0xF)
}

/// MOV Ws, VISI
pub const fn mov_to_visi(ws: u8) -> u32 {
    MOV_W0_VISI | (ws as u32 & 0xF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mov_lit16_matches_fixed_encodings() {
        assert_eq!(mov_lit16(0x4001, 10), 0x24_001A);
        assert_eq!(mov_lit16(0x404F, 10), 0x24_04FA);
        assert_eq!(mov_lit16(0x4000, 10), 0x24_000A);
        assert_eq!(mov_lit16(0x00F8, 0), 0x20_0F80);
        assert_eq!(mov_lit16(0, 7), 0x20_0007);
    }

    #[test]
    fn test_mov_to_visi() {
        assert_eq!(mov_to_visi(0), MOV_W0_VISI);
        assert_eq!(mov_to_visi(5), 0x88_3C25);
    }
}
