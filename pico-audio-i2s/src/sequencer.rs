//! The I2S bit sequencer program and its clock divider.
//!
//! The program shifts one data bit per two sequencer cycles and drives the
//! two clock lines with side-set: bit 0 is BCLK on `clock_pin_base`, bit 1
//! is LRCLK on `clock_pin_base + 1`. Data changes while BCLK is low and is
//! sampled on the rising edge. LRCLK leads the data by one bit as I2S
//! requires, so the LSB of each channel goes out in the next channel's
//! LRCLK phase.
//!
//! ```text
//!   LRCLK  ____________________/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾\_____
//!   BCLK   _/‾\_/‾\_ ... _/‾\_/‾\_/‾\_ ... _/‾\_/‾\_/‾\_
//!   DATA    L31  L30      L1   L0   R31      R1   R0  L31
//! ```
//!
//! The loop counter is reloaded from Y, which holds `resolution - 2`, so one
//! program serves 8, 16 and 32-bit output. Samples arrive through the TX
//! FIFO with autopull, 32 bits at a time, shifted out MSB first.

use crate::error::SetupError;

/// Cycles of the sequencer clock per output bit.
pub const CYCLES_PER_BIT: u32 = 2;

/// Channels on the wire. The output is always stereo.
pub const WIRE_CHANNELS: u32 = 2;

/// Autopull threshold in bits.
pub const PULL_THRESHOLD: u8 = 32;

/// The assembled sequencer program plus its entry offset.
pub struct I2sProgram {
    program: pio::Program<{ pio::RP2040_MAX_PROGRAM_SIZE }>,
    entry_point: u8,
}

impl I2sProgram {
    pub fn new() -> Self {
        let assembled = pio_proc::pio_asm!(
            ".side_set 2"
            "left_loop:"
            "    out pins, 1          side 0b00"
            "    jmp x-- left_loop    side 0b01"
            "    out pins, 1          side 0b10"
            "    mov x, y             side 0b11"
            "right_loop:"
            "    out pins, 1          side 0b10"
            "    jmp x-- right_loop   side 0b11"
            "    out pins, 1          side 0b00"
            "public entry_point:"
            "    mov x, y             side 0b01"
        );
        I2sProgram {
            entry_point: assembled.public_defines.entry_point as u8,
            program: assembled.program,
        }
    }

    pub fn program(&self) -> &pio::Program<{ pio::RP2040_MAX_PROGRAM_SIZE }> {
        &self.program
    }

    /// Offset of the first instruction to execute, relative to the load
    /// address.
    pub fn entry_point(&self) -> u8 {
        self.entry_point
    }
}

impl Default for I2sProgram {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a sequencer backend needs to start the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerSetup {
    pub state_machine: u8,
    pub data_pin: u8,
    /// BCLK; LRCLK is the next pin up.
    pub clock_pin_base: u8,
    /// Bits per channel on the wire: 8, 16 or 32.
    pub resolution: u8,
    pub entry_point: u8,
}

impl SequencerSetup {
    pub fn bclk_pin(&self) -> u8 {
        self.clock_pin_base
    }

    pub fn lrclk_pin(&self) -> u8 {
        self.clock_pin_base + 1
    }

    /// Value Y must hold before the program starts.
    pub fn counter_reload(&self) -> u8 {
        self.resolution - 2
    }

    /// `set y, <counter_reload>`, to be executed once before jumping to the
    /// entry point.
    pub fn preload_instruction(&self) -> u16 {
        pio::InstructionOperands::SET {
            destination: pio::SetDestination::Y,
            data: self.counter_reload(),
        }
        .encode()
    }

    /// `jmp <load_offset + entry_point>`.
    pub fn start_instruction(&self, load_offset: u8) -> u16 {
        pio::InstructionOperands::JMP {
            condition: pio::JmpCondition::Always,
            address: load_offset + self.entry_point,
        }
        .encode()
    }
}

/// How the fractional part of the divider is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DividerMode {
    /// 16.8 fixed point. Exact average rate, with cycle-to-cycle jitter.
    #[default]
    Fractional,
    /// Integer part only. No jitter, but the rate is rounded up.
    Integer,
}

/// Sequencer clock divider in 16.8 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDivider {
    pub int: u16,
    pub frac: u8,
}

impl ClockDivider {
    /// Divider that makes the sequencer emit `sample_rate` stereo frames per
    /// second at `resolution` bits per channel.
    pub fn compute(
        system_clock_hz: u32,
        sample_rate: u32,
        resolution: u32,
        mode: DividerMode,
    ) -> Result<Self, SetupError> {
        let bit_cycles_per_second =
            sample_rate as u64 * resolution as u64 * WIRE_CHANNELS as u64 * CYCLES_PER_BIT as u64;
        if bit_cycles_per_second == 0 {
            return Err(SetupError::DividerOutOfRange);
        }
        let mut raw = (system_clock_hz as u64 * 256) / bit_cycles_per_second;
        if mode == DividerMode::Integer {
            raw &= !0xFF;
        }
        if !(0x100..0x100_0000).contains(&raw) {
            return Err(SetupError::DividerOutOfRange);
        }
        Ok(Self::from_raw(raw as u32))
    }

    /// From a 16.8 fixed-point value.
    pub const fn from_raw(raw: u32) -> Self {
        ClockDivider {
            int: (raw >> 8) as u16,
            frac: raw as u8,
        }
    }

    /// 16.8 fixed-point value.
    pub const fn raw(&self) -> u32 {
        ((self.int as u32) << 8) | self.frac as u32
    }

    /// Resulting sequencer clock.
    pub fn sequencer_hz(&self, system_clock_hz: u32) -> u32 {
        ((system_clock_hz as u64 * 256) / self.raw() as u64) as u32
    }
}
