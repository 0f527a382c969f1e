//! Test doubles for the hardware seams.

use crate::hal::{regs, CoreRegisters, DmaEngine, DmaError, DmaMode};
use crate::plan::Chunk;

/// Recording DMA engine.
#[derive(Debug)]
pub struct MockDma {
    pub mode: DmaMode,
    pub programmed: Vec<Vec<Chunk>>,
    pub start_calls: u32,
    pub stop_calls: u32,
    pub requested: u32,
    pub remaining: u32,
    pub reject_program: bool,
}

impl MockDma {
    pub fn new(mode: DmaMode) -> Self {
        Self {
            mode,
            programmed: Vec::new(),
            start_calls: 0,
            stop_calls: 0,
            requested: 0,
            remaining: 0,
            reject_program: false,
        }
    }

    pub fn scatter_gather() -> Self {
        Self::new(DmaMode::ScatterGather)
    }

    pub fn rearm() -> Self {
        Self::new(DmaMode::RearmPerChunk)
    }
}

impl DmaEngine for MockDma {
    fn program(&mut self, chunks: &[Chunk], _channel: u8) -> Result<(), DmaError> {
        if self.reject_program {
            return Err(DmaError::ProgramRejected);
        }
        self.programmed.push(chunks.to_vec());
        Ok(())
    }

    fn start(&mut self, _channel: u8) {
        self.start_calls += 1;
    }

    fn stop(&mut self, _channel: u8) {
        self.stop_calls += 1;
    }

    fn requested_count(&self, _channel: u8) -> u32 {
        self.requested
    }

    fn remaining_count(&self, _channel: u8) -> u32 {
        self.remaining
    }

    fn mode(&self) -> DmaMode {
        self.mode
    }
}

/// Register file that counts soft-reset pulses.
#[derive(Debug, Default)]
pub struct MockRegs {
    pub values: [u32; 8],
    pub reset_pulses: u32,
}

impl CoreRegisters for MockRegs {
    fn read_reg(&mut self, offset: u32) -> u32 {
        self.values[(offset / 4) as usize % 8]
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        if offset == regs::CORE_CONTROL && value & regs::CONTROL_SOFT_RESET != 0 {
            self.reset_pulses += 1;
        }
        self.values[(offset / 4) as usize % 8] = value;
    }
}
