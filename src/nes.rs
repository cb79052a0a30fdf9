use log::warn;

use crate::bus::Bus;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::cpu::Cpu;
use crate::ppu::frame::Frame;
use crate::state::{SaveState, StateError, STATE_VERSION};

/// Instruction budget per frame. A frame is ~29,781 CPU cycles and the
/// shortest instruction is 2 cycles, so a healthy frame can never come
/// close to this.
const FRAME_STEP_LIMIT: u32 = 40_000;

/// The whole machine, stepped a frame at a time. Headless: the only
/// outputs are the frame buffer and whatever the caller reads back.
pub struct Nes {
    pub cpu: Cpu,
    pub bus: Bus,
    mapper_id: u8,
}

impl Nes {
    pub fn new(cartridge: Cartridge) -> Result<Self, CartridgeError> {
        let mapper_id = cartridge.mapper_id;
        let mut nes = Nes {
            cpu: Cpu::new(),
            bus: Bus::new(cartridge)?,
            mapper_id,
        };
        nes.cpu.reset(&mut nes.bus);
        Ok(nes)
    }

    /// Power-cycle semantics: RAM cleared, every unit back to its
    /// post-reset state, PC from the reset vector.
    pub fn reset(&mut self) {
        self.bus.ram = [0; 2048];
        self.bus.ppu.reset();
        self.bus.apu.reset();
        self.bus.controller1 = Default::default();
        self.bus.controller2 = Default::default();
        self.bus.dma_stall = 0;
        self.cpu.reset(&mut self.bus);
    }

    /// Latch pad state, run one full frame, hand back the rendered image.
    pub fn step(&mut self, pads: &[u8; 2]) -> &Frame {
        self.bus.controller1.buttons = pads[0];
        self.bus.controller2.buttons = pads[1];
        self.step_frame();
        &self.bus.ppu.frame
    }

    pub fn frame(&self) -> &Frame {
        &self.bus.ppu.frame
    }

    /// Run instructions until the PPU signals VBlank. Returns false if
    /// the safety bound was hit (a wedged test ROM, not normal play).
    pub fn step_frame(&mut self) -> bool {
        for _ in 0..FRAME_STEP_LIMIT {
            if self.clock() {
                return true;
            }
        }
        warn!(
            "frame did not complete within {} instructions; aborting frame",
            FRAME_STEP_LIMIT
        );
        false
    }

    /// Run a single instruction with its catch-up; instruction-level
    /// stepping for tracing and debuggers. Returns true when the frame
    /// completed.
    pub fn step_instruction(&mut self) -> bool {
        self.clock()
    }

    /// One CPU instruction, then PPU/APU catch-up and interrupt delivery.
    /// Returns true when the PPU entered VBlank during the catch-up.
    fn clock(&mut self) -> bool {
        let cpu_cycles = self.cpu.step(&mut self.bus);

        // An OAM DMA triggered by that instruction halts the CPU; the
        // extra 514th cycle applies when the DMA starts on an odd cycle
        if self.bus.dma_stall > 0 {
            let parity = (self.cpu.cycles % 2 == 1) as u16;
            self.cpu.stall += self.bus.dma_stall + parity;
            self.bus.dma_stall = 0;
        }

        let mut frame_complete = self.catch_up(cpu_cycles as u16);

        // Interrupts are sampled at the instruction boundary: NMI first,
        // then the level-sensitive IRQ sources. The 7-cycle interrupt
        // sequences get their own catch-up so the 3:1 dot ratio holds.
        let mut interrupt_cycles = 0u16;
        if self.bus.ppu.nmi_pending {
            self.bus.ppu.nmi_pending = false;
            interrupt_cycles += self.cpu.nmi(&mut self.bus) as u16;
        }
        if self.bus.mapper.poll_irq() {
            interrupt_cycles += self.cpu.irq(&mut self.bus) as u16;
        }
        if self.bus.apu.irq_pending() {
            interrupt_cycles += self.cpu.irq(&mut self.bus) as u16;
        }
        if interrupt_cycles > 0 {
            frame_complete |= self.catch_up(interrupt_cycles);
        }

        frame_complete
    }

    /// Tick the PPU three dots and the APU once for every CPU cycle.
    fn catch_up(&mut self, cpu_cycles: u16) -> bool {
        let mut frame_complete = false;
        for _ in 0..cpu_cycles * 3 {
            if self.bus.ppu.tick(self.bus.mapper.as_mut()) {
                frame_complete = true;
            }
        }
        for _ in 0..cpu_cycles {
            self.bus.apu.tick();
        }
        frame_complete
    }

    /// Debug read, free of side effects.
    pub fn read_memory(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Debug write through the CPU's view of the bus.
    pub fn write_memory(&mut self, addr: u16, val: u8) {
        self.bus.cpu_write(addr, val);
    }

    // --- Save states ---

    pub fn save_state(&self) -> Result<Vec<u8>, StateError> {
        let state = SaveState {
            version: STATE_VERSION,
            mapper_id: self.mapper_id,
            cpu: self.cpu.snapshot(),
            ram: self.bus.ram.to_vec(),
            ppu: self.bus.ppu.snapshot(),
            apu: self.bus.apu.clone(),
            controllers: [self.bus.controller1.clone(), self.bus.controller2.clone()],
            mapper: self.bus.mapper.save_registers(),
        };
        state.to_bytes()
    }

    /// Restore a state produced by `save_state`. Everything is validated
    /// before any component is touched, so a bad blob leaves the console
    /// exactly as it was.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        let state = SaveState::from_bytes(bytes)?;
        if state.mapper_id != self.mapper_id {
            return Err(StateError::WrongLayout("mapper id"));
        }
        if state.ram.len() != 2048 {
            return Err(StateError::WrongLayout("work RAM length"));
        }
        crate::ppu::Ppu::check_snapshot(&state.ppu)?;

        // Mapper blobs are validated by length before the mapper mutates
        self.bus.mapper.load_registers(&state.mapper)?;
        self.cpu.restore(&state.cpu);
        self.bus.ram.copy_from_slice(&state.ram);
        self.bus.ppu.restore(&state.ppu);
        self.bus.apu = state.apu;
        let [c1, c2] = state.controllers;
        self.bus.controller1 = c1;
        self.bus.controller2 = c2;
        self.bus.dma_stall = 0;
        Ok(())
    }
}
