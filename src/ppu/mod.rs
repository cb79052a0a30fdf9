pub mod frame;
pub mod registers;
pub mod render;

use self::frame::Frame;
use self::registers::{PpuCtrl, PpuMask, PpuStatus};

use crate::cartridge::mapper::Mapper;
use crate::cartridge::Mirroring;
use crate::state::{PpuState, StateError};

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
const VBLANK_SCANLINE: u16 = 241;
const PRE_RENDER_SCANLINE: u16 = 261;
/// Dot at which scanline-counting mappers are notified (approximates the
/// CHR A12 rising edge during sprite fetches).
const SCANLINE_IRQ_DOT: u16 = 260;

/// The 2C02 raster engine. Pattern data always comes from the mapper, and
/// nametable mirroring is asked of the mapper per access, so bank-switched
/// CHR and runtime mirroring changes behave correctly.
pub struct Ppu {
    // Memories
    pub palette_ram: [u8; 32],
    pub vram: [u8; 2048],
    pub oam: [u8; 256],

    // Registers
    pub ctrl: PpuCtrl,
    pub mask: PpuMask,
    pub status: PpuStatus,
    pub oam_addr: u8,

    // Loopy internal registers
    pub v: u16,     // current VRAM address
    pub t: u16,     // temporary VRAM address
    pub fine_x: u8, // fine X scroll
    pub w: bool,    // write toggle

    // $2007 read buffer
    pub read_buffer: u8,

    // Raster position
    pub scanline: u16,
    pub dot: u16,
    pub odd_frame: bool,
    pub frame_count: u64,

    pub nmi_pending: bool,

    // Output
    pub frame: Frame,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Ppu {
            palette_ram: [0; 32],
            vram: [0; 2048],
            oam: [0; 256],
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            v: 0,
            t: 0,
            fine_x: 0,
            w: false,
            read_buffer: 0,
            scanline: 0,
            dot: 0,
            odd_frame: false,
            frame_count: 0,
            nmi_pending: false,
            frame: Frame::new(),
        }
    }

    /// Documented post-reset state: control/mask cleared, toggle cleared,
    /// raster restarted. Memories are left alone, as on hardware.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.w = false;
        self.read_buffer = 0;
        self.v = 0;
        self.t = 0;
        self.fine_x = 0;
        self.scanline = 0;
        self.dot = 0;
        self.odd_frame = false;
        self.nmi_pending = false;
        self.frame.clear();
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask.contains(PpuMask::SHOW_BG) || self.mask.contains(PpuMask::SHOW_SPR)
    }

    /// Increment the fine Y scroll in V, wrapping through coarse Y and
    /// the vertical nametable bit.
    fn increment_v_y(&mut self) {
        if (self.v & 0x7000) != 0x7000 {
            self.v += 0x1000;
        } else {
            self.v &= !0x7000;
            let mut coarse_y = (self.v & 0x03E0) >> 5;
            if coarse_y == 29 {
                coarse_y = 0;
                self.v ^= 0x0800; // switch vertical nametable
            } else if coarse_y == 31 {
                coarse_y = 0;
            } else {
                coarse_y += 1;
            }
            self.v = (self.v & !0x03E0) | (coarse_y << 5);
        }
    }

    /// Advance one PPU dot. Returns true when the frame just became
    /// complete (VBlank entry).
    pub fn tick(&mut self, mapper: &mut dyn Mapper) -> bool {
        let mut frame_complete = false;
        let visible = self.scanline < 240;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;

        // Scanline renderer runs once, at the start of each visible line
        if visible && self.dot == 0 {
            self.render_scanline(self.scanline, &*mapper);
        }

        if (visible || pre_render) && self.rendering_enabled() {
            // Dot 256: increment fine Y
            if self.dot == 256 {
                self.increment_v_y();
            }
            // Dot 257: copy horizontal bits from T to V
            if self.dot == 257 {
                self.v = (self.v & !0x041F) | (self.t & 0x041F);
            }
            // Pre-render dots 280-304: copy vertical bits from T to V
            if pre_render && (280..=304).contains(&self.dot) {
                self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
            }
            // Sprite-fetch window: clock scanline-counting mappers
            if self.dot == SCANLINE_IRQ_DOT {
                mapper.notify_scanline();
            }
        }

        // Pre-render line: clear the per-frame status flags
        if pre_render && self.dot == 1 {
            self.status.remove(PpuStatus::VBLANK);
            self.status.remove(PpuStatus::SPRITE_ZERO_HIT);
            self.status.remove(PpuStatus::SPRITE_OVERFLOW);
        }

        // VBlank entry
        if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
            self.status.insert(PpuStatus::VBLANK);
            if self.ctrl.contains(PpuCtrl::NMI_ENABLE) {
                self.nmi_pending = true;
            }
            frame_complete = true;
        }

        // Odd frames drop the last dot of the pre-render line while
        // rendering is on (the NTSC skipped-dot quirk)
        let line_dots = if pre_render && self.odd_frame && self.rendering_enabled() {
            DOTS_PER_SCANLINE - 1
        } else {
            DOTS_PER_SCANLINE
        };

        self.dot += 1;
        if self.dot >= line_dots {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
                self.frame_count += 1;
            }
        }

        frame_complete
    }

    /// CPU read from a PPU register ($2000-$2007, mirrored through $3FFF).
    pub fn cpu_read(&mut self, addr: u16, mapper: &dyn Mapper) -> u8 {
        match addr {
            0x2002 => {
                // PPUSTATUS: reading clears VBlank and the write toggle
                let val = self.status.bits() | (self.read_buffer & 0x1F);
                self.status.remove(PpuStatus::VBLANK);
                self.w = false;
                val
            }
            0x2004 => self.oam[self.oam_addr as usize],
            0x2007 => {
                let addr = self.v & 0x3FFF;
                self.v = self.v.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;

                if addr >= 0x3F00 {
                    // Palette reads bypass the buffer, which picks up the
                    // nametable byte underneath instead
                    let result = self.palette_read(addr);
                    self.read_buffer = self.internal_read(addr - 0x1000, mapper);
                    result
                } else {
                    let result = self.read_buffer;
                    self.read_buffer = self.internal_read(addr, mapper);
                    result
                }
            }
            _ => 0, // write-only registers
        }
    }

    /// CPU write to a PPU register ($2000-$2007, mirrored through $3FFF).
    pub fn cpu_write(&mut self, addr: u16, val: u8, mapper: &mut dyn Mapper) {
        match addr {
            0x2000 => {
                let was_nmi = self.ctrl.contains(PpuCtrl::NMI_ENABLE);
                self.ctrl = PpuCtrl::from_bits_truncate(val);
                // Enabling NMI mid-VBlank raises one immediately
                if !was_nmi
                    && self.ctrl.contains(PpuCtrl::NMI_ENABLE)
                    && self.status.contains(PpuStatus::VBLANK)
                {
                    self.nmi_pending = true;
                }
                self.t = (self.t & 0xF3FF) | ((val as u16 & 0x03) << 10);
            }
            0x2001 => {
                self.mask = PpuMask::from_bits_truncate(val);
            }
            0x2003 => {
                self.oam_addr = val;
            }
            0x2004 => {
                self.oam[self.oam_addr as usize] = val;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            0x2005 => {
                if !self.w {
                    // First write: X scroll
                    self.fine_x = val & 0x07;
                    self.t = (self.t & 0xFFE0) | ((val as u16) >> 3);
                } else {
                    // Second write: Y scroll
                    self.t = (self.t & 0x8C1F)
                        | (((val as u16) & 0x07) << 12)
                        | (((val as u16) >> 3) << 5);
                }
                self.w = !self.w;
            }
            0x2006 => {
                if !self.w {
                    self.t = (self.t & 0x00FF) | ((val as u16 & 0x3F) << 8);
                } else {
                    self.t = (self.t & 0xFF00) | val as u16;
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            0x2007 => {
                let addr = self.v & 0x3FFF;
                self.v = self.v.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
                self.internal_write(addr, val, mapper);
            }
            _ => {}
        }
    }

    /// Read from the PPU's own address space ($0000-$3FFF).
    pub fn internal_read(&self, addr: u16, mapper: &dyn Mapper) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => mapper.chr_read(addr),
            0x2000..=0x3EFF => {
                let mirrored = self.mirror_vram_addr(addr, mapper.mirroring());
                self.vram[mirrored]
            }
            _ => self.palette_read(addr),
        }
    }

    fn internal_write(&mut self, addr: u16, val: u8, mapper: &mut dyn Mapper) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => mapper.chr_write(addr, val),
            0x2000..=0x3EFF => {
                let mirrored = self.mirror_vram_addr(addr, mapper.mirroring());
                self.vram[mirrored] = val;
            }
            _ => self.palette_write(addr, val),
        }
    }

    fn palette_read(&self, addr: u16) -> u8 {
        self.palette_ram[Self::palette_index(addr)]
    }

    fn palette_write(&mut self, addr: u16, val: u8) {
        self.palette_ram[Self::palette_index(addr)] = val;
    }

    fn palette_index(addr: u16) -> usize {
        let mut index = (addr as usize) & 0x1F;
        // $3F10/$3F14/$3F18/$3F1C mirror the background entries
        if index >= 0x10 && index % 4 == 0 {
            index -= 0x10;
        }
        index
    }

    fn mirror_vram_addr(&self, addr: u16, mirroring: Mirroring) -> usize {
        let addr = (addr - 0x2000) as usize & 0x0FFF; // fold mirrors above $2FFF
        let nametable = addr / 0x400;
        let offset = addr % 0x400;
        let mirrored_nt = match mirroring {
            Mirroring::Horizontal => nametable / 2,
            Mirroring::Vertical => nametable % 2,
            Mirroring::FourScreen => nametable % 2, // only 2KB of internal VRAM
            Mirroring::OneScreenLower => 0,
            Mirroring::OneScreenUpper => 1,
        };
        mirrored_nt * 0x400 + offset
    }

    // --- Save-state support ---

    pub fn snapshot(&self) -> PpuState {
        PpuState {
            ctrl: self.ctrl.bits(),
            mask: self.mask.bits(),
            status: self.status.bits(),
            oam_addr: self.oam_addr,
            v: self.v,
            t: self.t,
            fine_x: self.fine_x,
            w: self.w,
            read_buffer: self.read_buffer,
            scanline: self.scanline,
            dot: self.dot,
            odd_frame: self.odd_frame,
            frame_count: self.frame_count,
            nmi_pending: self.nmi_pending,
            vram: self.vram.to_vec(),
            palette_ram: self.palette_ram.to_vec(),
            oam: self.oam.to_vec(),
        }
    }

    pub fn check_snapshot(state: &PpuState) -> Result<(), StateError> {
        if state.vram.len() != 2048 {
            return Err(StateError::WrongLayout("PPU VRAM length"));
        }
        if state.palette_ram.len() != 32 {
            return Err(StateError::WrongLayout("PPU palette length"));
        }
        if state.oam.len() != 256 {
            return Err(StateError::WrongLayout("PPU OAM length"));
        }
        Ok(())
    }

    /// Apply a snapshot previously validated with `check_snapshot`.
    pub fn restore(&mut self, state: &PpuState) {
        self.ctrl = PpuCtrl::from_bits_truncate(state.ctrl);
        self.mask = PpuMask::from_bits_truncate(state.mask);
        self.status = PpuStatus::from_bits_truncate(state.status);
        self.oam_addr = state.oam_addr;
        self.v = state.v;
        self.t = state.t;
        self.fine_x = state.fine_x;
        self.w = state.w;
        self.read_buffer = state.read_buffer;
        self.scanline = state.scanline;
        self.dot = state.dot;
        self.odd_frame = state.odd_frame;
        self.frame_count = state.frame_count;
        self.nmi_pending = state.nmi_pending;
        self.vram.copy_from_slice(&state.vram);
        self.palette_ram.copy_from_slice(&state.palette_ram);
        self.oam.copy_from_slice(&state.oam);
        self.frame.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::tests::test_cartridge;
    use crate::cartridge::mapper::{Mapper, Nrom};
    use crate::cartridge::Mirroring;

    fn ppu_and_mapper() -> (Ppu, Box<dyn Mapper>) {
        (Ppu::new(), Box::new(Nrom::new(test_cartridge(0, 1, 1))))
    }

    fn tick_to(ppu: &mut Ppu, mapper: &mut dyn Mapper, scanline: u16, dot: u16) {
        while !(ppu.scanline == scanline && ppu.dot == dot) {
            ppu.tick(mapper);
        }
    }

    #[test]
    fn test_raster_bounds_hold_for_two_frames() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        for _ in 0..(89_342 * 2) {
            assert!(ppu.dot < 341);
            assert!(ppu.scanline < 262);
            ppu.tick(mapper.as_mut());
        }
    }

    #[test]
    fn test_frame_is_89342_dots_with_rendering_off() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        for frame in 0..3 {
            let mut dots = 0u32;
            loop {
                ppu.tick(mapper.as_mut());
                dots += 1;
                if ppu.scanline == 0 && ppu.dot == 0 {
                    break;
                }
            }
            assert_eq!(dots, 89_342, "frame {}", frame);
        }
    }

    #[test]
    fn test_odd_frames_skip_one_dot_when_rendering() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        ppu.cpu_write(0x2001, 0x08, mapper.as_mut()); // show background

        let mut lengths = Vec::new();
        for _ in 0..4 {
            let mut dots = 0u32;
            loop {
                ppu.tick(mapper.as_mut());
                dots += 1;
                if ppu.scanline == 0 && ppu.dot == 0 {
                    break;
                }
            }
            lengths.push(dots);
        }
        // First counted frame is even (89,342), then alternating
        assert_eq!(lengths, vec![89_342, 89_341, 89_342, 89_341]);
    }

    #[test]
    fn test_vblank_set_at_241_1_and_cleared_on_pre_render() {
        let (mut ppu, mut mapper) = ppu_and_mapper();

        tick_to(&mut ppu, mapper.as_mut(), 241, 2);
        assert!(ppu.status.contains(PpuStatus::VBLANK));

        tick_to(&mut ppu, mapper.as_mut(), 261, 2);
        assert!(!ppu.status.contains(PpuStatus::VBLANK));
    }

    #[test]
    fn test_status_read_clears_vblank_and_toggle() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        tick_to(&mut ppu, mapper.as_mut(), 241, 2);

        ppu.cpu_write(0x2006, 0x21, mapper.as_mut()); // half an address write
        assert!(ppu.w);

        let status = ppu.cpu_read(0x2002, mapper.as_ref());
        assert_ne!(status & 0x80, 0);
        assert!(!ppu.w);

        let status = ppu.cpu_read(0x2002, mapper.as_ref());
        assert_eq!(status & 0x80, 0); // cleared by the first read
    }

    #[test]
    fn test_nmi_raised_only_when_enabled() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        tick_to(&mut ppu, mapper.as_mut(), 241, 2);
        assert!(!ppu.nmi_pending);

        // Enabling NMI while VBlank is active raises one immediately
        ppu.cpu_write(0x2000, 0x80, mapper.as_mut());
        assert!(ppu.nmi_pending);
    }

    #[test]
    fn test_data_port_read_is_buffered() {
        let (mut ppu, mut mapper) = ppu_and_mapper();

        // Write $AB to $2100 via the data port
        ppu.cpu_write(0x2006, 0x21, mapper.as_mut());
        ppu.cpu_write(0x2006, 0x00, mapper.as_mut());
        ppu.cpu_write(0x2007, 0xAB, mapper.as_mut());

        // Point back and read: first read returns the stale buffer
        ppu.cpu_write(0x2006, 0x21, mapper.as_mut());
        ppu.cpu_write(0x2006, 0x00, mapper.as_mut());
        let _stale = ppu.cpu_read(0x2007, mapper.as_ref());
        assert_eq!(ppu.cpu_read(0x2007, mapper.as_ref()), 0xAB);
    }

    #[test]
    fn test_palette_mirrors_3f10_to_3f00() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        ppu.cpu_write(0x2006, 0x3F, mapper.as_mut());
        ppu.cpu_write(0x2006, 0x10, mapper.as_mut());
        ppu.cpu_write(0x2007, 0x2A, mapper.as_mut());
        assert_eq!(ppu.palette_ram[0], 0x2A);
    }

    #[test]
    fn test_vram_mirroring_modes() {
        let ppu = Ppu::new();
        // Horizontal: $2000 and $2400 share a table
        assert_eq!(
            ppu.mirror_vram_addr(0x2005, Mirroring::Horizontal),
            ppu.mirror_vram_addr(0x2405, Mirroring::Horizontal)
        );
        // Vertical: $2000 and $2800 share a table
        assert_eq!(
            ppu.mirror_vram_addr(0x2005, Mirroring::Vertical),
            ppu.mirror_vram_addr(0x2805, Mirroring::Vertical)
        );
        // One-screen: all four collapse
        assert_eq!(
            ppu.mirror_vram_addr(0x2005, Mirroring::OneScreenUpper),
            ppu.mirror_vram_addr(0x2C05, Mirroring::OneScreenUpper)
        );
    }

    #[test]
    fn test_scanline_notify_reaches_mapper() {
        use crate::cartridge::mapper::Mmc3;

        let mut ppu = Ppu::new();
        let mut mapper = Mmc3::new(test_cartridge(4, 2, 1));
        mapper.prg_write(0xC000, 0); // latch 0: IRQ on first clock
        mapper.prg_write(0xC001, 0);
        mapper.prg_write(0xE001, 0);

        // Rendering off: no notifications, no IRQ
        for _ in 0..89_342 {
            ppu.tick(&mut mapper);
        }
        assert!(!mapper.poll_irq());

        ppu.cpu_write(0x2001, 0x08, &mut mapper);
        for _ in 0..89_342 {
            ppu.tick(&mut mapper);
        }
        assert!(mapper.poll_irq());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut ppu, mut mapper) = ppu_and_mapper();
        ppu.cpu_write(0x2000, 0x90, mapper.as_mut());
        ppu.cpu_write(0x2005, 0x15, mapper.as_mut());
        tick_to(&mut ppu, mapper.as_mut(), 100, 17);
        ppu.vram[33] = 0x44;

        let snap = ppu.snapshot();
        Ppu::check_snapshot(&snap).unwrap();

        let mut restored = Ppu::new();
        restored.restore(&snap);
        assert_eq!(restored.ctrl, ppu.ctrl);
        assert_eq!(restored.t, ppu.t);
        assert_eq!(restored.scanline, 100);
        assert_eq!(restored.dot, 17);
        assert_eq!(restored.vram[33], 0x44);
    }
}
