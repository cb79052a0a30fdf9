//! Scanline renderer. Each visible line is drawn in one pass at dot 0:
//! background first (recording per-pixel opacity), then sprites, with
//! sprite-zero hit and overflow detected along the way.

use super::frame::SYSTEM_PALETTE;
use super::registers::{PpuMask, PpuStatus};
use super::Ppu;
use crate::cartridge::mapper::Mapper;

const SPRITES_PER_LINE: usize = 8;

const SPR_ATTR_PALETTE: u8 = 0x03;
const SPR_ATTR_BEHIND_BG: u8 = 0x20;
const SPR_ATTR_FLIP_H: u8 = 0x40;
const SPR_ATTR_FLIP_V: u8 = 0x80;

impl Ppu {
    pub(super) fn render_scanline(&mut self, scanline: u16, mapper: &dyn Mapper) {
        let y = scanline as usize;
        let backdrop = SYSTEM_PALETTE[(self.palette_ram[0] & 0x3F) as usize];

        let mut bg_opaque = [false; 256];
        if self.mask.contains(PpuMask::SHOW_BG) {
            self.render_background(y, mapper, &mut bg_opaque);
        } else {
            for x in 0..256 {
                self.frame.set_pixel(x, y, backdrop);
            }
        }

        if self.mask.contains(PpuMask::SHOW_SPR) {
            self.render_sprites(y, mapper, &bg_opaque);
        }
    }

    /// Walk the nametables for one line using the loopy V register as it
    /// stands at dot 0 (fine Y already incremented, horizontal bits
    /// already reloaded by the previous line).
    fn render_background(&mut self, y: usize, mapper: &dyn Mapper, bg_opaque: &mut [bool; 256]) {
        let backdrop = SYSTEM_PALETTE[(self.palette_ram[0] & 0x3F) as usize];
        let clip_left = !self.mask.contains(PpuMask::SHOW_BG_LEFT);
        let fine_y = (self.v >> 12) & 0x7;
        let pattern_base = self.ctrl.bg_pattern_table();

        let mut v = self.v;
        let mut pattern_lo = 0u8;
        let mut pattern_hi = 0u8;
        let mut palette = 0u8;
        let mut primed = false;

        for x in 0..256usize {
            let shifted = x + self.fine_x as usize;
            if shifted % 8 == 0 && primed {
                increment_coarse_x(&mut v);
                primed = false;
            }
            if !primed {
                let tile = self.internal_read(0x2000 | (v & 0x0FFF), mapper);
                let attr_addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
                let attr = self.internal_read(attr_addr, mapper);
                let quadrant = ((v >> 4) & 4) | (v & 2);
                palette = (attr >> quadrant) & 0x03;

                let pattern_addr = pattern_base + tile as u16 * 16 + fine_y;
                pattern_lo = mapper.chr_read(pattern_addr);
                pattern_hi = mapper.chr_read(pattern_addr + 8);
                primed = true;
            }

            let bit = 7 - (shifted % 8);
            let pixel = ((pattern_hi >> bit) & 1) << 1 | ((pattern_lo >> bit) & 1);

            if pixel == 0 || (clip_left && x < 8) {
                self.frame.set_pixel(x, y, backdrop);
            } else {
                bg_opaque[x] = true;
                let color = self.palette_ram[(palette * 4 + pixel) as usize] & 0x3F;
                self.frame.set_pixel(x, y, SYSTEM_PALETTE[color as usize]);
            }
        }
    }

    fn render_sprites(&mut self, y: usize, mapper: &dyn Mapper, bg_opaque: &[bool; 256]) {
        let height = self.ctrl.sprite_height();
        let tall = height == 16;
        let clip_left = !self.mask.contains(PpuMask::SHOW_SPR_LEFT);

        // Evaluation: first 8 sprites on this line, in OAM order
        let mut on_line: Vec<usize> = Vec::with_capacity(SPRITES_PER_LINE);
        for i in 0..64 {
            let top = self.oam[i * 4] as usize + 1;
            if y >= top && y < top + height as usize {
                if on_line.len() == SPRITES_PER_LINE {
                    self.status.insert(PpuStatus::SPRITE_OVERFLOW);
                    break;
                }
                on_line.push(i);
            }
        }

        // Lower OAM index wins the pixel; iterate in order and let the
        // first opaque sprite claim each slot
        let mut claimed = [false; 256];
        for &i in &on_line {
            let top = self.oam[i * 4] as usize + 1;
            let tile = self.oam[i * 4 + 1];
            let attr = self.oam[i * 4 + 2];
            let left = self.oam[i * 4 + 3] as usize;

            let mut row = (y - top) as u16;
            if attr & SPR_ATTR_FLIP_V != 0 {
                row = height - 1 - row;
            }

            let pattern_addr = if tall {
                let table = (tile as u16 & 1) * 0x1000;
                let mut index = tile as u16 & 0xFE;
                if row >= 8 {
                    index += 1;
                    row -= 8;
                }
                table + index * 16 + row
            } else {
                self.ctrl.sprite_pattern_table() + tile as u16 * 16 + row
            };
            let pattern_lo = mapper.chr_read(pattern_addr);
            let pattern_hi = mapper.chr_read(pattern_addr + 8);

            for px in 0..8usize {
                let x = left + px;
                if x >= 256 || claimed[x] {
                    continue;
                }
                let bit = if attr & SPR_ATTR_FLIP_H != 0 { px } else { 7 - px };
                let pixel = ((pattern_hi >> bit) & 1) << 1 | ((pattern_lo >> bit) & 1);
                if pixel == 0 || (clip_left && x < 8) {
                    continue;
                }
                claimed[x] = true;

                if i == 0
                    && bg_opaque[x]
                    && x != 255
                    && self.mask.contains(PpuMask::SHOW_BG)
                {
                    self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                }

                if attr & SPR_ATTR_BEHIND_BG != 0 && bg_opaque[x] {
                    continue;
                }
                let palette = SPR_ATTR_PALETTE & attr;
                let color = self.palette_ram[(0x10 + palette * 4 + pixel) as usize] & 0x3F;
                self.frame.set_pixel(x, y, SYSTEM_PALETTE[color as usize]);
            }
        }
    }
}

/// Increment coarse X in a loopy address, wrapping into the adjacent
/// horizontal nametable.
fn increment_coarse_x(v: &mut u16) {
    if *v & 0x001F == 31 {
        *v &= !0x001F;
        *v ^= 0x0400;
    } else {
        *v += 1;
    }
}
