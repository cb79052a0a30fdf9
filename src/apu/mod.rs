pub mod channels;

use serde::{Deserialize, Serialize};

use self::channels::{Noise, Pulse, Triangle};

// NTSC frame sequencer step boundaries, in CPU cycles
const STEP1: u16 = 3729;
const STEP2: u16 = 7457;
const STEP3: u16 = 11186;
const STEP4: u16 = 14915;
const STEP5: u16 = 18641;

/// The 2A03 audio unit. The core cares about its clocks, not its sound:
/// length counters gate the $4015 status bits and the frame sequencer
/// raises the frame IRQ, both of which games poll for timing.
#[derive(Clone, Serialize, Deserialize)]
pub struct Apu {
    pub pulse1: Pulse,
    pub pulse2: Pulse,
    pub triangle: Triangle,
    pub noise: Noise,

    five_step_mode: bool,
    frame_counter: u16,
    irq_inhibit: bool,
    frame_irq: bool,

    // Pulse/noise timers run at half CPU rate
    odd_cycle: bool,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        Apu {
            pulse1: Pulse::new(true),
            pulse2: Pulse::new(false),
            triangle: Triangle::new(),
            noise: Noise::new(),
            five_step_mode: false,
            frame_counter: 0,
            irq_inhibit: true,
            frame_irq: false,
            odd_cycle: false,
        }
    }

    pub fn reset(&mut self) {
        self.write_status(0);
        self.five_step_mode = false;
        self.frame_counter = 0;
        self.irq_inhibit = true;
        self.frame_irq = false;
        self.odd_cycle = false;
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) {
        self.triangle.tick_timer();

        self.odd_cycle = !self.odd_cycle;
        if self.odd_cycle {
            self.pulse1.tick_timer();
            self.pulse2.tick_timer();
            self.noise.tick_timer();
        }

        self.frame_counter += 1;
        self.clock_frame_sequencer();
    }

    fn clock_frame_sequencer(&mut self) {
        let last_step = if self.five_step_mode { STEP5 } else { STEP4 };
        match self.frame_counter {
            STEP1 | STEP3 => self.quarter_frame(),
            STEP2 => {
                self.quarter_frame();
                self.half_frame();
            }
            c if c == last_step => {
                self.quarter_frame();
                self.half_frame();
                // Only the 4-step sequence generates the frame IRQ
                if !self.five_step_mode && !self.irq_inhibit {
                    self.frame_irq = true;
                }
                self.frame_counter = 0;
            }
            _ => {}
        }
    }

    fn quarter_frame(&mut self) {
        self.pulse1.tick_quarter_frame();
        self.pulse2.tick_quarter_frame();
        self.triangle.tick_quarter_frame();
        self.noise.tick_quarter_frame();
    }

    fn half_frame(&mut self) {
        self.pulse1.tick_half_frame();
        self.pulse2.tick_half_frame();
        self.triangle.tick_half_frame();
        self.noise.tick_half_frame();
    }

    /// Level-sensitive frame IRQ line; stays up until $4015 is read or
    /// the inhibit bit is set.
    pub fn irq_pending(&self) -> bool {
        self.frame_irq
    }

    pub fn cpu_write(&mut self, addr: u16, val: u8) {
        match addr {
            0x4000 => self.pulse1.write_control(val),
            0x4001 => self.pulse1.write_sweep(val),
            0x4002 => self.pulse1.write_timer_lo(val),
            0x4003 => self.pulse1.write_timer_hi(val),
            0x4004 => self.pulse2.write_control(val),
            0x4005 => self.pulse2.write_sweep(val),
            0x4006 => self.pulse2.write_timer_lo(val),
            0x4007 => self.pulse2.write_timer_hi(val),
            0x4008 => self.triangle.write_linear(val),
            0x400A => self.triangle.write_timer_lo(val),
            0x400B => self.triangle.write_timer_hi(val),
            0x400C => self.noise.write_control(val),
            0x400E => self.noise.write_period(val),
            0x400F => self.noise.write_length(val),
            _ => {} // $4009, $400D, $4010-$4013 (DMC) ignored
        }
    }

    // $4015 write
    pub fn write_status(&mut self, val: u8) {
        self.pulse1.length.set_enabled(val & 0x01 != 0);
        self.pulse2.length.set_enabled(val & 0x02 != 0);
        self.triangle.length.set_enabled(val & 0x04 != 0);
        self.noise.length.set_enabled(val & 0x08 != 0);
    }

    // $4015 read: length-counter status plus the frame IRQ flag, which
    // the read acknowledges
    pub fn read_status(&mut self) -> u8 {
        let val = self.peek_status();
        self.frame_irq = false;
        val
    }

    /// Side-effect-free view of $4015 for debug reads.
    pub fn peek_status(&self) -> u8 {
        let mut val = 0u8;
        if self.pulse1.length.active() {
            val |= 0x01;
        }
        if self.pulse2.length.active() {
            val |= 0x02;
        }
        if self.triangle.length.active() {
            val |= 0x04;
        }
        if self.noise.length.active() {
            val |= 0x08;
        }
        if self.frame_irq {
            val |= 0x40;
        }
        val
    }

    // $4017 write
    pub fn write_frame_counter(&mut self, val: u8) {
        self.five_step_mode = val & 0x80 != 0;
        self.irq_inhibit = val & 0x40 != 0;
        if self.irq_inhibit {
            self.frame_irq = false;
        }
        self.frame_counter = 0;
        if self.five_step_mode {
            // 5-step mode clocks everything immediately
            self.quarter_frame();
            self.half_frame();
        }
    }

    /// Non-linear DAC mix, normalized to 0.0..1.0.
    pub fn output(&self) -> f32 {
        let p1 = self.pulse1.output() as f64;
        let p2 = self.pulse2.output() as f64;
        let t = self.triangle.output() as f64;
        let n = self.noise.output() as f64;

        let pulse_out = if p1 + p2 > 0.0 {
            95.88 / (8128.0 / (p1 + p2) + 100.0)
        } else {
            0.0
        };
        let tnd_out = if t + n > 0.0 {
            159.79 / (1.0 / (t / 8227.0 + n / 12241.0) + 100.0)
        } else {
            0.0
        };

        (pulse_out + tnd_out) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_irq_raised_in_four_step_mode() {
        let mut apu = Apu::new();
        apu.write_frame_counter(0x00); // 4-step, IRQ enabled
        for _ in 0..STEP4 {
            apu.tick();
        }
        assert!(apu.irq_pending());

        // $4015 read acknowledges it
        let status = apu.read_status();
        assert_ne!(status & 0x40, 0);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn test_no_frame_irq_in_five_step_mode() {
        let mut apu = Apu::new();
        apu.write_frame_counter(0x80); // 5-step
        for _ in 0..STEP5 + 100 {
            apu.tick();
        }
        assert!(!apu.irq_pending());
    }

    #[test]
    fn test_irq_inhibit_clears_pending_flag() {
        let mut apu = Apu::new();
        apu.write_frame_counter(0x00);
        for _ in 0..STEP4 {
            apu.tick();
        }
        assert!(apu.irq_pending());
        apu.write_frame_counter(0x40);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn test_status_reflects_length_counters() {
        let mut apu = Apu::new();
        apu.write_status(0x01); // enable pulse 1
        apu.cpu_write(0x4003, 0x08); // load its length counter
        assert_eq!(apu.read_status() & 0x0F, 0x01);

        apu.write_status(0x00);
        assert_eq!(apu.read_status() & 0x0F, 0x00);
    }

    #[test]
    fn test_length_counters_decrement_at_half_frames() {
        let mut apu = Apu::new();
        apu.write_status(0x01);
        apu.cpu_write(0x4003, 0x18); // length index 3 -> counter 2
        for _ in 0..STEP2 {
            apu.tick(); // one half-frame clock
        }
        assert_eq!(apu.read_status() & 0x01, 0x01);
        for _ in 0..STEP4 {
            apu.tick(); // second half-frame clock somewhere in here
        }
        assert_eq!(apu.read_status() & 0x01, 0x00);
    }

    #[test]
    fn test_peek_status_has_no_side_effects() {
        let mut apu = Apu::new();
        apu.write_frame_counter(0x00);
        for _ in 0..STEP4 {
            apu.tick();
        }
        assert_ne!(apu.peek_status() & 0x40, 0);
        assert_ne!(apu.peek_status() & 0x40, 0, "peek must not acknowledge");
        assert_ne!(apu.read_status() & 0x40, 0);
    }
}
