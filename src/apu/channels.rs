//! The four analog channels. Audio here exists for its side effects on
//! timing and the $4015 status bits; the mixed output is still computed
//! so callers can sample it, but nothing in the core consumes it.

use serde::{Deserialize, Serialize};

pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14,
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0], // 12.5%
    [0, 1, 1, 0, 0, 0, 0, 0], // 25%
    [0, 1, 1, 1, 1, 0, 0, 0], // 50%
    [1, 0, 0, 1, 1, 1, 1, 1], // 75% (inverted 25%)
];

const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0,
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// Decay envelope shared by the pulse and noise channels.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    start: bool,
    looped: bool,
    constant: bool,
    period: u8,
    divider: u8,
    decay: u8,
}

impl Envelope {
    /// Low 6 bits of $4000/$4004/$400C.
    fn write(&mut self, val: u8) {
        self.looped = val & 0x20 != 0;
        self.constant = val & 0x10 != 0;
        self.period = val & 0x0F;
    }

    fn restart(&mut self) {
        self.start = true;
    }

    /// Quarter-frame clock.
    fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.period;
        } else if self.divider == 0 {
            self.divider = self.period;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looped {
                self.decay = 15;
            }
        } else {
            self.divider -= 1;
        }
    }

    fn volume(&self) -> u8 {
        if self.constant {
            self.period
        } else {
            self.decay
        }
    }
}

/// Length counter shared by every channel. Silences the channel when it
/// hits zero; disabling via $4015 zeroes it immediately.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LengthCounter {
    counter: u8,
    halt: bool,
    enabled: bool,
}

impl LengthCounter {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }

    fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[index as usize];
        }
    }

    fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }

    /// Half-frame clock.
    fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    pub fn active(&self) -> bool {
        self.counter > 0
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Pulse {
    /// Pulse 1 and pulse 2 differ only in sweep negate arithmetic.
    ones_complement_sweep: bool,

    duty_mode: u8,
    duty_pos: u8,
    timer_period: u16,
    timer_counter: u16,

    pub length: LengthCounter,
    envelope: Envelope,

    sweep_enabled: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_divider: u8,
    sweep_reload: bool,
}

impl Pulse {
    pub fn new(ones_complement_sweep: bool) -> Self {
        Pulse {
            ones_complement_sweep,
            duty_mode: 0,
            duty_pos: 0,
            timer_period: 0,
            timer_counter: 0,
            length: LengthCounter::default(),
            envelope: Envelope::default(),
            sweep_enabled: false,
            sweep_period: 0,
            sweep_negate: false,
            sweep_shift: 0,
            sweep_divider: 0,
            sweep_reload: false,
        }
    }

    // $4000/$4004
    pub fn write_control(&mut self, val: u8) {
        self.duty_mode = (val >> 6) & 3;
        self.length.set_halt(val & 0x20 != 0);
        self.envelope.write(val);
    }

    // $4001/$4005
    pub fn write_sweep(&mut self, val: u8) {
        self.sweep_enabled = val & 0x80 != 0;
        self.sweep_period = (val >> 4) & 7;
        self.sweep_negate = val & 0x08 != 0;
        self.sweep_shift = val & 7;
        self.sweep_reload = true;
    }

    // $4002/$4006
    pub fn write_timer_lo(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x0700) | val as u16;
    }

    // $4003/$4007
    pub fn write_timer_hi(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((val as u16 & 7) << 8);
        self.length.load(val >> 3);
        self.duty_pos = 0;
        self.envelope.restart();
    }

    /// Timer clock, every other CPU cycle.
    pub fn tick_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = self.timer_period;
            self.duty_pos = (self.duty_pos + 1) & 7;
        } else {
            self.timer_counter -= 1;
        }
    }

    pub fn tick_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub fn tick_half_frame(&mut self) {
        self.length.clock();
        self.tick_sweep();
    }

    fn tick_sweep(&mut self) {
        let target = self.sweep_target_period();
        if self.sweep_divider == 0
            && self.sweep_enabled
            && self.sweep_shift > 0
            && self.timer_period >= 8
            && target <= 0x7FF
        {
            self.timer_period = target;
        }
        if self.sweep_divider == 0 || self.sweep_reload {
            self.sweep_divider = self.sweep_period;
            self.sweep_reload = false;
        } else {
            self.sweep_divider -= 1;
        }
    }

    fn sweep_target_period(&self) -> u16 {
        let delta = self.timer_period >> self.sweep_shift;
        if self.sweep_negate {
            if self.ones_complement_sweep {
                self.timer_period.wrapping_sub(delta).wrapping_sub(1)
            } else {
                self.timer_period.wrapping_sub(delta)
            }
        } else {
            self.timer_period.wrapping_add(delta)
        }
    }

    pub fn output(&self) -> u8 {
        if !self.length.active()
            || DUTY_TABLE[self.duty_mode as usize][self.duty_pos as usize] == 0
            || self.timer_period < 8
            || self.sweep_target_period() > 0x7FF
        {
            return 0;
        }
        self.envelope.volume()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Triangle {
    timer_period: u16,
    timer_counter: u16,
    seq_pos: u8,

    pub length: LengthCounter,

    linear_counter: u8,
    linear_period: u8,
    linear_reload: bool,
    /// The control bit halts the length counter AND keeps the linear
    /// reload flag set.
    control: bool,
}

impl Triangle {
    pub fn new() -> Self {
        Triangle {
            timer_period: 0,
            timer_counter: 0,
            seq_pos: 0,
            length: LengthCounter::default(),
            linear_counter: 0,
            linear_period: 0,
            linear_reload: false,
            control: false,
        }
    }

    // $4008
    pub fn write_linear(&mut self, val: u8) {
        self.control = val & 0x80 != 0;
        self.length.set_halt(self.control);
        self.linear_period = val & 0x7F;
    }

    // $400A
    pub fn write_timer_lo(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x0700) | val as u16;
    }

    // $400B
    pub fn write_timer_hi(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((val as u16 & 7) << 8);
        self.length.load(val >> 3);
        self.linear_reload = true;
    }

    /// Timer clock, every CPU cycle (the triangle runs at full rate).
    pub fn tick_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = self.timer_period;
            if self.length.active() && self.linear_counter > 0 {
                self.seq_pos = (self.seq_pos + 1) & 31;
            }
        } else {
            self.timer_counter -= 1;
        }
    }

    pub fn tick_quarter_frame(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_period;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    pub fn tick_half_frame(&mut self) {
        self.length.clock();
    }

    pub fn output(&self) -> u8 {
        if !self.length.active() || self.linear_counter == 0 {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.seq_pos as usize]
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Noise {
    timer_period: u16,
    timer_counter: u16,

    shift_register: u16,
    /// Short mode taps bit 6 instead of bit 1.
    short_mode: bool,

    pub length: LengthCounter,
    envelope: Envelope,
}

impl Noise {
    pub fn new() -> Self {
        Noise {
            timer_period: 0,
            timer_counter: 0,
            shift_register: 1,
            short_mode: false,
            length: LengthCounter::default(),
            envelope: Envelope::default(),
        }
    }

    // $400C
    pub fn write_control(&mut self, val: u8) {
        self.length.set_halt(val & 0x20 != 0);
        self.envelope.write(val);
    }

    // $400E
    pub fn write_period(&mut self, val: u8) {
        self.short_mode = val & 0x80 != 0;
        self.timer_period = NOISE_PERIOD_TABLE[(val & 0x0F) as usize];
    }

    // $400F
    pub fn write_length(&mut self, val: u8) {
        self.length.load(val >> 3);
        self.envelope.restart();
    }

    /// Timer clock, every other CPU cycle.
    pub fn tick_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = self.timer_period;
            let tap = if self.short_mode { 6 } else { 1 };
            let feedback = (self.shift_register & 1) ^ ((self.shift_register >> tap) & 1);
            self.shift_register >>= 1;
            self.shift_register |= feedback << 14;
        } else {
            self.timer_counter -= 1;
        }
    }

    pub fn tick_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub fn tick_half_frame(&mut self) {
        self.length.clock();
    }

    pub fn output(&self) -> u8 {
        if !self.length.active() || self.shift_register & 1 != 0 {
            return 0;
        }
        self.envelope.volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_load_requires_enable() {
        let mut pulse = Pulse::new(true);
        pulse.write_timer_hi(0x08); // length index 1 -> 254
        assert!(!pulse.length.active(), "disabled channel ignores the load");

        pulse.length.set_enabled(true);
        pulse.write_timer_hi(0x08);
        assert!(pulse.length.active());

        pulse.length.set_enabled(false);
        assert!(!pulse.length.active(), "disabling zeroes the counter");
    }

    #[test]
    fn test_length_counter_halt() {
        let mut noise = Noise::new();
        noise.length.set_enabled(true);
        noise.write_length(0x18); // index 3 -> length 2
        noise.tick_half_frame();
        noise.write_control(0x20); // halt
        noise.tick_half_frame();
        noise.tick_half_frame();
        assert!(noise.length.active(), "halted counter must not decrement");
    }

    #[test]
    fn test_envelope_decays_from_fifteen() {
        let mut env = Envelope::default();
        env.write(0x00); // period 0, not constant
        env.restart();
        env.clock(); // start: decay = 15
        assert_eq!(env.volume(), 15);
        env.clock();
        assert_eq!(env.volume(), 14);
    }

    #[test]
    fn test_triangle_sequencer_gated_by_counters() {
        let mut tri = Triangle::new();
        tri.length.set_enabled(true);
        tri.write_linear(0x7F);
        tri.write_timer_hi(0x08); // load length, set reload
        let before = tri.seq_pos;
        tri.tick_timer();
        assert_eq!(tri.seq_pos, before, "linear counter 0 freezes the sequencer");

        tri.tick_quarter_frame(); // reload linear counter
        tri.tick_timer();
        tri.tick_timer();
        assert_ne!(tri.seq_pos, before);
    }

    #[test]
    fn test_noise_lfsr_never_reaches_zero() {
        let mut noise = Noise::new();
        noise.write_period(0x00); // shortest period
        for _ in 0..10_000 {
            noise.tick_timer();
            assert_ne!(noise.shift_register, 0);
        }
    }
}
