use serde::{Deserialize, Serialize};

// Button bit positions, matching the pad's serial shift order
pub const BUTTON_A: u8 = 0b0000_0001;
pub const BUTTON_B: u8 = 0b0000_0010;
pub const BUTTON_SELECT: u8 = 0b0000_0100;
pub const BUTTON_START: u8 = 0b0000_1000;
pub const BUTTON_UP: u8 = 0b0001_0000;
pub const BUTTON_DOWN: u8 = 0b0010_0000;
pub const BUTTON_LEFT: u8 = 0b0100_0000;
pub const BUTTON_RIGHT: u8 = 0b1000_0000;

/// One standard pad. The caller latches a button byte before each frame;
/// the CPU drains it one bit per $4016/$4017 read, LSB (A) first.
#[derive(Clone, Serialize, Deserialize)]
pub struct Controller {
    pub buttons: u8,
    strobe: bool,
    shift_register: u8,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Controller {
            buttons: 0,
            strobe: false,
            shift_register: 0,
        }
    }

    /// Strobe write ($4016 bit 0). The falling edge latches the current
    /// button state into the shift register.
    pub fn write(&mut self, val: u8) {
        if val & 1 == 1 {
            self.strobe = true;
        } else {
            if self.strobe {
                self.shift_register = self.buttons;
            }
            self.strobe = false;
        }
    }

    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons & 1;
        }
        let val = self.shift_register & 1;
        self.shift_register >>= 1;
        val
    }

    /// Next bit without consuming it.
    pub fn peek(&self) -> u8 {
        if self.strobe {
            self.buttons & 1
        } else {
            self.shift_register & 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_read_order_is_a_first() {
        let mut ctrl = Controller::new();
        ctrl.buttons = BUTTON_A | BUTTON_SELECT | BUTTON_DOWN | BUTTON_RIGHT;

        // Strobe on then off to latch
        ctrl.write(1);
        ctrl.write(0);

        let drained: Vec<u8> = (0..8).map(|_| ctrl.read()).collect();
        //             A  B  Sel St Up Dn Lt Rt
        assert_eq!(drained, [1, 0, 1, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_strobe_mode_returns_button_a() {
        let mut ctrl = Controller::new();
        ctrl.buttons = BUTTON_A;
        ctrl.write(1); // strobe on

        // While strobe is on, always returns A button state
        assert_eq!(ctrl.read(), 1);
        assert_eq!(ctrl.read(), 1);
        assert_eq!(ctrl.read(), 1);
    }

    #[test]
    fn test_after_8_reads_returns_zero() {
        let mut ctrl = Controller::new();
        ctrl.buttons = 0xFF;
        ctrl.write(1);
        ctrl.write(0);

        for _ in 0..8 {
            ctrl.read();
        }
        assert_eq!(ctrl.read(), 0);
    }

    #[test]
    fn test_relatch_requires_strobe_edge() {
        let mut ctrl = Controller::new();
        ctrl.buttons = BUTTON_A;
        ctrl.write(1);
        ctrl.write(0);
        assert_eq!(ctrl.read(), 1);

        // New button state without a strobe edge: old shift data continues
        ctrl.buttons = BUTTON_B;
        assert_eq!(ctrl.read(), 0);
    }
}
