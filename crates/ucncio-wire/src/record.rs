/// Number of digital outputs packed into [`PinRecord::outputs`].
pub const OUTPUT_COUNT: usize = 32;
/// Number of PWM channels in [`PinRecord::pwm`].
pub const PWM_COUNT: usize = 16;
/// Number of digital inputs packed into [`PinRecord::inputs`].
pub const INPUT_COUNT: usize = 32;
/// Number of analog inputs in [`PinRecord::analogs`].
pub const ANALOG_COUNT: usize = 16;

/// Encoded size of one record: 4 + 16 + 4 + 16.
pub const RECORD_SIZE: usize = 4 + PWM_COUNT + 4 + ANALOG_COUNT;

/// The state of the virtual I/O board exchanged once per cycle.
///
/// The controller owns `outputs` and `pwm`; the panel owns `inputs` and
/// `analogs`. Both sides send the whole record every time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinRecord {
    /// Bit i = digital output i.
    pub outputs: u32,
    /// Slot i = duty value of PWM channel i.
    pub pwm: [u8; PWM_COUNT],
    /// Bit i = digital input i.
    pub inputs: u32,
    /// Slot i = value of analog input i.
    pub analogs: [u8; ANALOG_COUNT],
}

impl PinRecord {
    /// State of digital output `index`; false when out of range.
    pub fn output(&self, index: usize) -> bool {
        index < OUTPUT_COUNT && self.outputs & (1 << index) != 0
    }

    /// Set digital output `index`. Out-of-range indices are ignored.
    pub fn set_output(&mut self, index: usize, on: bool) {
        if index < OUTPUT_COUNT {
            self.outputs = with_bit(self.outputs, index, on);
        }
    }

    /// State of digital input `index`; false when out of range.
    pub fn input(&self, index: usize) -> bool {
        index < INPUT_COUNT && self.inputs & (1 << index) != 0
    }

    /// Set digital input `index`. Out-of-range indices are ignored.
    pub fn set_input(&mut self, index: usize, on: bool) {
        if index < INPUT_COUNT {
            self.inputs = with_bit(self.inputs, index, on);
        }
    }
}

fn with_bit(bits: u32, index: usize, on: bool) -> u32 {
    if on {
        bits | (1 << index)
    } else {
        bits & !(1 << index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_size_is_forty_bytes() {
        assert_eq!(RECORD_SIZE, 40);
    }

    #[test]
    fn bit_accessors_track_bitfields() {
        let mut record = PinRecord::default();
        record.set_output(0, true);
        record.set_output(31, true);
        record.set_input(13, true);

        assert_eq!(record.outputs, 0x8000_0001);
        assert_eq!(record.inputs, 1 << 13);
        assert!(record.output(31));
        assert!(!record.output(30));

        record.set_output(0, false);
        assert_eq!(record.outputs, 0x8000_0000);
    }

    #[test]
    fn out_of_range_bits_are_ignored() {
        let mut record = PinRecord::default();
        record.set_output(32, true);
        record.set_input(40, true);

        assert_eq!(record, PinRecord::default());
        assert!(!record.output(32));
        assert!(!record.input(99));
    }
}
