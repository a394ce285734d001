use bytes::{Buf, BufMut};

use crate::error::{Result, WireError};
use crate::record::{PinRecord, RECORD_SIZE};

/// Encode a record into its wire form.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────┬──────────────┐
/// │ Outputs (4B) │ PWM (16B)    │ Inputs (4B)  │ Analogs (16B)│
/// │ native u32   │ slot 0..15   │ native u32   │ slot 0..15   │
/// └──────────────┴──────────────┴──────────────┴──────────────┘
/// ```
///
/// The bitfields use native byte order because the controller shares the
/// layout of its in-memory struct; both processes always run on one host.
pub fn encode(record: &PinRecord) -> [u8; RECORD_SIZE] {
    let mut out = [0u8; RECORD_SIZE];
    let mut dst = &mut out[..];
    dst.put_u32_ne(record.outputs);
    dst.put_slice(&record.pwm);
    dst.put_u32_ne(record.inputs);
    dst.put_slice(&record.analogs);
    out
}

/// Decode one record.
///
/// Fails with `WireError::MalformedRecord` unless `src` is exactly
/// [`RECORD_SIZE`] bytes long.
pub fn decode(src: &[u8]) -> Result<PinRecord> {
    if src.len() != RECORD_SIZE {
        return Err(WireError::MalformedRecord {
            len: src.len(),
            expected: RECORD_SIZE,
        });
    }

    let mut src = src;
    let mut record = PinRecord {
        outputs: src.get_u32_ne(),
        ..PinRecord::default()
    };
    src.copy_to_slice(&mut record.pwm);
    record.inputs = src.get_u32_ne();
    src.copy_to_slice(&mut record.analogs);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PinRecord {
        let mut record = PinRecord {
            outputs: 0xDEAD_BEEF,
            inputs: 0x0102_0304,
            ..PinRecord::default()
        };
        for i in 0..16 {
            record.pwm[i] = (i as u8) * 16;
            record.analogs[i] = 255 - i as u8;
        }
        record
    }

    #[test]
    fn encode_decode_roundtrip() {
        let record = sample();
        let wire = encode(&record);
        assert_eq!(decode(&wire).unwrap(), record);
    }

    #[test]
    fn fields_sit_at_fixed_offsets() {
        let record = sample();
        let wire = encode(&record);

        assert_eq!(wire[0..4], 0xDEAD_BEEFu32.to_ne_bytes());
        assert_eq!(wire[4..20], record.pwm);
        assert_eq!(wire[20..24], 0x0102_0304u32.to_ne_bytes());
        assert_eq!(wire[24..40], record.analogs);
    }

    #[test]
    fn output_bit_zero_is_low_bit_of_first_word() {
        let record = PinRecord {
            outputs: 1,
            ..PinRecord::default()
        };
        let wire = encode(&record);
        assert_eq!(u32::from_ne_bytes([wire[0], wire[1], wire[2], wire[3]]), 1);
        assert!(wire[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let short = [0u8; 39];
        let long = [0u8; 41];

        assert_eq!(
            decode(&short),
            Err(WireError::MalformedRecord {
                len: 39,
                expected: 40
            })
        );
        assert!(matches!(
            decode(&long),
            Err(WireError::MalformedRecord { len: 41, .. })
        ));
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn default_record_is_all_zero_bytes() {
        assert_eq!(encode(&PinRecord::default()), [0u8; RECORD_SIZE]);
    }
}
