//! Flat logical pin-id space.
//!
//! The panel addresses every control by one integer. The ranges are fixed
//! and shared with the panel layout, so they must not move:
//!
//! | Ids     | Field   | Indices |
//! |---------|---------|---------|
//! | 0–19    | Outputs | 0–19    |
//! | 20–35   | PWM     | 0–15    |
//! | 36–47   | Outputs | 20–31   |
//! | 48–51   | reserved            |
//! | 52–65   | Inputs  | 0–13    |
//! | 66–81   | Analogs | 0–15    |
//! | 82–99   | Inputs  | 14–31   |

use std::fmt;
use std::ops::RangeInclusive;

use crate::record::{ANALOG_COUNT, INPUT_COUNT, OUTPUT_COUNT, PWM_COUNT};

/// Ids that belong to no field.
pub const RESERVED_IDS: RangeInclusive<u8> = 48..=51;

/// First id past the end of the space.
pub const ID_LIMIT: u8 = 100;

const PWM_BASE: u8 = 20;
/// Outputs past the first 19 are displaced by the PWM block.
const OUTPUT_SPLIT: usize = 20;
const INPUT_BASE: u8 = 52;
const ANALOG_BASE: u8 = 66;
/// Inputs past the first 13 are displaced by the analog block.
const INPUT_SPLIT: usize = 14;
/// Width of the PWM/analog blocks spliced into the digital ranges.
const SPLICE: u8 = 16;

/// Which record field a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PinKind {
    Output,
    Pwm,
    Input,
    Analog,
}

impl PinKind {
    pub const ALL: [PinKind; 4] = [PinKind::Output, PinKind::Pwm, PinKind::Input, PinKind::Analog];

    /// Number of pins of this kind in a record.
    pub fn count(self) -> usize {
        match self {
            PinKind::Output => OUTPUT_COUNT,
            PinKind::Pwm => PWM_COUNT,
            PinKind::Input => INPUT_COUNT,
            PinKind::Analog => ANALOG_COUNT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PinKind::Output => "output",
            PinKind::Pwm => "pwm",
            PinKind::Input => "input",
            PinKind::Analog => "analog",
        }
    }
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of one panel control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PinId(u8);

impl PinId {
    /// Wrap a raw id. Any value is accepted; use [`PinId::resolve`] to find
    /// out whether it names a field.
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The id of pin `index` of `kind`, or `None` if `index` is out of range.
    pub fn of(kind: PinKind, index: usize) -> Option<Self> {
        if index >= kind.count() {
            return None;
        }
        // index < 32, so the casts below are lossless.
        let index = index as u8;
        let id = match kind {
            PinKind::Output if (index as usize) < OUTPUT_SPLIT => index,
            PinKind::Output => index + SPLICE,
            PinKind::Pwm => PWM_BASE + index,
            PinKind::Input if (index as usize) < INPUT_SPLIT => INPUT_BASE + index,
            PinKind::Input => INPUT_BASE + index + SPLICE,
            PinKind::Analog => ANALOG_BASE + index,
        };
        Some(Self(id))
    }

    /// The field and index this id addresses, or `None` for reserved and
    /// out-of-space ids.
    pub fn resolve(self) -> Option<(PinKind, usize)> {
        let id = self.0;
        let (kind, index) = match id {
            0..=19 => (PinKind::Output, id),
            20..=35 => (PinKind::Pwm, id - PWM_BASE),
            36..=47 => (PinKind::Output, id - SPLICE),
            52..=65 => (PinKind::Input, id - INPUT_BASE),
            66..=81 => (PinKind::Analog, id - ANALOG_BASE),
            82..=99 => (PinKind::Input, id - INPUT_BASE - SPLICE),
            _ => return None,
        };
        Some((kind, index as usize))
    }

    /// True for ids in the reserved gap.
    pub fn is_reserved(self) -> bool {
        RESERVED_IDS.contains(&self.0)
    }

    /// Every id of `kind`, in field-index order.
    pub fn all(kind: PinKind) -> impl Iterator<Item = PinId> {
        (0..kind.count()).filter_map(move |index| PinId::of(kind, index))
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

impl From<PinId> for u8 {
    fn from(id: PinId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn ids(kind: PinKind) -> BTreeSet<u8> {
        PinId::all(kind).map(PinId::get).collect()
    }

    #[test]
    fn ranges_match_panel_layout() {
        let outputs: BTreeSet<u8> = (0..=19).chain(36..=47).collect();
        let inputs: BTreeSet<u8> = (52..=65).chain(82..=99).collect();

        assert_eq!(ids(PinKind::Output), outputs);
        assert_eq!(ids(PinKind::Pwm), (20..=35).collect::<BTreeSet<u8>>());
        assert_eq!(ids(PinKind::Input), inputs);
        assert_eq!(ids(PinKind::Analog), (66..=81).collect::<BTreeSet<u8>>());
    }

    #[test]
    fn split_points() {
        assert_eq!(PinId::of(PinKind::Output, 19), Some(PinId::new(19)));
        assert_eq!(PinId::of(PinKind::Output, 20), Some(PinId::new(36)));
        assert_eq!(PinId::of(PinKind::Output, 31), Some(PinId::new(47)));
        assert_eq!(PinId::of(PinKind::Input, 13), Some(PinId::new(65)));
        assert_eq!(PinId::of(PinKind::Input, 14), Some(PinId::new(82)));
        assert_eq!(PinId::of(PinKind::Input, 31), Some(PinId::new(99)));
        assert_eq!(PinId::of(PinKind::Pwm, 3), Some(PinId::new(23)));
        assert_eq!(PinId::of(PinKind::Analog, 15), Some(PinId::new(81)));
    }

    #[test]
    fn out_of_range_indices_have_no_id() {
        for kind in PinKind::ALL {
            assert_eq!(PinId::of(kind, kind.count()), None);
        }
    }

    #[test]
    fn of_and_resolve_are_inverse() {
        let mut seen = BTreeSet::new();
        for kind in PinKind::ALL {
            for index in 0..kind.count() {
                let id = PinId::of(kind, index).unwrap();
                assert!(seen.insert(id), "{id} assigned twice");
                assert_eq!(id.resolve(), Some((kind, index)));
            }
        }
        assert_eq!(seen.len(), 96);

        for raw in 0..=u8::MAX {
            let id = PinId::new(raw);
            if let Some((kind, index)) = id.resolve() {
                assert_eq!(PinId::of(kind, index), Some(id));
            }
        }
    }

    #[test]
    fn reserved_ids_never_alias_a_field() {
        for raw in RESERVED_IDS {
            let id = PinId::new(raw);
            assert!(id.is_reserved());
            assert_eq!(id.resolve(), None);
        }
        assert_eq!(PinId::new(ID_LIMIT).resolve(), None);
        assert_eq!(PinId::new(u8::MAX).resolve(), None);
    }

    #[test]
    fn display_uses_control_names() {
        assert_eq!(PinId::new(23).to_string(), "d23");
    }
}
