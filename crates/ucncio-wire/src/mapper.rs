//! Translation between record fields and panel pin ids.
//!
//! Pure and total in both directions: every bit and slot of a record maps to
//! exactly one id, and every id produced here maps back to the same bit or
//! slot. The mapper never touches presentation state; the panel is reached
//! only through the accessors handed to [`logical_to_inputs`].

use crate::pin::{PinId, PinKind};
use crate::record::{PinRecord, ANALOG_COUNT, PWM_COUNT};

/// One value the panel should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinUpdate {
    /// A digital pin's on/off state.
    Digital { id: PinId, on: bool },
    /// A PWM duty or analog magnitude.
    Level { id: PinId, value: u8 },
}

impl PinUpdate {
    pub fn id(&self) -> PinId {
        match self {
            PinUpdate::Digital { id, .. } | PinUpdate::Level { id, .. } => *id,
        }
    }
}

/// Every output bit and PWM slot of `record`, addressed by pin id.
///
/// Yields 32 `Digital` updates (outputs) followed by 16 `Level` updates (PWM).
pub fn outputs_to_logical(record: &PinRecord) -> impl Iterator<Item = PinUpdate> + '_ {
    let outputs = PinId::all(PinKind::Output)
        .enumerate()
        .map(move |(index, id)| PinUpdate::Digital {
            id,
            on: record.output(index),
        });
    let pwm = PinId::all(PinKind::Pwm)
        .enumerate()
        .map(move |(index, id)| PinUpdate::Level {
            id,
            value: record.pwm[index],
        });
    outputs.chain(pwm)
}

/// Every input bit and analog slot of `record`, addressed by pin id.
///
/// The controller-side view of what the panel reported.
pub fn inputs_to_logical(record: &PinRecord) -> impl Iterator<Item = PinUpdate> + '_ {
    let inputs = PinId::all(PinKind::Input)
        .enumerate()
        .map(move |(index, id)| PinUpdate::Digital {
            id,
            on: record.input(index),
        });
    let analogs = PinId::all(PinKind::Analog)
        .enumerate()
        .map(move |(index, id)| PinUpdate::Level {
            id,
            value: record.analogs[index],
        });
    inputs.chain(analogs)
}

/// The panel-owned part of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFragment {
    pub inputs: u32,
    pub analogs: [u8; ANALOG_COUNT],
}

impl InputFragment {
    /// Overwrite the Inputs and Analogs fields of `record`, leaving the
    /// controller-owned fields untouched.
    pub fn apply_to(&self, record: &mut PinRecord) {
        record.inputs = self.inputs;
        record.analogs = self.analogs;
    }
}

/// Sample the panel's input controls and pack them.
///
/// `read_input` is asked for each of the 32 input ids, `read_analog` for each
/// of the 16 analog ids.
pub fn logical_to_inputs<I, A>(mut read_input: I, mut read_analog: A) -> InputFragment
where
    I: FnMut(PinId) -> bool,
    A: FnMut(PinId) -> u8,
{
    let mut fragment = InputFragment::default();
    for (index, id) in PinId::all(PinKind::Input).enumerate() {
        if read_input(id) {
            fragment.inputs |= 1 << index;
        }
    }
    for (index, id) in PinId::all(PinKind::Analog).enumerate() {
        fragment.analogs[index] = read_analog(id);
    }
    fragment
}

/// The controller-owned part of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFragment {
    pub outputs: u32,
    pub pwm: [u8; PWM_COUNT],
}

impl OutputFragment {
    /// Rebuild Outputs and PWM from panel updates; the inverse of
    /// [`outputs_to_logical`].
    ///
    /// Updates whose id does not address an output or PWM pin are ignored.
    pub fn collect(updates: impl IntoIterator<Item = PinUpdate>) -> Self {
        let mut record = PinRecord::default();
        for update in updates {
            match (update, update.id().resolve()) {
                (PinUpdate::Digital { on, .. }, Some((PinKind::Output, index))) => {
                    record.set_output(index, on);
                }
                (PinUpdate::Level { value, .. }, Some((PinKind::Pwm, index))) => {
                    record.pwm[index] = value;
                }
                _ => {}
            }
        }
        Self {
            outputs: record.outputs,
            pwm: record.pwm,
        }
    }

    pub fn apply_to(&self, record: &mut PinRecord) {
        record.outputs = self.outputs;
        record.pwm = self.pwm;
    }
}
