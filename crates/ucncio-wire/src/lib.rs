//! Fixed-layout pin record codec and logical pin-id mapping.
//!
//! Every cycle the controller and the panel exchange one [`PinRecord`]:
//! - Outputs: 4-byte bitfield, one bit per digital output
//! - PWM: 16 duty bytes
//! - Inputs: 4-byte bitfield, one bit per digital input
//! - Analogs: 16 value bytes
//!
//! 40 bytes, native byte order, no framing. The [`mapper`] translates the
//! packed fields into the flat [`PinId`] space the panel addresses controls by.

pub mod codec;
pub mod error;
pub mod mapper;
pub mod pin;
pub mod record;

pub use codec::{decode, encode};
pub use error::{Result, WireError};
pub use mapper::{
    inputs_to_logical, logical_to_inputs, outputs_to_logical, InputFragment, OutputFragment,
    PinUpdate,
};
pub use pin::{PinId, PinKind, ID_LIMIT, RESERVED_IDS};
pub use record::{PinRecord, ANALOG_COUNT, INPUT_COUNT, OUTPUT_COUNT, PWM_COUNT, RECORD_SIZE};
