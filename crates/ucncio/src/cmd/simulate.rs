use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use ucncio_transport::{Connection, PipeListener, PipeStream, TransportError};
use ucncio_wire::{
    decode, encode, inputs_to_logical, PinRecord, PinUpdate, OUTPUT_COUNT, PWM_COUNT, RECORD_SIZE,
};

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{transport_error, wire_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_input_changes, print_summary, OutputFormat};

/// Controller-owned fields for `cycle`: one output bit walks across the
/// outputs while every PWM channel ramps at its own phase.
fn controller_record(cycle: u64) -> PinRecord {
    let mut record = PinRecord::default();
    record.set_output((cycle % OUTPUT_COUNT as u64) as usize, true);
    for (channel, duty) in record.pwm.iter_mut().enumerate() {
        let phase = cycle.wrapping_mul(4) + (channel as u64) * (256 / PWM_COUNT as u64);
        *duty = (phase % 256) as u8;
    }
    record
}

/// Input and analog pins whose value differs between two replies.
fn input_changes(previous: &PinRecord, current: &PinRecord) -> Vec<PinUpdate> {
    inputs_to_logical(previous)
        .zip(inputs_to_logical(current))
        .filter(|(before, after)| before != after)
        .map(|(_, after)| after)
        .collect()
}

enum SessionEnd {
    PeerLeft,
    Done,
}

struct Simulator {
    interval: Duration,
    limit: Option<u64>,
    cycles: u64,
    last_reply: PinRecord,
    format: OutputFormat,
}

impl Simulator {
    fn finished(&self) -> bool {
        self.limit.is_some_and(|limit| self.cycles >= limit)
    }

    fn session(&mut self, stream: PipeStream, running: &AtomicBool) -> CliResult<SessionEnd> {
        let abort = stream.abort_handle();
        let mut conn = Connection::new(stream, abort);
        let mut reply = [0u8; RECORD_SIZE];

        while running.load(Ordering::SeqCst) && !self.finished() {
            let record = controller_record(self.cycles);
            let result = conn
                .write_exact_and_flush(&encode(&record))
                .and_then(|()| conn.read_exact(&mut reply));
            match result {
                Ok(()) => {}
                Err(TransportError::Closed(err)) => {
                    info!(error = %err, "panel disconnected");
                    return Ok(SessionEnd::PeerLeft);
                }
                Err(err) => return Err(transport_error("exchange failed", err)),
            }

            let received = decode(&reply).map_err(|err| wire_error("bad reply", err))?;
            if received.outputs != record.outputs || received.pwm != record.pwm {
                warn!(cycle = self.cycles, "panel altered controller-owned fields");
            }

            let changes = input_changes(&self.last_reply, &received);
            print_input_changes(self.cycles, changes, self.format);
            self.last_reply = received;
            self.cycles += 1;

            thread::sleep(self.interval);
        }
        conn.close();
        Ok(SessionEnd::Done)
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration("interval", &args.interval)?;
    let name = args.pipe.pipe_name()?;
    let listener = PipeListener::bind(&name).map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut sim = Simulator {
        interval,
        limit: args.cycles,
        cycles: 0,
        last_reply: PinRecord::default(),
        format,
    };

    while running.load(Ordering::SeqCst) && !sim.finished() {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        info!(pipe = %name, "panel connected");

        match sim.session(stream, &running)? {
            SessionEnd::PeerLeft => {
                debug!(cycles = sim.cycles, "waiting for the next panel");
            }
            SessionEnd::Done => break,
        }
    }

    print_summary("simulate", sim.cycles, &sim.last_reply, format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use ucncio_wire::PinId;

    use super::*;

    #[test]
    fn output_bit_walks_and_wraps() {
        assert_eq!(controller_record(0).outputs, 1);
        assert_eq!(controller_record(5).outputs, 1 << 5);
        assert_eq!(controller_record(31).outputs, 1 << 31);
        assert_eq!(controller_record(32).outputs, 1);
    }

    #[test]
    fn pwm_ramps_with_channel_phase() {
        let first = controller_record(0);
        assert_eq!(first.pwm[0], 0);
        assert_eq!(first.pwm[1], 16);
        assert_eq!(first.pwm[15], 240);

        let next = controller_record(1);
        assert_eq!(next.pwm[0], 4);
        assert_eq!(controller_record(64).pwm[0], 0);
    }

    #[test]
    fn controller_record_leaves_panel_fields_zero() {
        let record = controller_record(7);
        assert_eq!(record.inputs, 0);
        assert_eq!(record.analogs, [0; 16]);
    }

    #[test]
    fn input_changes_reports_only_differences() {
        let before = PinRecord::default();
        let mut after = before;
        after.set_input(0, true);
        after.analogs[2] = 9;

        let changes = input_changes(&before, &after);
        assert_eq!(
            changes,
            vec![
                PinUpdate::Digital {
                    id: PinId::new(52),
                    on: true
                },
                PinUpdate::Level {
                    id: PinId::new(68),
                    value: 9
                },
            ]
        );
        assert!(input_changes(&after, &after).is_empty());
    }
}
