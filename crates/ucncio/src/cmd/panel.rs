use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use ucncio_bridge::{
    Bridge, BridgeConfig, PinPanel, StatusChannel, STATUS_FREQUENCY_UNAVAILABLE,
};
use ucncio_wire::{OutputFragment, PinId, PinKind, PinRecord, PinUpdate};

use crate::cmd::{parse_duration, PanelArgs};
use crate::exit::{bridge_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_status, print_summary, OutputFormat};

const PUMP_INTERVAL: Duration = Duration::from_millis(1);
const FREQUENCY_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// A panel with no window: held inputs come from the command line, output
/// changes go to the log, status lines go to stdout.
struct ConsolePanel {
    format: OutputFormat,
    inputs: HashSet<PinId>,
    analogs: HashMap<PinId, u8>,
    outputs: HashMap<PinId, bool>,
    pwm: HashMap<PinId, u8>,
    cycles: u64,
    last_frequency_report: Option<Instant>,
}

impl ConsolePanel {
    fn new(format: OutputFormat, inputs: HashSet<PinId>, analogs: HashMap<PinId, u8>) -> Self {
        Self {
            format,
            inputs,
            analogs,
            outputs: HashMap::new(),
            pwm: HashMap::new(),
            cycles: 0,
            last_frequency_report: None,
        }
    }

    /// The record as the panel last saw it: controller outputs plus held inputs.
    fn snapshot(&self) -> PinRecord {
        let mut record = PinRecord::default();
        let outputs = self
            .outputs
            .iter()
            .map(|(&id, &on)| PinUpdate::Digital { id, on })
            .chain(self.pwm.iter().map(|(&id, &value)| PinUpdate::Level { id, value }));
        OutputFragment::collect(outputs).apply_to(&mut record);
        ucncio_wire::logical_to_inputs(|id| self.read_input(id), |id| self.read_analog(id))
            .apply_to(&mut record);
        record
    }

    fn frequency_due(&mut self) -> bool {
        let now = Instant::now();
        match self.last_frequency_report {
            Some(last) if now.duration_since(last) < FREQUENCY_REPORT_INTERVAL => false,
            _ => {
                self.last_frequency_report = Some(now);
                true
            }
        }
    }
}

impl PinPanel for ConsolePanel {
    fn set_output(&mut self, id: PinId, on: bool) {
        let previous = self.outputs.insert(id, on);
        if previous.unwrap_or(false) != on {
            info!(pin = %id, on, "output changed");
        }
    }

    fn set_pwm(&mut self, id: PinId, duty: u8) {
        let previous = self.pwm.insert(id, duty);
        if previous.unwrap_or(0) != duty {
            info!(pin = %id, duty, "pwm changed");
        }
    }

    fn read_input(&self, id: PinId) -> bool {
        self.inputs.contains(&id)
    }

    fn read_analog(&self, id: PinId) -> u8 {
        self.analogs.get(&id).copied().unwrap_or(0)
    }

    fn publish_status(&mut self, channel: StatusChannel, text: &str) {
        match channel {
            StatusChannel::Connection => print_status(channel, text, self.format),
            StatusChannel::Frequency if text == STATUS_FREQUENCY_UNAVAILABLE => {
                debug!(%text, "frequency reset");
            }
            StatusChannel::Frequency => {
                self.cycles += 1;
                if self.frequency_due() {
                    print_status(channel, text, self.format);
                }
            }
        }
    }
}

fn held_inputs(args: &PanelArgs) -> CliResult<(HashSet<PinId>, HashMap<PinId, u8>)> {
    let mut inputs = HashSet::new();
    for &raw in &args.inputs {
        let id = PinId::new(raw);
        match id.resolve() {
            Some((PinKind::Input, _)) => {
                inputs.insert(id);
            }
            _ => return Err(CliError::usage(format!("{raw} is not a digital input id"))),
        }
    }

    let mut analogs = HashMap::new();
    for &(raw, value) in &args.analogs {
        let id = PinId::new(raw);
        match id.resolve() {
            Some((PinKind::Analog, _)) => {
                analogs.insert(id, value);
            }
            _ => return Err(CliError::usage(format!("{raw} is not an analog input id"))),
        }
    }
    Ok((inputs, analogs))
}

pub fn run(args: PanelArgs, format: OutputFormat) -> CliResult<i32> {
    let connect_timeout = parse_duration("connect timeout", &args.connect_timeout)?;
    let (inputs, analogs) = held_inputs(&args)?;
    let config = BridgeConfig::default()
        .with_pipe(args.pipe.pipe_name()?)
        .with_connect_timeout(connect_timeout);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(pipe = %config.pipe, "starting panel");
    let (bridge, mut dispatcher) =
        Bridge::spawn(config).map_err(|err| bridge_error("bridge start failed", err))?;
    let mut panel = ConsolePanel::new(format, inputs, analogs);

    while running.load(Ordering::SeqCst) {
        dispatcher.pump(&mut panel);
        if dispatcher.is_closed() {
            break;
        }
        if args.cycles.is_some_and(|limit| panel.cycles >= limit) {
            break;
        }
        thread::sleep(PUMP_INTERVAL);
    }

    let exit = bridge
        .shutdown_with(dispatcher)
        .map_err(|err| bridge_error("bridge shutdown failed", err))?;
    debug!(?exit, "bridge stopped");

    print_summary("panel", panel.cycles, &panel.snapshot(), format);
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
    use super::*;
    use crate::cmd::PipeArgs;

    fn args(inputs: Vec<u8>, analogs: Vec<(u8, u8)>) -> PanelArgs {
        PanelArgs {
            pipe: PipeArgs {
                pipe: "ucncio".to_string(),
            },
            connect_timeout: "1s".to_string(),
            inputs,
            analogs,
            cycles: None,
        }
    }

    #[test]
    fn held_inputs_accept_only_input_ids() {
        let (inputs, analogs) = held_inputs(&args(vec![52, 99], vec![(66, 10)])).unwrap();
        assert!(inputs.contains(&PinId::new(52)));
        assert!(inputs.contains(&PinId::new(99)));
        assert_eq!(analogs[&PinId::new(66)], 10);

        assert!(held_inputs(&args(vec![3], vec![])).is_err());
        assert!(held_inputs(&args(vec![50], vec![])).is_err());
        assert!(held_inputs(&args(vec![], vec![(52, 1)])).is_err());
    }

    #[test]
    fn console_panel_counts_measured_cycles() {
        let mut panel = ConsolePanel::new(OutputFormat::Raw, HashSet::new(), HashMap::new());
        panel.publish_status(StatusChannel::Frequency, STATUS_FREQUENCY_UNAVAILABLE);
        panel.publish_status(StatusChannel::Frequency, "Update frequency: 500Hz");
        panel.publish_status(StatusChannel::Frequency, "Update frequency: 480Hz");
        assert_eq!(panel.cycles, 2);
    }

    #[test]
    fn snapshot_combines_outputs_and_held_inputs() {
        let inputs = HashSet::from([PinId::new(53)]);
        let analogs = HashMap::from([(PinId::new(67), 5)]);
        let mut panel = ConsolePanel::new(OutputFormat::Raw, inputs, analogs);
        panel.set_output(PinId::new(36), true);
        panel.set_pwm(PinId::new(21), 77);

        let record = panel.snapshot();
        assert_eq!(record.outputs, 1 << 20);
        assert_eq!(record.pwm[1], 77);
        assert_eq!(record.inputs, 1 << 1);
        assert_eq!(record.analogs[1], 5);
    }
}
