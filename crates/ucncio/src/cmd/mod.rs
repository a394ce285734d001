use std::time::Duration;

use clap::{Args, Subcommand};
use ucncio_transport::{PipeName, DEFAULT_PIPE_NAME};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod panel;
pub mod pins;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bridge against a headless console panel.
    Panel(PanelArgs),
    /// Play the controller side of the pipe.
    Simulate(SimulateArgs),
    /// Print the logical pin map.
    Pins(PinsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Panel(args) => panel::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Pins(args) => pins::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PipeArgs {
    /// Pipe name, or a path to a socket.
    #[arg(long, env = "UCNCIO_PIPE", default_value = DEFAULT_PIPE_NAME)]
    pub pipe: String,
}

impl PipeArgs {
    pub fn pipe_name(&self) -> CliResult<PipeName> {
        let pipe = self.pipe.trim();
        if pipe.is_empty() {
            return Err(CliError::usage("pipe name must not be empty"));
        }
        Ok(PipeName::parse(pipe))
    }
}

#[derive(Args, Debug)]
pub struct PanelArgs {
    #[command(flatten)]
    pub pipe: PipeArgs,
    /// Time allowed for each connect attempt (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub connect_timeout: String,
    /// Digital input id to hold on (repeatable).
    #[arg(long = "input", value_name = "ID")]
    pub inputs: Vec<u8>,
    /// Analog input value to hold (repeatable).
    #[arg(long = "analog", value_name = "ID=VALUE", value_parser = parse_assignment)]
    pub analogs: Vec<(u8, u8)>,
    /// Exit after N completed cycles.
    #[arg(long)]
    pub cycles: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub pipe: PipeArgs,
    /// Exit after N completed cycles.
    #[arg(long)]
    pub cycles: Option<u64>,
    /// Pause between cycles (e.g. 10ms, 1s).
    #[arg(long, default_value = "10ms")]
    pub interval: String,
}

#[derive(Args, Debug, Default)]
pub struct PinsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_assignment(input: &str) -> Result<(u8, u8), String> {
    let (id, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got {input}"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid pin id: {id}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value (0-255): {value}"))?;
    Ok((id, value))
}

/// Parse `500ms`, `2s`, or a bare number of seconds. Zero is rejected.
pub fn parse_duration(what: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage(format!("{what} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid {what} value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage(format!("{what} must be greater than zero")));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("timeout", "5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("timeout", "2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(
            parse_duration("interval", " 150ms ").unwrap(),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("timeout", "0s").is_err());
        assert!(parse_duration("timeout", "bad").is_err());
        assert!(parse_duration("timeout", "").is_err());
        assert_eq!(
            parse_duration("timeout", "1.5s").unwrap_err().code,
            crate::exit::USAGE
        );
    }

    #[test]
    fn parse_assignment_splits_id_and_value() {
        assert_eq!(parse_assignment("66=200"), Ok((66, 200)));
        assert_eq!(parse_assignment(" 70 = 1 "), Ok((70, 1)));
        assert!(parse_assignment("66").is_err());
        assert!(parse_assignment("66=256").is_err());
        assert!(parse_assignment("x=1").is_err());
    }

    #[test]
    fn pipe_args_parse_names_and_paths() {
        let args = PipeArgs {
            pipe: "bench".to_string(),
        };
        assert_eq!(args.pipe_name().unwrap(), PipeName::new("bench"));

        let args = PipeArgs {
            pipe: "/tmp/board.sock".to_string(),
        };
        assert_eq!(args.pipe_name().unwrap(), PipeName::from_path("/tmp/board.sock"));

        let args = PipeArgs {
            pipe: "  ".to_string(),
        };
        assert!(args.pipe_name().is_err());
    }
}
