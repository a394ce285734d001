mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ucncio", version, about = "Virtual I/O board bridge for uCNC")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_panel_subcommand() {
        let cli = Cli::try_parse_from([
            "ucncio",
            "panel",
            "--pipe",
            "bench",
            "--input",
            "52",
            "--input",
            "99",
            "--analog",
            "66=128",
            "--cycles",
            "10",
        ])
        .expect("panel args should parse");

        let Command::Panel(args) = cli.command else {
            panic!("expected panel command");
        };
        assert_eq!(args.pipe.pipe, "bench");
        assert_eq!(args.inputs, vec![52, 99]);
        assert_eq!(args.analogs, vec![(66, 128)]);
        assert_eq!(args.cycles, Some(10));
        assert_eq!(args.connect_timeout, "1s");
    }

    #[test]
    fn rejects_malformed_analog_assignment() {
        let err = Cli::try_parse_from(["ucncio", "panel", "--analog", "66"])
            .expect_err("missing value should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_simulate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "ucncio",
            "simulate",
            "--interval",
            "5ms",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("simulate args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Command::Simulate(_)));
    }

    #[test]
    fn parses_pins_and_version() {
        let cli = Cli::try_parse_from(["ucncio", "pins"]).expect("pins should parse");
        assert!(matches!(cli.command, Command::Pins(_)));

        let cli = Cli::try_parse_from(["ucncio", "version", "--extended"])
            .expect("version should parse");
        assert!(matches!(cli.command, Command::Version(args) if args.extended));
    }
}
