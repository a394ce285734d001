use crate::cmd::PinsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_pin_map, OutputFormat};

pub fn run(_args: PinsArgs, format: OutputFormat) -> CliResult<i32> {
    print_pin_map(format);
    Ok(SUCCESS)
}
