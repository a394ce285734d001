use ucncio_wire::RECORD_SIZE;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ucncio {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ucncio");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("UCNCIO_BUILD_TARGET").unwrap_or("unknown"));
    println!("profile: {}", option_env!("UCNCIO_BUILD_PROFILE").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("record_size: {RECORD_SIZE}");
    println!(
        "transport: {}",
        if cfg!(windows) {
            "named-pipe"
        } else {
            "unix-socket"
        }
    );
    println!(
        "features: bridge={}, serde={}, cli=true",
        cfg!(feature = "bridge"),
        cfg!(feature = "serde")
    );

    Ok(SUCCESS)
}
