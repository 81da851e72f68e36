use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rrcmon {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rrcmon");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("RRCMON_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("RRCMON_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "features: serial={}, cli=true",
        cfg!(feature = "serial")
    );
    println!(
        "defaults: port={}, baud={}",
        rrcmon_transport::serial::DEFAULT_PORT,
        rrcmon_transport::serial::DEFAULT_BAUD_RATE
    );

    Ok(SUCCESS)
}
