use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("mctp-serial {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: mctp-serial");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("MCTP_SERIAL_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: serial={}, async={}, cli=true",
        cfg!(feature = "serial"),
        cfg!(feature = "async")
    );
    println!(
        "wire: max_payload={}, fcs=rfc1662-16",
        mctp_serial_frame::MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
