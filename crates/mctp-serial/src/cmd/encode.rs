use bytes::BytesMut;
use mctp_serial_frame::{encode_frame, encoded_len};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;

    let mut wire = BytesMut::with_capacity(encoded_len(&payload));
    let fcs = encode_frame(&payload, &mut wire).map_err(|err| frame_error("encode failed", err))?;

    print_encoded(payload.len(), &wire, fcs, format);
    Ok(SUCCESS)
}
