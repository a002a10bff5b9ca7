use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod methods;
pub mod selftest;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the method registry.
    Methods(MethodsArgs),
    /// Decode recorded wire bytes into protocol calls.
    Decode(DecodeArgs),
    /// Encode a call into wire bytes by its symbolic name.
    Encode(EncodeArgs),
    /// Run the protocol engine against a virtual device over a loopback.
    Selftest(SelftestArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Methods(args) => methods::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Selftest(args) => selftest::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct MethodsArgs {
    /// Only methods flowing this direction (command | event).
    #[arg(long)]
    pub direction: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex bytes, e.g. "AA 04 26 03 05 DC" (spaces, commas, 0x optional).
    #[arg(required = true)]
    pub hex: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Symbolic method name, e.g. servoMoveToMicroseconds.
    pub name: String,
    /// Field values in schema order. Byte arrays as comma-separated
    /// decimals, e.g. "1,2,3".
    pub values: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct SelftestArgs {
    /// Acknowledgement timeout for the test run, in milliseconds.
    #[arg(long, default_value = "2000")]
    pub ack_timeout_ms: u64,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
