//! snmp-getbulk: Retrieve SNMP variables with GETBULK.

use clap::Parser;
use snmp_messenger::cli::args::{CommonArgs, OutputArgs, V3Args, connect, parse_oids};
use snmp_messenger::cli::output::{write_error, write_variables};
use snmp_messenger::{Error, Result, Variable};
use std::process::ExitCode;

/// Retrieve variables with a single GETBULK request (SNMPv2c or v3).
#[derive(Debug, Parser)]
#[command(name = "snmp-getbulk", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    output: OutputArgs,

    /// Number of leading OIDs fetched once.
    #[arg(long = "non-repeaters", default_value_t = 0)]
    non_repeaters: u32,

    /// Successors fetched for each remaining OID.
    #[arg(long = "max-repetitions", default_value_t = 10)]
    max_repetitions: u32,

    /// OIDs to retrieve, in dotted notation.
    #[arg(required = true, value_name = "OID")]
    oids: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    match run(&args).await {
        Ok(variables) => match write_variables(&variables) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error writing output: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            write_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<Vec<Variable>> {
    let oids = parse_oids(&args.oids)?;
    let non_repeaters = i32::try_from(args.non_repeaters)
        .map_err(|_| Error::Config("non-repeaters out of range".into()).boxed())?;
    let max_repetitions = i32::try_from(args.max_repetitions)
        .map_err(|_| Error::Config("max-repetitions out of range".into()).boxed())?;

    let config = args.common.messenger_config(10000);
    let messenger = connect(&args.common, &args.v3, config).await?;
    messenger.get_bulk(&oids, non_repeaters, max_repetitions).await
}
