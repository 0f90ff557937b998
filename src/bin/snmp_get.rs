//! snmp-get: Retrieve SNMP variables.

use clap::Parser;
use snmp_messenger::cli::args::{CommonArgs, OutputArgs, V3Args, connect, parse_oids};
use snmp_messenger::cli::output::{write_error, write_variables};
use snmp_messenger::{Result, Variable};
use std::process::ExitCode;

/// Retrieve one or more SNMP variables with GET.
#[derive(Debug, Parser)]
#[command(name = "snmp-get", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    output: OutputArgs,

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
    let config = args.common.messenger_config(5000);
    let messenger = connect(&args.common, &args.v3, config).await?;
    messenger.get(&oids).await
}
