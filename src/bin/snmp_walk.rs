//! snmp-walk: Walk an SNMP subtree.

use clap::Parser;
use snmp_messenger::cli::args::{CommonArgs, OutputArgs, V3Args, WalkModeArg, connect};
use snmp_messenger::cli::output::{write_error, write_variables};
use snmp_messenger::{Oid, Result, Variable, Version};
use std::process::ExitCode;

/// Walk a subtree. SNMPv1 uses GETNEXT; v2c and v3 use GETBULK.
#[derive(Debug, Parser)]
#[command(name = "snmp-walk", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    output: OutputArgs,

    /// Where the walk stops.
    #[arg(long = "mode", value_enum, default_value_t = WalkModeArg::WithinSubtree)]
    mode: WalkModeArg,

    /// GETBULK max-repetitions.
    #[arg(long = "max-repetitions", default_value_t = 10)]
    max_repetitions: u32,

    /// Use GETNEXT even on v2c and v3.
    #[arg(long = "getnext")]
    getnext: bool,

    /// Root of the walk, in dotted notation.
    #[arg(value_name = "OID", default_value = "1.3.6.1.2.1")]
    oid: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    let mut variables = Vec::new();
    let result = run(&args, &mut variables).await;

    // Partial results are printed even when the walk fails.
    if let Err(e) = write_variables(&variables) {
        eprintln!("Error writing output: {}", e);
        return ExitCode::FAILURE;
    }
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            write_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, variables: &mut Vec<Variable>) -> Result<usize> {
    let root = Oid::parse(&args.oid)?;
    let mut config = args.common.messenger_config(5000);
    config.walk_mode = args.mode.into();
    config.max_repetitions = args.max_repetitions;
    let use_getnext = args.getnext || config.version == Version::V1;

    let messenger = connect(&args.common, &args.v3, config).await?;
    if use_getnext {
        messenger.walk_into(&root, variables).await
    } else {
        messenger.bulk_walk_into(&root, variables).await
    }
}
