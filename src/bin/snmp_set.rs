//! snmp-set: Set an SNMP variable.

use clap::Parser;
use snmp_messenger::cli::args::{CommonArgs, OutputArgs, V3Args, ValueType, connect};
use snmp_messenger::cli::output::{write_error, write_variables};
use snmp_messenger::{Oid, Result, Variable};
use std::process::ExitCode;

/// Set one SNMP variable.
///
/// Type specifiers:
///   i = INTEGER
///   u = Unsigned32 (Gauge32)
///   s = STRING (OctetString)
///   x = Hex-STRING (OctetString from hex)
///   o = OBJECT IDENTIFIER
///   a = IpAddress
///   t = TimeTicks
///   c = Counter32
///   C = Counter64
#[derive(Debug, Parser)]
#[command(name = "snmp-set", version, about, verbatim_doc_comment)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    output: OutputArgs,

    /// OID to set, in dotted notation.
    #[arg(value_name = "OID")]
    oid: String,

    /// Value type specifier.
    #[arg(value_name = "TYPE")]
    value_type: ValueType,

    /// Value to set.
    #[arg(value_name = "VALUE", allow_hyphen_values = true)]
    value: String,
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
    let variable = Variable::new(
        Oid::parse(&args.oid)?,
        args.value_type.parse_value(&args.value)?,
    );
    let config = args.common.messenger_config(5000);
    let messenger = connect(&args.common, &args.v3, config).await?;
    messenger.set(&[variable]).await
}
