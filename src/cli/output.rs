//! Printing for the CLI tools.

use std::io::{self, Write};

use crate::error::Error;
use crate::variable::Variable;

/// Print one variable per line to stdout.
pub fn write_variables(variables: &[Variable]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for variable in variables {
        writeln!(out, "{}", variable)?;
    }
    out.flush()
}

/// Print an error to stderr, with a hint for the common cases.
pub fn write_error(err: &Error) {
    match err {
        Error::Timeout { target, elapsed, .. } => {
            eprintln!("Error: no response from {} within {:?}", target, elapsed);
        }
        Error::Snmp {
            status, index, oid, ..
        } => match oid {
            Some(oid) => eprintln!(
                "Error: agent returned {} for {} (index {})",
                status, oid, index
            ),
            None => eprintln!("Error: agent returned {} (index {})", status, index),
        },
        Error::Report { message, oid, .. } => {
            eprintln!("Error: agent reported {}", message);
            if let Some(oid) = oid {
                eprintln!("  report OID: {}", oid);
            }
        }
        Error::Auth { .. } => {
            eprintln!("Error: {}", err);
            eprintln!("  check the user name, authentication protocol and phrase");
        }
        Error::Decrypt { .. } => {
            eprintln!("Error: {}", err);
            eprintln!("  check the privacy protocol and phrase");
        }
        _ => eprintln!("Error: {}", err),
    }
}
