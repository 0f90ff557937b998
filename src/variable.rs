//! Variables: an OID paired with a value.
//!
//! On the wire a variable is `SEQUENCE { oid, value }` and a variable list is
//! a SEQUENCE of those.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::Value;
use std::fmt;

/// An OID and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: Oid,
    pub data: Value,
}

impl Variable {
    /// Pair an OID with a value.
    pub fn new(id: Oid, data: Value) -> Self {
        Self { id, data }
    }

    /// Check that both the name and any OID value can be BER-encoded.
    pub fn validate_oids(&self) -> Result<()> {
        self.id.validate()?;
        self.data.validate_oids()
    }

    /// A variable with a NULL value, as sent in GET-style requests.
    pub fn null(id: Oid) -> Self {
        Self {
            id,
            data: Value::Null,
        }
    }

    /// `SEQUENCE { id, data }`.
    pub fn to_sequence(&self) -> Value {
        Value::Sequence(vec![
            Value::ObjectIdentifier(self.id.clone()),
            self.data.clone(),
        ])
    }

    /// Inverse of [`to_sequence`](Self::to_sequence).
    ///
    /// Fails with a [`DecodeErrorKind`] naming the first shape violation.
    pub fn from_sequence(value: Value) -> Result<Self> {
        Self::from_value_at(value, 0)
    }

    fn from_value_at(value: Value, at: usize) -> Result<Self> {
        let items = match value {
            Value::Sequence(items) => items,
            other => {
                let tag = other.snmp_type().tag();
                return Err(Error::decode(
                    at,
                    DecodeErrorKind::WrongVarbindSectionType { tag },
                ));
            }
        };
        let length = items.len();
        let Ok([id, data]) = <[Value; 2]>::try_from(items) else {
            return Err(Error::decode(
                at,
                DecodeErrorKind::WrongVarbindLength { length },
            ));
        };
        match id {
            Value::ObjectIdentifier(id) => Ok(Self { id, data }),
            other => Err(Error::decode(
                at,
                DecodeErrorKind::WrongVarbindFirstType {
                    tag: other.snmp_type().tag(),
                },
            )),
        }
    }

    /// Append `SEQUENCE { id, data }`.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.data.encode(buf);
            buf.push_oid(&self.id);
        });
    }

    /// Read one variable, checking its shape.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        match decoder.peek_tag() {
            Some(tag::universal::SEQUENCE) => {}
            Some(tag) => {
                return Err(Error::decode(
                    at,
                    DecodeErrorKind::WrongVarbindSectionType { tag },
                ));
            }
            None => return Err(Error::decode(at, DecodeErrorKind::TruncatedData)),
        }
        let mut seq = decoder.read_sequence()?;
        let mut items = Vec::with_capacity(2);
        while !seq.is_empty() {
            items.push(Value::decode(&mut seq)?);
        }
        Self::from_value_at(Value::Sequence(items), at)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable: Id: {}; Data: {}", self.id, self.data)
    }
}

/// A variable list as `SEQUENCE { SEQUENCE { id, data } ... }`.
pub fn list_to_sequence(variables: &[Variable]) -> Value {
    Value::Sequence(variables.iter().map(Variable::to_sequence).collect())
}

/// Inverse of [`list_to_sequence`].
pub fn list_from_sequence(value: Value) -> Result<Vec<Variable>> {
    match value {
        Value::Sequence(items) => items.into_iter().map(Variable::from_sequence).collect(),
        other => Err(Error::decode(
            0,
            DecodeErrorKind::WrongVarbindSectionType {
                tag: other.snmp_type().tag(),
            },
        )),
    }
}

/// Append a variable list.
pub fn encode_variable_list(buf: &mut EncodeBuf, variables: &[Variable]) {
    buf.push_sequence(|buf| {
        for variable in variables.iter().rev() {
            variable.encode(buf);
        }
    });
}

/// Append a variable list pairing each OID with NULL.
pub fn encode_null_variables(buf: &mut EncodeBuf, oids: &[Oid]) {
    buf.push_sequence(|buf| {
        for oid in oids.iter().rev() {
            buf.push_sequence(|buf| {
                buf.push_null();
                buf.push_oid(oid);
            });
        }
    });
}

/// Read a variable list.
pub fn decode_variable_list(decoder: &mut Decoder) -> Result<Vec<Variable>> {
    let mut seq = decoder.read_sequence()?;
    let mut variables = Vec::with_capacity((seq.remaining() / 16).max(1));
    while !seq.is_empty() {
        variables.push(Variable::decode(&mut seq)?);
    }
    Ok(variables)
}
