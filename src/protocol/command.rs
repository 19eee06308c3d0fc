//! Outbound command encoding for the CAEN text protocol.
//!
//! Commands are single ASCII lines terminated by CRLF. Two addressing
//! variants exist in the field: board-addressed firmware expects
//! `$BD:<n>,CH:<n>,CMD:<op>,PAR:<name>[,VAL:<v>]`, older modules take
//! `$CMD:<op>,CH:<n>,PAR:<name>[,VAL:<v>]`. The encoder emits the
//! board-addressed form when a board index is configured and the
//! board-less form otherwise.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::response::ValueKind;

/// A monitorable or settable channel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Voltage setpoint.
    Vset,
    /// Measured voltage.
    Vmon,
    /// Current limit setpoint.
    Iset,
    /// Measured current.
    Imon,
    /// Overcurrent trip time threshold, seconds.
    Trip,
    /// Status word bitmask.
    Stat,
}

impl Parameter {
    /// The six parameters read by one telemetry pass, in read order.
    pub const TELEMETRY: [Self; 6] = [
        Self::Vset,
        Self::Vmon,
        Self::Iset,
        Self::Imon,
        Self::Trip,
        Self::Stat,
    ];

    /// Wire name of the parameter.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vset => "VSET",
            Self::Vmon => "VMON",
            Self::Iset => "ISET",
            Self::Imon => "IMON",
            Self::Trip => "TRIP",
            Self::Stat => "STAT",
        }
    }

    /// Expected type of the parameter's reported value.
    #[must_use]
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Stat => ValueKind::Integer,
            _ => ValueKind::Float,
        }
    }

    /// True for parameters that accept a SET command.
    ///
    /// Monitor-only readings and the status word are read-only.
    #[must_use]
    pub const fn writable(self) -> bool {
        matches!(self, Self::Vset | Self::Iset | Self::Trip)
    }

    /// Formats a setpoint with the device's native decimal precision.
    #[must_use]
    pub fn format_value(self, value: f64) -> String {
        match self {
            Self::Vset | Self::Vmon | Self::Trip => format!("{value:.1}"),
            Self::Iset | Self::Imon => format!("{value:.2}"),
            Self::Stat => format!("{}", value as u32),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "VSET" => Ok(Self::Vset),
            "VMON" => Ok(Self::Vmon),
            "ISET" => Ok(Self::Iset),
            "IMON" => Ok(Self::Imon),
            "TRIP" => Ok(Self::Trip),
            "STAT" => Ok(Self::Stat),
            other => Err(Error::InvalidCommand {
                reason: format!("unknown parameter {other:?}"),
            }),
        }
    }
}

/// An outbound request to the supply. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Read a parameter (`CMD:MON`).
    Read { channel: u8, parameter: Parameter },
    /// Write a parameter setpoint (`CMD:SET`).
    Write {
        channel: u8,
        parameter: Parameter,
        value: f64,
    },
    /// Switch the channel output (`PAR:ON` / `PAR:OFF`).
    Power { channel: u8, on: bool },
    /// Fallback power syntax (`PAR:PW,VAL:ON|OFF`) for firmware that
    /// rejects the bare ON/OFF parameter.
    PowerFallback { channel: u8, on: bool },
    /// Power-down kill (`PAR:PDWN,VAL:KILL`).
    Kill { channel: u8 },
    /// Raw passthrough, sent as-is plus line terminator.
    Raw(String),
}

impl Command {
    /// Encodes the command to its wire line, CRLF-terminated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] if a required field is missing
    /// or invalid for this command kind: an empty raw payload, a write
    /// to a read-only parameter, or a non-finite setpoint.
    pub fn encode(&self, board: Option<u8>) -> Result<Bytes> {
        let line = match self {
            Self::Raw(text) => {
                if text.trim().is_empty() {
                    return Err(Error::InvalidCommand {
                        reason: "raw payload is empty".into(),
                    });
                }
                let mut line = text.clone();
                if !line.ends_with("\r\n") {
                    line.push_str("\r\n");
                }
                return Ok(Bytes::from(line));
            }
            Self::Read { channel, parameter } => {
                format_line(board, *channel, "MON", parameter.name(), None)
            }
            Self::Write {
                channel,
                parameter,
                value,
            } => {
                if !parameter.writable() {
                    return Err(Error::InvalidCommand {
                        reason: format!("{parameter} is read-only"),
                    });
                }
                if !value.is_finite() {
                    return Err(Error::InvalidCommand {
                        reason: format!("{parameter} value must be finite"),
                    });
                }
                format_line(
                    board,
                    *channel,
                    "SET",
                    parameter.name(),
                    Some(parameter.format_value(*value)),
                )
            }
            Self::Power { channel, on } => {
                format_line(board, *channel, "SET", power_par(*on), None)
            }
            Self::PowerFallback { channel, on } => {
                format_line(board, *channel, "SET", "PW", Some(power_par(*on).into()))
            }
            Self::Kill { channel } => {
                format_line(board, *channel, "SET", "PDWN", Some("KILL".into()))
            }
        };
        Ok(Bytes::from(line))
    }

    /// Expected type of the VAL field in this command's reply, if any.
    #[must_use]
    pub const fn value_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Read { parameter, .. } | Self::Write { parameter, .. } => {
                Some(parameter.value_kind())
            }
            _ => None,
        }
    }
}

const fn power_par(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

fn format_line(
    board: Option<u8>,
    channel: u8,
    op: &str,
    par: &str,
    val: Option<String>,
) -> String {
    let mut line = match board {
        Some(bd) => format!("$BD:{bd},CH:{channel},CMD:{op},PAR:{par}"),
        None => format!("$CMD:{op},CH:{channel},PAR:{par}"),
    };
    if let Some(val) = val {
        line.push_str(",VAL:");
        line.push_str(&val);
    }
    line.push_str("\r\n");
    line
}
