//! Reply line parsing for the CAEN text protocol.
//!
//! Replies are single lines of the form `#CMD:OK[,VAL:<v>];` on success
//! or `#CMD:ERR,...;` / `#ERR:<code>;` on rejection. Anything else is
//! malformed and surfaces as an error rather than being coerced to a
//! default reading.

use crate::error::{Error, Result};

/// Prefix of a successful reply.
const OK_PREFIX: &str = "#CMD:OK";

/// Prefixes of device rejection replies.
const ERR_PREFIXES: [&str; 2] = ["#CMD:ERR", "#ERR"];

/// Expected type of a reply's VAL field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Voltage, current or trip time with native decimal formatting.
    Float,
    /// Non-negative status word, decimal or `0x`-prefixed hex.
    Integer,
}

/// A parsed VAL payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Integer(u32),
    /// Raw text for replies whose type is not known up front.
    Text(String),
}

impl Value {
    /// The value as a float, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(f64::from(*v)),
            Self::Text(_) => None,
        }
    }

    /// The value as a non-negative integer.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// The parsed result of one command.
///
/// Each response correlates 1:1 with exactly one command by emission
/// order; the protocol has no request IDs.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Parsed VAL field, if the reply carried one.
    pub value: Option<Value>,
    /// The reply line as received, trimmed.
    pub raw: String,
}

impl Response {
    /// Parses one reply line.
    ///
    /// `kind` is the expected VAL type taken from the command that
    /// elicited this reply; `None` means the type is not known up front
    /// (raw passthrough, power acks) and the value is kept as text when
    /// it does not parse as a float.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceRejected`] for an ERR reply, [`Error::MalformedResponse`]
    /// for a line matching neither shape or a VAL that fails to parse as
    /// the expected type.
    pub fn decode(line: &str, kind: Option<ValueKind>) -> Result<Self> {
        let raw = line.trim().to_owned();

        if raw.starts_with(OK_PREFIX) {
            let value = match extract_val(&raw) {
                Some(text) => Some(parse_value(text, kind, &raw)?),
                None => None,
            };
            return Ok(Self { value, raw });
        }

        if ERR_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            return Err(Error::DeviceRejected { token: raw });
        }

        Err(Error::MalformedResponse { line: raw })
    }

    /// True if the reply carried a VAL field.
    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Extracts the VAL field from a comma-separated reply.
fn extract_val(line: &str) -> Option<&str> {
    line.split(',')
        .find_map(|token| token.strip_prefix("VAL:"))
        .map(|v| v.trim_end_matches(';'))
}

fn parse_value(text: &str, kind: Option<ValueKind>, raw: &str) -> Result<Value> {
    match kind {
        Some(ValueKind::Float) => text.parse::<f64>().map(Value::Float).map_err(|_| {
            Error::MalformedResponse {
                line: raw.to_owned(),
            }
        }),
        Some(ValueKind::Integer) => parse_stat(text)
            .map(Value::Integer)
            .ok_or_else(|| Error::MalformedResponse {
                line: raw.to_owned(),
            }),
        None => Ok(text
            .parse::<f64>()
            .map_or_else(|_| Value::Text(text.to_owned()), Value::Float)),
    }
}

/// Parses a status word, accepting decimal and `0x`-prefixed hex.
fn parse_stat(text: &str) -> Option<u32> {
    let t = text.trim().to_ascii_lowercase();
    if let Some(hex) = t.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()
    } else {
        t.parse::<u32>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ok_with_float_val() {
        let resp = Response::decode("#CMD:OK,VAL:500.0;\r\n", Some(ValueKind::Float)).unwrap();
        assert_eq!(resp.value, Some(Value::Float(500.0)));
        assert_eq!(resp.raw, "#CMD:OK,VAL:500.0;");
    }

    #[test]
    fn test_decode_ok_with_decimal_stat() {
        let resp = Response::decode("#CMD:OK,VAL:13;", Some(ValueKind::Integer)).unwrap();
        assert_eq!(resp.value, Some(Value::Integer(13)));
    }

    #[test]
    fn test_decode_ok_with_hex_stat() {
        let resp = Response::decode("#CMD:OK,VAL:0x1001;", Some(ValueKind::Integer)).unwrap();
        assert_eq!(resp.value, Some(Value::Integer(0x1001)));
    }

    #[test]
    fn test_decode_ok_without_val() {
        let resp = Response::decode("#CMD:OK;", None).unwrap();
        assert!(!resp.has_value());
    }

    #[test]
    fn test_decode_err_token_surfaces_rejection() {
        let err = Response::decode("#CMD:ERR,PAR;", None).unwrap_err();
        assert!(matches!(err, Error::DeviceRejected { token } if token == "#CMD:ERR,PAR;"));

        let err = Response::decode("#ERR:2;", None).unwrap_err();
        assert!(matches!(err, Error::DeviceRejected { .. }));
    }

    #[test]
    fn test_decode_unrecognized_line_is_malformed() {
        let err = Response::decode("HELLO WORLD", None).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));

        // An empty line after trimming is malformed too, never a default.
        let err = Response::decode("\r\n", Some(ValueKind::Float)).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_decode_unparseable_val_is_malformed() {
        let err = Response::decode("#CMD:OK,VAL:abc;", Some(ValueKind::Float)).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));

        // A negative status word is out of domain.
        let err = Response::decode("#CMD:OK,VAL:-1;", Some(ValueKind::Integer)).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_decode_untyped_val_falls_back_to_text() {
        let resp = Response::decode("#CMD:OK,VAL:RAMPING;", None).unwrap();
        assert_eq!(resp.value, Some(Value::Text("RAMPING".into())));

        let resp = Response::decode("#CMD:OK,VAL:1.5;", None).unwrap();
        assert_eq!(resp.value, Some(Value::Float(1.5)));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(7).as_f64(), Some(7.0));
        assert_eq!(Value::Float(1.5).as_u32(), None);
        assert_eq!(Value::Integer(7).as_u32(), Some(7));
        assert_eq!(Value::Text("x".into()).as_f64(), None);
    }
}
