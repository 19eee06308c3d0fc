//! Protocol layer for the CAEN text command protocol.
//!
//! This module contains the codec for the line-oriented wire syntax:
//! command encoding, reply parsing, and STAT bitmask decoding.

pub mod command;
pub mod response;
pub mod status;

pub use command::{Command, Parameter};
pub use response::{Response, Value, ValueKind};
pub use status::StatusFlags;
