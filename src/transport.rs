//! The RPC seam between [`Client`](crate::Client) and the wire.
//!
//! A transport invokes a named remote procedure with positional arguments
//! and hands back a uniform [`RpcResponse`]. Protocol irregularities, such as
//! `Auth_logout` embedding its status inside a struct, are normalized by the
//! transport so the client never has to special-case them.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::errors::{PingdomError, Result};
use crate::structs::status::StatusCode;

/// An argument passed to a remote procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    String(String),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Named members, in order.
    Struct(Vec<(String, RpcValue)>),
}

impl RpcValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up a member of a struct value by name.
    pub fn member(&self, name: &str) -> Option<&RpcValue> {
        match self {
            Self::Struct(members) => members.iter().find(|(key, _)| key == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for RpcValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RpcValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for RpcValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for RpcValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDateTime> for RpcValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Uniform `(status, payload)` result of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub status: i32,
    pub payload: Value,
}

impl RpcResponse {
    pub fn new(status: i32, payload: Value) -> Self {
        Self { status, payload }
    }

    /// A successful response carrying `payload`.
    pub fn ok(payload: Value) -> Self {
        Self::new(0, payload)
    }

    /// Turns a non-zero status into [`PingdomError::Service`].
    pub fn into_payload(self) -> Result<Value> {
        match StatusCode::from_code(self.status) {
            StatusCode::Ok => Ok(self.payload),
            status => Err(PingdomError::Service(status)),
        }
    }
}

/// Invokes named remote procedures.
///
/// Implementations block until the response is available. Transport-level
/// failures are returned as-is and never reinterpreted as service errors.
#[cfg_attr(test, mockall::automock)]
pub trait RpcTransport {
    fn call(&mut self, method: &str, args: &[RpcValue]) -> Result<RpcResponse>;
}

impl<T: RpcTransport + ?Sized> RpcTransport for Box<T> {
    fn call(&mut self, method: &str, args: &[RpcValue]) -> Result<RpcResponse> {
        (**self).call(method, args)
    }
}
