//! Client for the Pingdom SOAP monitoring API.
//!
//! ```no_run
//! use pingdom_client::{Client, ClientOptions, TimeTuple};
//!
//! fn main() -> pingdom_client::Result<()> {
//!     let mut client = Client::new(ClientOptions {
//!         username: "ops@example.com".to_string(),
//!         password: "secret".to_string(),
//!         api_key: "my-application-key".to_string(),
//!     })?;
//!
//!     for check in client.checks()? {
//!         println!("{:?}", check.name());
//!     }
//!
//!     let report = client.downtimes_for(
//!         "web",
//!         TimeTuple::new(2009, 1, 1, 0, 0, 0),
//!         TimeTuple::new(2009, 2, 1, 0, 0, 0),
//!         "WEEKLY",
//!     )?;
//!     println!("{} downtime rows", report.len());
//!
//!     client.logout()
//! }
//! ```

mod errors;
pub mod soap;
mod structs;
pub mod transport;

pub use errors::{PingdomError, Result};
pub use soap::{SoapConfig, SoapTransport};
pub use structs::client::{Client, ClientOptions, DEFAULT_RESOLUTION};
pub use structs::session::{Credentials, SessionToken};
pub use structs::status::{CheckResult, ReportResolution, StatusCode};
pub use structs::{Check, DowntimeQuery, Location, Record, TimeTuple};
pub use transport::{RpcResponse, RpcTransport, RpcValue};

#[cfg(test)]
mod tests;
