use super::session::{Credentials, SessionToken};
use super::status::ReportResolution;
use super::{Check, DowntimeQuery, Location, Record, TimeTuple};
use crate::errors::{PingdomError, Result};
use crate::soap::{SoapConfig, SoapTransport};
use crate::transport::{RpcTransport, RpcValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

const AUTH_LOGIN: &str = "Auth_login";
const AUTH_LOGOUT: &str = "Auth_logout";
const CHECK_GET_LIST: &str = "Check_getList";
const LOCATION_GET_LIST: &str = "Location_getList";
const REPORT_GET_CURRENT_STATES: &str = "Report_getCurrentStates";
const REPORT_GET_DOWNTIMES: &str = "Report_getDowntimes";
const TEST_ECHO: &str = "Test_echo";

/// Resolution a `DowntimeQuery` starts out with.
pub const DEFAULT_RESOLUTION: &str = "DAILY";

/// Pingdom Client. Used to interact with the Pingdom API.
///
/// Every operation blocks for exactly one round trip. The session and the
/// caches are mutated through `&mut self`, so sharing a client between
/// threads requires wrapping it in a `Mutex`.
pub struct Client<T: RpcTransport = SoapTransport> {
    credentials: Credentials,
    api_key: String,
    session: Option<SessionToken>,
    checks: Option<Vec<Check>>,
    locations: Option<Vec<Location>>,
    transport: T,
}

/// Pingdom Client options. Pass this into the `new()` function of the Pingdom Client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The Pingdom account username, usually an email address.
    pub username: String,
    pub password: String,
    /// The API key identifying your application to Pingdom.
    pub api_key: String,
}

impl Client<SoapTransport> {
    /// Creates a new Pingdom client against the public SOAP endpoint and logs in.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_soap_config(options, SoapConfig::default())
    }

    /// Creates a new Pingdom client against a custom SOAP endpoint and logs in.
    pub fn with_soap_config(options: ClientOptions, config: SoapConfig) -> Result<Self> {
        Self::with_transport(options, SoapTransport::new(config)?)
    }
}

impl<T: RpcTransport> Client<T> {
    /// Creates a new Pingdom client on top of `transport` and logs in.
    ///
    /// Fails with `PingdomError::Service` if the login is rejected. The
    /// transport is dropped with the half-built client in that case.
    pub fn with_transport(options: ClientOptions, transport: T) -> Result<Self> {
        // Verify that all options passed are in the right format
        if options.username.is_empty() {
            return Err(PingdomError::InvalidUsername);
        }

        if options.api_key.is_empty() {
            return Err(PingdomError::InvalidApiKey);
        }

        let mut client = Self {
            credentials: Credentials::new(options.username, options.password),
            api_key: options.api_key,
            session: None,
            checks: None,
            locations: None,
            transport,
        };

        client.login()?;

        Ok(client)
    }

    pub fn logged_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn session_token(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    /// All checks on the account. Fetched on first access and cached for the
    /// lifetime of the client.
    pub fn checks(&mut self) -> Result<&[Check]> {
        if self.checks.is_none() {
            let payload = self.call(CHECK_GET_LIST, Vec::new())?;
            self.checks = Some(items(payload)?);
        }

        Ok(self.checks.as_deref().unwrap_or_default())
    }

    /// All monitoring locations. Fetched on first access and cached for the
    /// lifetime of the client.
    pub fn locations(&mut self) -> Result<&[Location]> {
        if self.locations.is_none() {
            let payload = self.call(LOCATION_GET_LIST, Vec::new())?;
            self.locations = Some(items(payload)?);
        }

        Ok(self.locations.as_deref().unwrap_or_default())
    }

    /// Current state of every check. Never cached.
    pub fn states(&mut self) -> Result<Vec<Record>> {
        let payload = self.call(REPORT_GET_CURRENT_STATES, Vec::new())?;
        items(payload)
    }

    /// Downtime report for the check named `check` between `from` and `to`.
    /// `resolution` is the wire name, see `DEFAULT_RESOLUTION`.
    pub fn downtimes_for(
        &mut self,
        check: &str,
        from: impl Into<TimeTuple>,
        to: impl Into<TimeTuple>,
        resolution: &str,
    ) -> Result<Vec<Record>> {
        self.downtimes(&DowntimeQuery::new(check, from, to).resolution(resolution))
    }

    /// Validates `query` and fetches its downtime report.
    ///
    /// Validation happens in order, and the first failure is returned before
    /// any report request is sent:
    /// 1. equal start and end times
    /// 2. an unknown resolution
    /// 3. a check name missing from `checks()`
    /// 4. a missing check, start or end
    pub fn downtimes(&mut self, query: &DowntimeQuery) -> Result<Vec<Record>> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from == to {
                return Err(PingdomError::InvalidArgument(
                    "start and end time must differ".to_string(),
                ));
            }
        }

        let resolution = ReportResolution::from_wire(&query.resolution).ok_or_else(|| {
            PingdomError::InvalidArgument(format!(
                "invalid report resolution: {:?}",
                query.resolution
            ))
        })?;

        if let Some(name) = query.check.as_deref() {
            let known = self.checks()?.iter().any(|check| check.name() == Some(name));
            if !known {
                return Err(PingdomError::CheckNotFound(name.to_string()));
            }
        }

        let check = query
            .check
            .as_deref()
            .ok_or(PingdomError::MissingArgument("check"))?;
        let from = query.from.ok_or(PingdomError::MissingArgument("from"))?;
        let to = query.to.ok_or(PingdomError::MissingArgument("to"))?;

        let params = RpcValue::Struct(vec![
            ("checkName".to_string(), RpcValue::from(check)),
            ("from".to_string(), RpcValue::from(from.to_datetime()?)),
            ("to".to_string(), RpcValue::from(to.to_datetime()?)),
            ("resolution".to_string(), RpcValue::from(resolution.as_wire())),
        ]);

        let payload = self.call(REPORT_GET_DOWNTIMES, vec![params])?;
        items(payload)
    }

    /// Sends `input` to the service and returns what it echoes back.
    pub fn echo(&mut self, input: &str) -> Result<String> {
        let payload = self.call(TEST_ECHO, vec![RpcValue::from(input)])?;

        match payload {
            Value::String(echoed) => Ok(echoed),
            other => Err(PingdomError::FailedToDecode(format!(
                "expected a string from {}, got {}",
                TEST_ECHO, other
            ))),
        }
    }

    /// Ends the session. The client cannot be used afterwards.
    ///
    /// Prefer this over relying on `Drop`, which can only log a failure.
    pub fn logout(mut self) -> Result<()> {
        self.end_session()
    }

    fn login(&mut self) -> Result<()> {
        debug!(username = %self.credentials.username, "[AUTH] Authenticating...");

        let payload = self.call(AUTH_LOGIN, Vec::new())?;
        let token = match payload {
            Value::String(token) => token,
            other => {
                return Err(PingdomError::FailedToDecode(format!(
                    "expected a session id from {}, got {}",
                    AUTH_LOGIN, other
                )))
            }
        };

        self.session = Some(SessionToken::new(token));
        info!(username = %self.credentials.username, "[AUTH] Successfully authenticated.");

        Ok(())
    }

    /// Logs out if a session is held. The token is released before the call,
    /// so a failed logout is never retried.
    fn end_session(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        self.dispatch(AUTH_LOGOUT, RpcValue::from(session.as_str()), Vec::new())?;

        info!(username = %self.credentials.username, "[AUTH] Logged out.");
        Ok(())
    }

    /// Dispatches `method`. The API key always goes first, followed by the
    /// credentials for login or the session token for everything else, then
    /// `extra` in order.
    fn call(&mut self, method: &str, extra: Vec<RpcValue>) -> Result<Value> {
        let second = if method == AUTH_LOGIN {
            self.credentials.to_rpc()
        } else {
            let session = self.session.as_ref().ok_or(PingdomError::NotLoggedIn)?;
            RpcValue::from(session.as_str())
        };

        self.dispatch(method, second, extra)
    }

    fn dispatch(&mut self, method: &str, second: RpcValue, extra: Vec<RpcValue>) -> Result<Value> {
        let mut args = Vec::with_capacity(extra.len() + 2);
        args.push(RpcValue::from(self.api_key.as_str()));
        args.push(second);
        args.extend(extra);

        debug!(method, "calling Pingdom API");
        self.transport.call(method, &args)?.into_payload()
    }
}

impl<T: RpcTransport> Drop for Client<T> {
    fn drop(&mut self) {
        if let Err(err) = self.end_session() {
            warn!(username = %self.credentials.username, error = %err, "[AUTH] Failed to log out");
        }
    }
}

impl<T: RpcTransport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.credentials.username)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Reads the `item` list of a list payload. An empty payload yields no records.
fn items<I: DeserializeOwned>(payload: Value) -> Result<Vec<I>> {
    let list = match payload {
        Value::Object(fields) if fields.is_empty() => Value::Null,
        Value::Object(mut fields) => fields.remove("item").ok_or_else(|| {
            PingdomError::FailedToDecode("response carries no item list".to_string())
        })?,
        other => other,
    };

    let list = match list {
        Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::Array(items) => items,
        single => vec![single],
    };

    list.into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|err| PingdomError::FailedToDecode(err.to_string()))
        })
        .collect()
}
