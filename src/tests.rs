use std::io;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::transport::MockRpcTransport;
use crate::{
    Client, ClientOptions, DowntimeQuery, PingdomError, RpcResponse, RpcValue, StatusCode,
    TimeTuple,
};

const API_KEY: &str = "0123456789abcdef";
const SESSION: &str = "session-1";

fn options() -> ClientOptions {
    ClientOptions {
        username: "ops@example.com".to_string(),
        password: "hunter2".to_string(),
        api_key: API_KEY.to_string(),
    }
}

fn expect_login(transport: &mut MockRpcTransport) {
    transport
        .expect_call()
        .withf(|method, _| method == "Auth_login")
        .times(1)
        .returning(|_, _| Ok(RpcResponse::ok(json!(SESSION))));
}

fn expect_logout(transport: &mut MockRpcTransport, status: i32) {
    transport
        .expect_call()
        .withf(|method, args| {
            method == "Auth_logout" && args == [RpcValue::from(API_KEY), RpcValue::from(SESSION)]
        })
        .times(1)
        .returning(move |_, _| Ok(RpcResponse::new(status, serde_json::Value::Null)));
}

/// A client that logged in and will log out cleanly when dropped.
fn client_with(setup: impl FnOnce(&mut MockRpcTransport)) -> Client<MockRpcTransport> {
    let mut transport = MockRpcTransport::new();
    expect_login(&mut transport);
    setup(&mut transport);
    expect_logout(&mut transport, 0);

    Client::with_transport(options(), transport).unwrap()
}

fn check_list() -> serde_json::Value {
    json!({ "item": [
        { "name": "web", "type": "HTTP" },
        { "name": "mail", "type": "SMTP" }
    ] })
}

fn expect_check_list(transport: &mut MockRpcTransport) {
    transport
        .expect_call()
        .withf(|method, args| method == "Check_getList" && args.len() == 2)
        .times(1)
        .returning(|_, _| Ok(RpcResponse::ok(check_list())));
}

fn jan() -> TimeTuple {
    TimeTuple::new(2009, 1, 1, 0, 0, 0)
}

fn feb() -> TimeTuple {
    TimeTuple::new(2009, 2, 1, 0, 0, 0)
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn login_sends_api_key_and_credentials() {
    let mut transport = MockRpcTransport::new();
    transport
        .expect_call()
        .withf(|method, args| {
            method == "Auth_login"
                && args.len() == 2
                && args[0] == RpcValue::from(API_KEY)
                && args[1].member("username") == Some(&RpcValue::from("ops@example.com"))
                && args[1].member("password") == Some(&RpcValue::from("hunter2"))
        })
        .times(1)
        .returning(|_, _| Ok(RpcResponse::ok(json!(SESSION))));
    expect_logout(&mut transport, 0);

    let client = Client::with_transport(options(), transport).unwrap();

    assert!(client.logged_in());
    assert_eq!(client.session_token().map(|s| s.as_str()), Some(SESSION));
    assert_eq!(client.username(), "ops@example.com");
    assert_eq!(client.api_key(), API_KEY);
}

#[test]
fn rejected_login_fails_construction_without_logout() {
    let mut transport = MockRpcTransport::new();
    transport
        .expect_call()
        .withf(|method, _| method == "Auth_login")
        .times(1)
        .returning(|_, _| Ok(RpcResponse::new(7, serde_json::Value::Null)));

    let err = Client::with_transport(options(), transport).unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::WrongAuthentication));
    assert_eq!(err.to_string(), "Error 7: Wrong Authentication");
}

#[test]
fn empty_options_are_rejected_before_any_call() {
    let mut options = options();
    options.api_key.clear();

    let err = Client::with_transport(options, MockRpcTransport::new()).unwrap_err();

    assert!(matches!(err, PingdomError::InvalidApiKey));
    assert!(err.is_validation());
}

#[test]
fn checks_are_fetched_once() {
    let mut client = client_with(expect_check_list);

    for _ in 0..3 {
        let checks = client.checks().unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name(), Some("web"));
    }
}

#[test]
fn locations_are_cached_independently_of_checks() {
    let mut client = client_with(|transport| {
        expect_check_list(transport);
        transport
            .expect_call()
            .withf(|method, args| method == "Location_getList" && args[1] == RpcValue::from(SESSION))
            .times(1)
            .returning(|_, _| {
                Ok(RpcResponse::ok(json!({ "item": [{ "name": "Amsterdam", "country": "NL" }] })))
            });
    });

    assert_eq!(client.locations().unwrap().len(), 1);
    assert_eq!(client.checks().unwrap().len(), 2);
    assert_eq!(client.locations().unwrap().len(), 1);
    assert_eq!(
        client.locations().unwrap()[0].fields().get("country"),
        Some(&json!("NL"))
    );
}

#[test]
fn states_are_fetched_on_every_access() {
    let mut client = client_with(|transport| {
        transport
            .expect_call()
            .withf(|method, _| method == "Report_getCurrentStates")
            .times(3)
            .returning(|_, _| {
                Ok(RpcResponse::ok(json!({ "item": [
                    { "checkName": "web", "checkState": "CHECK_UP" }
                ] })))
            });
    });

    for _ in 0..3 {
        let states = client.states().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].get("checkState"), Some(&json!("CHECK_UP")));
    }
}

#[test]
fn empty_list_payload_yields_no_records() {
    let mut client = client_with(|transport| {
        transport
            .expect_call()
            .withf(|method, _| method == "Report_getCurrentStates")
            .times(1)
            .returning(|_, _| Ok(RpcResponse::ok(json!({}))));
    });

    assert!(client.states().unwrap().is_empty());
}

#[test]
fn list_payload_without_items_fails_and_is_not_cached() {
    let mut client = client_with(|transport| {
        transport
            .expect_call()
            .withf(|method, _| method == "Check_getList")
            .times(2)
            .returning(|_, _| Ok(RpcResponse::ok(json!({ "checks": [{ "name": "web" }] }))));
    });

    for _ in 0..2 {
        let err = client.checks().unwrap_err();
        assert!(matches!(err, PingdomError::FailedToDecode(ref reason) if reason.contains("no item list")));
    }
}

#[test]
fn equal_start_and_end_is_rejected_without_calls() {
    let mut client = client_with(|_| {});

    let err = client.downtimes_for("web", jan(), jan(), "DAILY").unwrap_err();

    assert!(matches!(err, PingdomError::InvalidArgument(ref reason) if reason.contains("must differ")));
}

#[test]
fn unknown_resolution_is_rejected_without_calls() {
    let mut client = client_with(|_| {});

    let err = client.downtimes_for("web", jan(), feb(), "HOURLY").unwrap_err();

    assert!(matches!(err, PingdomError::InvalidArgument(ref reason) if reason.contains("HOURLY")));
}

#[test]
fn blank_resolution_is_rejected_before_missing_fields() {
    let mut client = client_with(|_| {});

    let query = DowntimeQuery {
        check: None,
        from: Some(jan()),
        to: Some(feb()),
        resolution: String::new(),
    };
    let err = client.downtimes(&query).unwrap_err();

    assert!(matches!(err, PingdomError::InvalidArgument(ref reason) if reason.contains("resolution")));
}

#[test]
fn unknown_check_is_not_found_after_fetching_checks() {
    let mut client = client_with(expect_check_list);

    let err = client.downtimes_for("ftp", jan(), feb(), "DAILY").unwrap_err();

    assert!(matches!(err, PingdomError::CheckNotFound(ref name) if name == "ftp"));
}

#[test]
fn missing_fields_are_reported_last() {
    let mut client = client_with(expect_check_list);

    let no_check = DowntimeQuery {
        check: None,
        from: Some(jan()),
        to: Some(feb()),
        ..DowntimeQuery::default()
    };
    assert!(matches!(
        client.downtimes(&no_check),
        Err(PingdomError::MissingArgument("check"))
    ));

    let no_end = DowntimeQuery {
        check: Some("web".to_string()),
        from: Some(jan()),
        to: None,
        resolution: "MONTHLY".to_string(),
    };
    assert!(matches!(
        client.downtimes(&no_end),
        Err(PingdomError::MissingArgument("to"))
    ));
}

#[test]
fn downtimes_send_report_parameters() {
    let mut client = client_with(|transport| {
        expect_check_list(transport);
        transport
            .expect_call()
            .withf(|method, args| {
                let from = jan().to_datetime().ok().map(RpcValue::from);
                let to = feb().to_datetime().ok().map(RpcValue::from);
                match args {
                    [key, session, params] if method == "Report_getDowntimes" => {
                        *key == RpcValue::from(API_KEY)
                            && *session == RpcValue::from(SESSION)
                            && params.member("checkName") == Some(&RpcValue::from("mail"))
                            && params.member("resolution") == Some(&RpcValue::from("WEEKLY"))
                            && params.member("from") == from.as_ref()
                            && params.member("to") == to.as_ref()
                    }
                    _ => false,
                }
            })
            .times(1)
            .returning(|_, _| {
                Ok(RpcResponse::ok(json!({ "item": [
                    { "from": "2009-01-05T00:00:00", "downtime": 360 },
                    { "from": "2009-01-12T00:00:00", "downtime": 0 }
                ] })))
            });
    });

    let report = client.downtimes_for("mail", jan(), feb(), "WEEKLY").unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(report[0].get("downtime"), Some(&json!(360)));
}

#[test]
fn query_resolution_defaults_to_daily() {
    let mut client = client_with(|transport| {
        expect_check_list(transport);
        transport
            .expect_call()
            .withf(|method, args| {
                method == "Report_getDowntimes"
                    && args[2].member("resolution") == Some(&RpcValue::from("DAILY"))
            })
            .times(1)
            .returning(|_, _| Ok(RpcResponse::ok(json!({ "item": [] }))));
    });

    let report = client
        .downtimes(&DowntimeQuery::new("web", jan(), feb()))
        .unwrap();

    assert!(report.is_empty());
}

#[test]
fn echo_round_trips_input() {
    let mut client = client_with(|transport| {
        transport
            .expect_call()
            .withf(|method, args| method == "Test_echo" && args.len() == 3)
            .times(1)
            .returning(|_, args| {
                let input = args[2].as_str().unwrap_or_default().to_string();
                Ok(RpcResponse::ok(json!(input)))
            });
    });

    assert_eq!(client.echo("hello").unwrap(), "hello");
}

#[test]
fn service_errors_carry_status_code() {
    let mut client = client_with(|transport| {
        transport
            .expect_call()
            .withf(|method, _| method == "Test_echo")
            .times(1)
            .returning(|_, _| Ok(RpcResponse::new(4, serde_json::Value::Null)));
    });

    let err = client.echo("hello").unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::InternalError));
    assert!(!err.is_validation());
}

#[test]
fn transport_errors_propagate_unchanged() {
    let mut client = client_with(|transport| {
        transport
            .expect_call()
            .withf(|method, _| method == "Check_getList")
            .times(1)
            .returning(|_, _| Err(PingdomError::RequestFailed("connection reset".to_string())));
    });

    let err = client.checks().unwrap_err();

    assert!(matches!(err, PingdomError::RequestFailed(ref reason) if reason == "connection reset"));
}

#[test]
fn explicit_logout_ends_session_once() {
    let mut transport = MockRpcTransport::new();
    expect_login(&mut transport);
    expect_logout(&mut transport, 0);

    let client = Client::with_transport(options(), transport).unwrap();

    assert!(client.logout().is_ok());
}

#[test]
fn failed_explicit_logout_is_returned_and_not_retried() {
    let mut transport = MockRpcTransport::new();
    expect_login(&mut transport);
    expect_logout(&mut transport, 6);

    let client = Client::with_transport(options(), transport).unwrap();

    let err = client.logout().unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::WrongAuthorization));
}

#[test]
fn drop_logs_out_once() {
    let client = client_with(|_| {});

    drop(client);
}

#[test]
fn failed_logout_on_drop_is_logged_not_raised() {
    let mut transport = MockRpcTransport::new();
    expect_login(&mut transport);
    expect_logout(&mut transport, 4);
    let client = Client::with_transport(options(), transport).unwrap();

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || drop(client));

    let output = logs.contents();
    assert!(output.contains("Failed to log out"));
    assert!(output.contains("Error 4: Internal Error"));
}

#[test]
fn debug_output_hides_session_token() {
    let client = client_with(|_| {});

    let debug = format!("{:?}", client);

    assert!(debug.contains("ops@example.com"));
    assert!(!debug.contains(SESSION));
}
