//! HTTP client for the project management server.
//!
//! Every endpoint answers with the same JSON envelope
//! `{status: bool, message: string, data?: ...}`. The client normalises each
//! response into [`Envelope`] and draws a hard line between transport
//! failures (unreachable server, non-JSON body, missing boolean `status`)
//! and business failures (`status: false` with a human-readable `message`).
//! The HTTP status code itself is deliberately ignored; the envelope alone
//! decides.
//!
//! The client carries no global state: construct one and pass it to whatever
//! needs it. It is cheap to clone.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Shown for any transport-level failure, matching the server's own locale.
pub const MSG_SERVER_UNREACHABLE: &str = "Sunucu ile bağlantı kurulamadı.";

/// Fallback when a business failure arrives with an empty message.
pub const MSG_OPERATION_FAILED: &str = "İşlem başarısız.";

/// Uniform response wrapper the server emits for every endpoint.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    /// Business outcome. `false` means the server rejected the operation and
    /// `message` says why.
    pub status: bool,
    /// Human-readable server message, shown verbatim on failure.
    pub message: String,
    /// Payload, decoded only when `status` is true and the field is present.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// The message to show the user, falling back to a generic one when the
    /// server sent none.
    pub fn user_message(&self) -> &str {
        if self.message.is_empty() {
            MSG_OPERATION_FAILED
        } else {
            &self.message
        }
    }
}

/// Errors raised by the HTTP client. All of these are transport-level;
/// business failures travel inside [`Envelope`] instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {endpoint} is not a valid envelope: {reason}")]
    BadEnvelope { endpoint: String, reason: String },

    #[error("response data from {endpoint} has unexpected shape: {source}")]
    Data {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// The generic message shown to the user for any transport failure.
    pub fn user_message(&self) -> &'static str {
        MSG_SERVER_UNREACHABLE
    }
}

/// Blocking JSON client bound to a base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Build a client for the given base URL. A trailing slash is tolerated.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(ApiError::Client)?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Query-string-encoded GET.
    pub fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self.http.get(self.url(endpoint)).query(params);
        self.execute(endpoint, builder)
    }

    /// GET with the session key attached alongside any other parameters.
    pub fn auth_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self
            .http
            .get(self.url(endpoint))
            .query(&[("key", key.to_string())])
            .query(params);
        self.execute(endpoint, builder)
    }

    /// POST with a JSON body.
    pub fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self.http.post(self.url(endpoint)).json(body);
        self.execute(endpoint, builder)
    }

    /// PUT with a JSON body.
    pub fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self.http.put(self.url(endpoint)).json(body);
        self.execute(endpoint, builder)
    }

    /// DELETE with a JSON body.
    #[allow(dead_code)]
    pub fn delete<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self.http.delete(self.url(endpoint)).json(body);
        self.execute(endpoint, builder)
    }

    fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = builder.send().map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let body = response.text().map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let envelope = parse_envelope(endpoint, &body)?;
        log::debug!(
            "{}: status={} message={:?}",
            endpoint,
            envelope.status,
            envelope.message
        );
        Ok(envelope)
    }
}

/// Parse a raw response body into an envelope.
///
/// The body must be JSON with a boolean `status` field; anything else is a
/// malformed envelope. `data` is decoded only on success; failure envelopes
/// may carry arbitrary junk there and nobody reads it.
fn parse_envelope<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<Envelope<T>, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|_| ApiError::BadEnvelope {
        endpoint: endpoint.to_string(),
        reason: "body is not JSON".to_string(),
    })?;
    let Some(status) = value.get("status").and_then(Value::as_bool) else {
        return Err(ApiError::BadEnvelope {
            endpoint: endpoint.to_string(),
            reason: "missing boolean `status` field".to_string(),
        });
    };
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = if status {
        match value.get("data") {
            None | Some(Value::Null) => None,
            Some(d) => Some(serde_json::from_value(d.clone()).map_err(|source| {
                ApiError::Data {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?),
        }
    } else {
        None
    };
    Ok(Envelope {
        status,
        message,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_json_body_is_transport_error() {
        let err = parse_envelope::<Value>("x", "not json").unwrap_err();
        assert!(matches!(err, ApiError::BadEnvelope { .. }));
    }

    #[test]
    fn test_missing_status_is_transport_error() {
        let err = parse_envelope::<Value>("x", r#"{"message":"hi"}"#).unwrap_err();
        assert!(matches!(err, ApiError::BadEnvelope { .. }));
        // A non-boolean status is just as malformed.
        let err = parse_envelope::<Value>("x", r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, ApiError::BadEnvelope { .. }));
    }

    #[test]
    fn test_business_failure_carries_message() {
        let env = parse_envelope::<Value>("x", r#"{"status":false,"message":"Yetkisiz."}"#)
            .unwrap();
        assert!(!env.status);
        assert_eq!(env.message, "Yetkisiz.");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_success_decodes_data() {
        #[derive(serde::Deserialize)]
        struct D {
            key: String,
        }
        let env =
            parse_envelope::<D>("x", r#"{"status":true,"message":"","data":{"key":"abc"}}"#)
                .unwrap();
        assert!(env.status);
        assert_eq!(env.data.unwrap().key, "abc");
    }

    #[test]
    fn test_missing_message_defaults_to_empty() {
        let env = parse_envelope::<Value>("x", r#"{"status":true}"#).unwrap();
        assert!(env.status);
        assert_eq!(env.message, "");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_failure_data_is_not_decoded() {
        #[derive(serde::Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            must_exist: String,
        }
        // Junk data on a failure envelope must not produce a decode error.
        let env = parse_envelope::<Strict>(
            "x",
            r#"{"status":false,"message":"no","data":{"other":1}}"#,
        )
        .unwrap();
        assert!(!env.status);
        assert!(env.data.is_none());
    }

    // -- live socket tests ---------------------------------------------------

    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;
    use std::thread;

    /// One-request HTTP stub: answers with the canned body and hands the raw
    /// request back through the join handle.
    fn serve_once(body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(request) = complete_request(&raw) {
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    stream.write_all(response.as_bytes()).unwrap();
                    return request;
                }
                if n == 0 {
                    return String::from_utf8_lossy(&raw).into_owned();
                }
            }
        });
        (base, handle)
    }

    /// A request is complete once the headers ended and `Content-Length`
    /// further bytes, if announced, have arrived.
    fn complete_request(raw: &[u8]) -> Option<String> {
        let head_end = raw.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let head = String::from_utf8_lossy(&raw[..head_end]);
        let body_len = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        if raw.len() >= head_end + body_len {
            Some(String::from_utf8_lossy(raw).into_owned())
        } else {
            None
        }
    }

    #[test]
    fn test_get_builds_query_and_decodes_data() {
        let (base, server) = serve_once(r#"{"status":true,"message":"","data":{"logs":[]}}"#);
        let client = ApiClient::new(&base).unwrap();
        let env = client
            .get::<crate::models::LogsData>(
                "general/getLogs",
                &[("user_code", "u1".to_string())],
            )
            .unwrap();
        assert!(env.status);
        assert!(env.data.unwrap().logs.is_empty());

        let request = server.join().unwrap();
        assert!(
            request.starts_with("GET /general/getLogs?user_code=u1 "),
            "unexpected request line: {request}"
        );
    }

    #[test]
    fn test_auth_get_sends_key_first() {
        let (base, server) =
            serve_once(r#"{"status":true,"message":"","data":{"auth":"u1"}}"#);
        let client = ApiClient::new(&base).unwrap();
        let env = client
            .auth_get::<crate::models::AuthCheckData>("auth/check", "k9", &[])
            .unwrap();
        assert_eq!(env.data.unwrap().auth.as_deref(), Some("u1"));

        let request = server.join().unwrap();
        assert!(
            request.starts_with("GET /auth/check?key=k9 "),
            "unexpected request line: {request}"
        );
    }

    #[test]
    fn test_post_sends_json_body_and_passes_failure_through() {
        let (base, server) = serve_once(r#"{"status":false,"message":"Giriş başarısız."}"#);
        let client = ApiClient::new(&base).unwrap();
        let payload = crate::models::LoginPayload {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
        };
        let env = client.post::<Value, _>("auth/login", &payload).unwrap();
        assert!(!env.status);
        assert_eq!(env.message, "Giriş başarısız.");
        assert!(env.data.is_none());

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /auth/login "));
        assert!(request.contains(r#""email":"a@b.c""#));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
    }

    #[test]
    fn test_delete_sends_json_body() {
        let (base, server) = serve_once(r#"{"status":true,"message":"Silindi.","data":null}"#);
        let client = ApiClient::new(&base).unwrap();
        let body = serde_json::json!({ "task_id": 7 });
        let env = client.delete::<Value, _>("tasks/removeTask", &body).unwrap();
        assert!(env.status);

        let request = server.join().unwrap();
        assert!(request.starts_with("DELETE /tasks/removeTask "));
        assert!(request.contains(r#""task_id":7"#));
    }

    #[test]
    fn test_html_error_page_is_bad_envelope() {
        let (base, server) = serve_once("<html>502 Bad Gateway</html>");
        let client = ApiClient::new(&base).unwrap();
        let err = client.get::<Value>("general/dashboard", &[]).unwrap_err();
        assert!(matches!(err, ApiError::BadEnvelope { .. }));
        let _ = server.join();
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        // Port 1 refuses connections immediately; nothing listens there.
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let err = client.get::<Value>("x", &[]).unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
