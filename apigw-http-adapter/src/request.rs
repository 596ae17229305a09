use crate::body::RequestBody;
use crate::error::AdapterError;

use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use backtrace::Backtrace;
use headers::{ContentLength, HeaderMapExt};
use http::header::{HeaderName, HeaderValue, COOKIE, HOST};
use http::{HeaderMap, Method, Uri, Version};
use log::{debug, warn};

use std::fmt;
use std::sync::Arc;

/// Header set by API Gateway to the scheme the client used to connect.
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Scheme assumed when the event doesn't carry an `X-Forwarded-Proto` header.
const DEFAULT_SCHEME: &str = "https";

/// HTTP protocol version as reported by API Gateway (e.g., `HTTP/1.1`).
///
/// A protocol string that can't be parsed yields version `0.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
  /// Major version (e.g., `1` for `HTTP/1.1`).
  pub major: u32,
  /// Minor version (e.g., `1` for `HTTP/1.1`).
  pub minor: u32,
}

impl ProtocolVersion {
  /// Parse a protocol string of the form `HTTP/<major>.<minor>` or `HTTP/<major>`.
  pub fn parse(protocol: &str) -> Option<Self> {
    let version = protocol.strip_prefix("HTTP/")?;
    let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
    if !is_digits(major) || !is_digits(minor) {
      return None;
    }

    Some(Self {
      major: major.parse().ok()?,
      minor: minor.parse().ok()?,
    })
  }

  /// Map to the corresponding [`http::Version`], if there is one.
  pub fn to_http_version(self) -> Option<Version> {
    match (self.major, self.minor) {
      (0, 9) => Some(Version::HTTP_09),
      (1, 0) => Some(Version::HTTP_10),
      (1, 1) => Some(Version::HTTP_11),
      (2, 0) => Some(Version::HTTP_2),
      (3, 0) => Some(Version::HTTP_3),
      _ => None,
    }
  }
}

impl fmt::Display for ProtocolVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "HTTP/{}.{}", self.major, self.minor)
  }
}

fn is_digits(s: &str) -> bool {
  !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// HTTP request delivered to a [`Handler`](crate::Handler).
///
/// Requests built by [`apigw_to_request`] keep a reference to the API Gateway event they were
/// translated from (see [`Request::gateway_event`]). Requests built with [`Request::builder`] do
/// not.
#[derive(Debug)]
pub struct Request {
  method: Method,
  uri: Uri,
  request_target: String,
  protocol: String,
  protocol_version: ProtocolVersion,
  headers: HeaderMap,
  body: RequestBody,
  content_length: u64,
  remote_addr: String,
  host: Option<String>,
  event: Option<Arc<ApiGatewayV2httpRequest>>,
}

impl Request {
  /// Start building a request outside of the Lambda adapter (e.g., for a local server or tests).
  pub fn builder(method: Method, uri: Uri) -> RequestBuilder {
    RequestBuilder {
      method,
      uri,
      protocol: "HTTP/1.1".to_string(),
      headers: HeaderMap::new(),
      body: RequestBody::empty(),
      remote_addr: String::new(),
    }
  }

  /// Request method.
  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Absolute request URL (scheme, host, path, and query).
  pub fn uri(&self) -> &Uri {
    &self.uri
  }

  /// Request target as it would appear in the request line (path plus optional `?query`).
  pub fn request_target(&self) -> &str {
    &self.request_target
  }

  /// Protocol string as reported by the client (e.g., `HTTP/1.1`).
  pub fn protocol(&self) -> &str {
    &self.protocol
  }

  /// Parsed protocol version; `0.0` if the protocol string is malformed.
  pub fn protocol_version(&self) -> ProtocolVersion {
    self.protocol_version
  }

  /// Request headers. Lookups are case-insensitive.
  pub fn headers(&self) -> &HeaderMap {
    &self.headers
  }

  /// Request body stream.
  pub fn body_mut(&mut self) -> &mut RequestBody {
    &mut self.body
  }

  /// Consume the request, returning its body stream.
  pub fn into_body(self) -> RequestBody {
    self.body
  }

  /// Value of the `Content-Length` header, or `0` if absent or malformed.
  pub fn content_length(&self) -> u64 {
    self.content_length
  }

  /// Client source IP address.
  pub fn remote_addr(&self) -> &str {
    &self.remote_addr
  }

  /// Value of the `Host` header.
  pub fn host(&self) -> Option<&str> {
    self.host.as_deref()
  }

  /// Return the API Gateway event this request was translated from.
  ///
  /// Handlers use this to access gateway-specific data that has no place in the HTTP request
  /// model, such as authorizer claims, stage variables, or path parameters. The returned event is
  /// the same allocation that was passed to [`LambdaAdapter::handle`](crate::LambdaAdapter::handle).
  ///
  /// Returns [`AdapterError::UnboundContext`] for requests built with [`Request::builder`].
  pub fn gateway_event(&self) -> Result<&Arc<ApiGatewayV2httpRequest>, AdapterError> {
    self
      .event
      .as_ref()
      .ok_or_else(|| AdapterError::UnboundContext(Backtrace::new()))
  }
}

/// Builder for a [`Request`] that isn't backed by an API Gateway event.
#[derive(Debug)]
pub struct RequestBuilder {
  method: Method,
  uri: Uri,
  protocol: String,
  headers: HeaderMap,
  body: RequestBody,
  remote_addr: String,
}

impl RequestBuilder {
  /// Append a request header.
  pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.append(name, value);
    self
  }

  /// Set the request body.
  pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
    self.body = body.into();
    self
  }

  /// Set the protocol string (defaults to `HTTP/1.1`).
  pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
    self.protocol = protocol.into();
    self
  }

  /// Set the client address.
  pub fn remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
    self.remote_addr = remote_addr.into();
    self
  }

  /// Build the request.
  pub fn build(self) -> Request {
    let request_target = self
      .uri
      .path_and_query()
      .map(|path_and_query| path_and_query.as_str().to_string())
      .unwrap_or_else(|| "/".to_string());
    let host = header_str(&self.headers, &HOST)
      .map(str::to_string)
      .or_else(|| self.uri.authority().map(|authority| authority.to_string()));

    Request {
      method: self.method,
      request_target,
      protocol_version: ProtocolVersion::parse(&self.protocol).unwrap_or_default(),
      protocol: self.protocol,
      content_length: content_length(&self.headers),
      host,
      uri: self.uri,
      headers: self.headers,
      body: self.body,
      remote_addr: self.remote_addr,
      event: None,
    }
  }
}

/// Translate an API Gateway HTTP API (payload format 2.0) event into a [`Request`].
///
/// The request URL is assembled from the `X-Forwarded-Proto` header (defaulting to `https`), the
/// domain name from the request context, the raw path, and the raw query string. The body is
/// streamed from the event and base64-decoded on the fly if the event says it's encoded. Cookies
/// from the event's `cookies` list are joined into a single `Cookie` header.
///
/// Returns [`AdapterError::MalformedUrl`] if the assembled URL can't be parsed.
pub fn apigw_to_request(event: Arc<ApiGatewayV2httpRequest>) -> Result<Request, AdapterError> {
  let mut headers = event.headers.clone();

  // Payload format 2.0 moves request cookies out of the headers.
  match event.cookies.as_deref() {
    Some(cookies) if !cookies.is_empty() && !headers.contains_key(COOKIE) => {
      match HeaderValue::try_from(cookies.join("; ")) {
        Ok(cookie) => {
          headers.insert(COOKIE, cookie);
        }
        Err(err) => warn!("Ignoring request cookies: {err}"),
      }
    }
    _ => (),
  }

  let scheme = header_str(&headers, &X_FORWARDED_PROTO)
    .filter(|scheme| !scheme.is_empty())
    .unwrap_or(DEFAULT_SCHEME);
  let domain_name = event.request_context.domain_name.as_deref().unwrap_or_default();
  let raw_path = event.raw_path.as_deref().unwrap_or_default();

  let mut request_target = raw_path.to_string();
  match event.raw_query_string.as_deref() {
    Some(query) if !query.is_empty() => {
      request_target.push('?');
      request_target.push_str(query);
    }
    _ => (),
  }

  let url = format!("{scheme}://{domain_name}{request_target}");
  let uri = url
    .parse::<Uri>()
    .map_err(|err| AdapterError::MalformedUrl {
      url: url.clone(),
      source: Box::new(err),
      backtrace: Backtrace::new(),
    })?;

  let protocol = event
    .request_context
    .http
    .protocol
    .clone()
    .unwrap_or_default();
  let protocol_version = match ProtocolVersion::parse(&protocol) {
    Some(version) => version,
    None if protocol.is_empty() => {
      debug!("Event has no protocol; assuming version 0.0");
      ProtocolVersion::default()
    }
    None => {
      warn!("Unable to parse protocol `{protocol}`; assuming version 0.0");
      ProtocolVersion::default()
    }
  };

  Ok(Request {
    method: event.request_context.http.method.clone(),
    uri,
    request_target,
    protocol,
    protocol_version,
    content_length: content_length(&headers),
    remote_addr: event
      .request_context
      .http
      .source_ip
      .clone()
      .unwrap_or_default(),
    host: header_str(&headers, &HOST).map(str::to_string),
    headers,
    body: RequestBody::from_event(&event),
    event: Some(event),
  })
}

/// Return the value of `name` if it's present and valid UTF-8.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
  headers.get(name).and_then(|value| value.to_str().ok())
}

fn content_length(headers: &HeaderMap) -> u64 {
  match headers.typed_try_get::<ContentLength>() {
    Ok(content_length) => content_length.map(|ContentLength(len)| len).unwrap_or(0),
    Err(err) => {
      warn!("Unable to parse Content-Length header ({err}); assuming 0");
      0
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{apigw_to_request, ProtocolVersion, Request};
  use crate::error::AdapterError;
  use crate::test_util::sample_event;

  use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST};
  use http::{Method, Uri, Version};
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use std::io::Read;
  use std::sync::Arc;

  #[test]
  fn test_sample_event() {
    let event = sample_event(|_| ());
    let mut request = apigw_to_request(Arc::clone(&event)).unwrap();

    assert_eq!(request.method(), Method::POST);
    assert_eq!(
      request.uri().to_string(),
      "https://example.com/my/path?parameter1=value1&parameter1=value2&parameter2=value"
    );
    assert_eq!(
      request.request_target(),
      "/my/path?parameter1=value1&parameter1=value2&parameter2=value"
    );
    assert_eq!(request.protocol(), "HTTP/1.1");
    assert_eq!(
      request.protocol_version(),
      ProtocolVersion { major: 1, minor: 1 }
    );
    assert_eq!(request.remote_addr(), "192.0.2.1");
    assert_eq!(request.host(), Some("example.com"));
    assert_eq!(request.content_length(), 0);

    let mut body = String::new();
    request.body_mut().read_to_string(&mut body).unwrap();
    assert_eq!(body, "Hello from Lambda");

    assert!(Arc::ptr_eq(request.gateway_event().unwrap(), &event));
  }

  #[test]
  fn test_headers_preserved_case_insensitively() {
    let event = sample_event(|event| {
      event["cookies"] = json!(null);
      event["headers"] = json!({
        "Accept": "text/html,application/json",
        "x-custom": "a, b, c",
        "content-type": "application/json",
      });
    });
    let request = apigw_to_request(event).unwrap();

    assert_eq!(request.headers().len(), 3);
    assert_eq!(
      request.headers().get("accept").unwrap(),
      "text/html,application/json"
    );
    // Comma-joined values are kept as a single value.
    assert_eq!(request.headers().get_all("X-Custom").iter().count(), 1);
    assert_eq!(request.headers().get("X-Custom").unwrap(), "a, b, c");
    assert_eq!(
      request.headers().get(CONTENT_TYPE).unwrap(),
      "application/json"
    );
    assert_eq!(request.host(), None);
  }

  #[test]
  fn test_cookies_become_header() {
    let request = apigw_to_request(sample_event(|_| ())).unwrap();
    assert_eq!(request.headers().get(COOKIE).unwrap(), "cookie1; cookie2");

    let request = apigw_to_request(sample_event(|event| {
      event["cookies"] = json!([]);
    }))
    .unwrap();
    assert!(!request.headers().contains_key(COOKIE));
  }

  #[test]
  fn test_scheme() {
    let request = apigw_to_request(sample_event(|event| {
      event["headers"] = json!({ "x-forwarded-proto": "http" });
    }))
    .unwrap();
    assert_eq!(request.uri().scheme_str(), Some("http"));

    let request = apigw_to_request(sample_event(|event| {
      event["headers"] = json!({});
    }))
    .unwrap();
    assert_eq!(request.uri().scheme_str(), Some("https"));
  }

  #[test]
  fn test_url_assembly() {
    let request = apigw_to_request(sample_event(|event| {
      event["rawPath"] = json!("/a/b");
      event["rawQueryString"] = json!("x=1");
      event["requestContext"]["domainName"] = json!("example.com");
    }))
    .unwrap();
    assert_eq!(request.uri().to_string(), "https://example.com/a/b?x=1");
    assert_eq!(request.request_target(), "/a/b?x=1");

    let request = apigw_to_request(sample_event(|event| {
      event["rawPath"] = json!("/a/b");
      event["rawQueryString"] = json!("");
    }))
    .unwrap();
    assert_eq!(request.uri().to_string(), "https://example.com/a/b");
    assert_eq!(request.request_target(), "/a/b");
  }

  #[test]
  fn test_malformed_url() {
    let err = apigw_to_request(sample_event(|event| {
      event["requestContext"]["domainName"] = json!("exa mple.com");
    }))
    .unwrap_err();
    match err {
      AdapterError::MalformedUrl { url, .. } => assert_eq!(
        url,
        "https://exa mple.com/my/path?parameter1=value1&parameter1=value2&parameter2=value"
      ),
      other => panic!("unexpected error: {other:?}"),
    }

    let err = apigw_to_request(sample_event(|event| {
      event["rawPath"] = json!("/with space");
    }))
    .unwrap_err();
    assert_eq!(err.name(), "MalformedUrl");
  }

  #[test]
  fn test_protocol_version() {
    assert_eq!(
      ProtocolVersion::parse("HTTP/1.0"),
      Some(ProtocolVersion { major: 1, minor: 0 })
    );
    assert_eq!(
      ProtocolVersion::parse("HTTP/2.0"),
      Some(ProtocolVersion { major: 2, minor: 0 })
    );
    assert_eq!(
      ProtocolVersion::parse("HTTP/2"),
      Some(ProtocolVersion { major: 2, minor: 0 })
    );
    assert_eq!(ProtocolVersion::parse(""), None);
    assert_eq!(ProtocolVersion::parse("HTTP/"), None);
    assert_eq!(ProtocolVersion::parse("HTTP/1.x"), None);
    assert_eq!(ProtocolVersion::parse("HTTP/+1.1"), None);
    assert_eq!(ProtocolVersion::parse("SPDY/3.1"), None);

    assert_eq!(
      ProtocolVersion { major: 1, minor: 1 }.to_http_version(),
      Some(Version::HTTP_11)
    );
    assert_eq!(ProtocolVersion::default().to_http_version(), None);
    assert_eq!(ProtocolVersion { major: 2, minor: 0 }.to_string(), "HTTP/2.0");

    let request = apigw_to_request(sample_event(|event| {
      event["requestContext"]["http"]["protocol"] = json!("garbage");
    }))
    .unwrap();
    assert_eq!(request.protocol(), "garbage");
    assert_eq!(request.protocol_version(), ProtocolVersion::default());
  }

  #[test]
  fn test_content_length() {
    let request = apigw_to_request(sample_event(|event| {
      event["headers"] = json!({ "content-length": "17" });
    }))
    .unwrap();
    assert_eq!(request.content_length(), 17);

    let request = apigw_to_request(sample_event(|event| {
      event["headers"] = json!({ "content-length": "seventeen" });
    }))
    .unwrap();
    assert_eq!(request.content_length(), 0);
  }

  #[test]
  fn test_builder_has_no_gateway_event() {
    let request = Request::builder(Method::GET, Uri::from_static("http://localhost:3000/a?b=c"))
      .header(CONTENT_LENGTH, HeaderValue::from_static("3"))
      .body("abc")
      .remote_addr("127.0.0.1")
      .build();

    assert_eq!(request.request_target(), "/a?b=c");
    assert_eq!(request.host(), Some("localhost:3000"));
    assert_eq!(request.content_length(), 3);
    assert_eq!(
      request.protocol_version(),
      ProtocolVersion { major: 1, minor: 1 }
    );
    assert_eq!(request.remote_addr(), "127.0.0.1");

    match request.gateway_event() {
      Err(AdapterError::UnboundContext(_)) => (),
      other => panic!("unexpected result: {other:?}"),
    }
  }

  #[test]
  fn test_builder_prefers_host_header() {
    let request = Request::builder(Method::GET, Uri::from_static("http://localhost/"))
      .header(HOST, HeaderValue::from_static("api.example.com"))
      .build();
    assert_eq!(request.host(), Some("api.example.com"));
  }
}
