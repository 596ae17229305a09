use aws_lambda_events::apigw::ApiGatewayV2httpResponse;
use aws_lambda_events::encodings::Body;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::SET_COOKIE;
use http::{HeaderMap, StatusCode};

use std::io::{self, Write};

/// Write side of an HTTP response, as seen by a [`Handler`](crate::Handler).
///
/// Body bytes are written through the [`Write`] supertrait.
pub trait ResponseWriter: Write {
  /// Response headers, which may be modified until the handler returns.
  fn headers_mut(&mut self) -> &mut HeaderMap;

  /// Set the response status code. If called more than once, the last call wins.
  fn write_status(&mut self, status: StatusCode);
}

/// [`ResponseWriter`] that records everything a handler writes so that it can be returned to API
/// Gateway as an [`ApiGatewayV2httpResponse`].
#[derive(Debug, Default)]
pub struct ResponseCapture {
  headers: HeaderMap,
  body: Vec<u8>,
  status: Option<StatusCode>,
}

impl ResponseCapture {
  /// Create an empty capture with no status, headers, or body.
  pub fn new() -> Self {
    Self::default()
  }

  /// Status code set by the handler, if any.
  pub fn status(&self) -> Option<StatusCode> {
    self.status
  }

  /// Headers recorded so far.
  pub fn headers(&self) -> &HeaderMap {
    &self.headers
  }

  /// Body bytes recorded so far.
  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// Convert the recorded response into an API Gateway response event.
  ///
  /// The body is always base64-encoded, whatever its content. All headers (including
  /// `Set-Cookie`) are returned as multi-value headers, and the `Set-Cookie` values are also
  /// returned as the event's cookies in the order they were added. If the handler never set a
  /// status, the event carries status code `0`.
  pub fn into_apigw_response(self) -> ApiGatewayV2httpResponse {
    let cookies = self
      .headers
      .get_all(SET_COOKIE)
      .iter()
      .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
      .collect();

    ApiGatewayV2httpResponse {
      status_code: self.status.map(|status| i64::from(status.as_u16())).unwrap_or(0),
      headers: HeaderMap::new(),
      multi_value_headers: self.headers,
      body: Some(Body::Text(STANDARD.encode(&self.body))),
      is_base64_encoded: true,
      cookies,
    }
  }
}

impl Write for ResponseCapture {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.body.extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl ResponseWriter for ResponseCapture {
  fn headers_mut(&mut self) -> &mut HeaderMap {
    &mut self.headers
  }

  fn write_status(&mut self, status: StatusCode) {
    self.status = Some(status);
  }
}
