use apigw_http_adapter::http::header::{HeaderValue, CONTENT_TYPE, SET_COOKIE};
use apigw_http_adapter::http::StatusCode;
use apigw_http_adapter::error::format_error;
use apigw_http_adapter::{
  ApiGatewayV2httpRequest, ApiGatewayV2httpResponse, Handler, LambdaAdapter,
  Request, ResponseWriter,
};
use log::{error, info};
use thiserror::Error;

use std::io::{self, Read, Write};
use std::sync::Arc;

/// Echoes each request's method, target, and body back to the caller.
#[derive(Debug, Default)]
pub struct EchoHandler {
  /// Value of the `server` cookie set on every response.
  pub server_name: String,
}

impl EchoHandler {
  pub fn new(server_name: impl Into<String>) -> Self {
    Self {
      server_name: server_name.into(),
    }
  }

  fn echo(&self, response: &mut dyn ResponseWriter, mut request: Request) -> io::Result<()> {
    let content_type = request
      .headers()
      .get(CONTENT_TYPE)
      .cloned()
      .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    // Buffer the body first so that a read error can still become a 400 response.
    let mut body = Vec::new();
    request.body_mut().read_to_end(&mut body)?;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    if let Ok(server) = HeaderValue::try_from(format!("server={}", self.server_name)) {
      headers.append(SET_COOKIE, server);
    }
    headers.append(
      SET_COOKIE,
      HeaderValue::from_static("echo=1; Path=/; HttpOnly"),
    );

    response.write_status(StatusCode::OK);
    response.write_all(&body)
  }
}

impl Handler for EchoHandler {
  fn serve_http(&self, response: &mut dyn ResponseWriter, request: Request) {
    info!(
      "Echoing {} {} ({} bytes declared)",
      request.method(),
      request.request_target(),
      request.content_length()
    );

    if let Err(err) = self.echo(response, request) {
      error!("{}", format_error(&err, None, None));
      response.write_status(StatusCode::BAD_REQUEST);
    }
  }
}

/// Error returned when running a single event outside of Lambda.
#[derive(Debug, Error)]
pub enum LocalInvokeError {
  #[error("failed to read event")]
  Read(#[source] io::Error),
  #[error("failed to parse event")]
  Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
  #[error("failed to handle event")]
  Adapter(#[source] apigw_http_adapter::AdapterError),
  #[error("failed to write response")]
  Write(#[source] serde_json::Error),
}

/// Run a single API Gateway event read from `input` through `adapter`, writing the response event
/// as JSON to `output`.
pub fn invoke_locally<H, R, W>(
  adapter: &LambdaAdapter<H>,
  mut input: R,
  output: W,
) -> Result<ApiGatewayV2httpResponse, LocalInvokeError>
where
  H: Handler,
  R: Read,
  W: Write,
{
  let mut event_json = Vec::new();
  input
    .read_to_end(&mut event_json)
    .map_err(LocalInvokeError::Read)?;

  let event = serde_path_to_error::deserialize::<_, ApiGatewayV2httpRequest>(
    &mut serde_json::Deserializer::from_slice(&event_json),
  )
  .map_err(LocalInvokeError::Parse)?;

  let response = adapter
    .handle(Arc::new(event))
    .map_err(LocalInvokeError::Adapter)?;

  serde_json::to_writer_pretty(output, &response).map_err(LocalInvokeError::Write)?;
  Ok(response)
}
