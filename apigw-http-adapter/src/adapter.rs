use crate::error::{format_adapter_error, AdapterError};
use crate::request::{apigw_to_request, Request};
use crate::response::{ResponseCapture, ResponseWriter};

use aws_lambda_events::apigw::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};
use backtrace::Backtrace;
use http::StatusCode;
use lambda_runtime::LambdaEvent;
use log::{error, info, trace, warn};

use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Environment variable set by the Lambda execution environment.
pub const LAMBDA_RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Synchronous HTTP request handler.
///
/// The handler writes its response through `response` and must finish writing before returning.
/// Any closure of the form `Fn(&mut dyn ResponseWriter, Request)` implements this trait.
pub trait Handler {
  /// Handle a single request.
  fn serve_http(&self, response: &mut dyn ResponseWriter, request: Request);
}

impl<F> Handler for F
where
  F: Fn(&mut dyn ResponseWriter, Request),
{
  fn serve_http(&self, response: &mut dyn ResponseWriter, request: Request) {
    self(response, request)
  }
}

/// Adapts a [`Handler`] to API Gateway HTTP API events delivered by AWS Lambda.
///
/// # Example
///
/// ```rust
/// use apigw_http_adapter::{LambdaAdapter, Request, ResponseWriter};
/// use apigw_http_adapter::http::StatusCode;
///
/// let adapter = LambdaAdapter::new(|response: &mut dyn ResponseWriter, _request: Request| {
///   response.write_status(StatusCode::NO_CONTENT);
/// });
/// # let _ = adapter;
/// ```
pub struct LambdaAdapter<H> {
  handler: H,
  default_status: Option<StatusCode>,
}

impl<H> LambdaAdapter<H>
where
  H: Handler,
{
  /// Wrap `handler`.
  ///
  /// Responses for which the handler never sets a status code are returned as `200 OK`. Use
  /// [`with_default_status`](Self::with_default_status) or
  /// [`without_default_status`](Self::without_default_status) to change this.
  pub fn new(handler: H) -> Self {
    Self {
      handler,
      default_status: Some(StatusCode::OK),
    }
  }

  /// Status code to return if the handler doesn't set one.
  pub fn with_default_status(mut self, status: StatusCode) -> Self {
    self.default_status = Some(status);
    self
  }

  /// Return status code `0` to API Gateway if the handler doesn't set one.
  pub fn without_default_status(mut self) -> Self {
    self.default_status = None;
    self
  }

  /// Return a reference to the wrapped handler.
  pub fn handler(&self) -> &H {
    &self.handler
  }

  /// Handle a single API Gateway event.
  ///
  /// Translates the event into a [`Request`], invokes the handler with a fresh
  /// [`ResponseCapture`], and converts the captured response into an API Gateway response event.
  /// If the event can't be translated, the error is returned and the handler isn't invoked. If the
  /// handler panics with a string payload, an empty `500 Internal Server Error` response is
  /// returned instead.
  pub fn handle(
    &self,
    event: Arc<ApiGatewayV2httpRequest>,
  ) -> Result<ApiGatewayV2httpResponse, AdapterError> {
    trace!("Request: {event:#?}");

    let request = apigw_to_request(event).map_err(|err| {
      error!("{}", format_adapter_error(&err));
      err
    })?;

    info!(
      "Handling HTTP {} {}",
      request.method(),
      request.request_target()
    );

    let mut capture = ResponseCapture::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
      self.handler.serve_http(&mut capture, request)
    }));

    let response = match outcome {
      Ok(()) => self.finish(capture),
      Err(panic) => {
        // If the panic value isn't a String or &str, don't catch it since we can't print it and
        // it's unclear what we should do instead.
        let err = AdapterError::Panic(
          panic_string(panic).unwrap_or_else(|panic| resume_unwind(panic)),
          Backtrace::new(),
        );
        error!("{}", format_adapter_error(&err));

        let mut capture = ResponseCapture::new();
        capture.write_status(StatusCode::INTERNAL_SERVER_ERROR);
        capture.into_apigw_response()
      }
    };

    trace!("Response: {response:#?}");
    Ok(response)
  }

  /// Handle an event as delivered by the Lambda runtime.
  pub fn handle_lambda_event(
    &self,
    event: LambdaEvent<ApiGatewayV2httpRequest>,
  ) -> Result<ApiGatewayV2httpResponse, AdapterError> {
    trace!("Lambda context: {:#?}", event.context);
    self.handle(Arc::new(event.payload))
  }

  fn finish(&self, mut capture: ResponseCapture) -> ApiGatewayV2httpResponse {
    if capture.status().is_none() {
      match self.default_status {
        Some(status) => {
          warn!("Handler did not set a status code; responding with {status}");
          capture.write_status(status);
        }
        None => warn!("Handler did not set a status code; responding with status code 0"),
      }
    }

    capture.into_apigw_response()
  }
}

/// Return whether the current process is running inside AWS Lambda.
///
/// Callers typically use this to decide between [`run_lambda`](crate::run_lambda) and a regular
/// HTTP listener.
pub fn is_lambda() -> bool {
  std::env::var_os(LAMBDA_RUNTIME_API_ENV).map_or(false, |value| !value.is_empty())
}

/// Extract the panic string after catching a panic, or return the payload if it isn't a string.
fn panic_string(panic: Box<dyn Any + Send>) -> Result<String, Box<dyn Any + Send>> {
  panic
    .downcast::<String>()
    .map(|panic| *panic)
    .or_else(|panic| panic.downcast::<&str>().map(|err| err.to_string()))
}
