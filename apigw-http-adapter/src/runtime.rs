use crate::adapter::{Handler, LambdaAdapter};

use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use futures::future;
use lambda_runtime::{service_fn, LambdaEvent};

/// Start the Lambda runtime and handle each API Gateway event with the specified adapter.
///
/// Events that can't be translated into a [`Request`](crate::Request) are reported to the Lambda
/// runtime as invocation errors. This function only returns if the runtime loop fails.
///
/// # Example
///
/// ```rust,ignore
/// use apigw_http_adapter::{is_lambda, run_lambda, LambdaAdapter};
///
/// #[tokio::main]
/// pub async fn main() -> Result<(), lambda_runtime::Error> {
///   env_logger::init();
///
///   let handler = MyHandler::new(...);
///   if is_lambda() {
///     run_lambda(LambdaAdapter::new(handler)).await
///   } else {
///     serve_locally(handler)
///   }
/// }
/// ```
pub async fn run_lambda<H>(adapter: LambdaAdapter<H>) -> Result<(), lambda_runtime::Error>
where
  H: Handler,
{
  let adapter = &adapter;
  lambda_runtime::run(service_fn(
    move |event: LambdaEvent<ApiGatewayV2httpRequest>| {
      future::ready(
        adapter
          .handle_lambda_event(event)
          .map_err(lambda_runtime::Error::from),
      )
    },
  ))
  .await
}
