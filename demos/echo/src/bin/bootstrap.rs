use apigw_http_adapter::error::format_error;
use apigw_http_adapter::{is_lambda, run_lambda, LambdaAdapter};
use echo::{invoke_locally, EchoHandler};

use std::io;
use std::process::ExitCode;

#[tokio::main]
pub async fn main() -> ExitCode {
  // TIP: Use the `log4rs` crate for more fine-grained control over logging.
  env_logger::init();

  let adapter = LambdaAdapter::new(EchoHandler::new(
    std::env::var("ECHO_SERVER_NAME").unwrap_or_else(|_| "echo".to_string()),
  ));

  if is_lambda() {
    return match run_lambda(adapter).await {
      Ok(()) => ExitCode::SUCCESS,
      Err(err) => {
        log::error!("Lambda runtime failed: {err}");
        ExitCode::FAILURE
      }
    };
  }

  // Outside of Lambda, handle a single event read from stdin:
  //   cargo run --bin bootstrap < event.json
  match invoke_locally(&adapter, io::stdin().lock(), io::stdout().lock()) {
    Ok(_) => ExitCode::SUCCESS,
    Err(err) => {
      log::error!("{}", format_error(&err, None, None));
      ExitCode::FAILURE
    }
  }
}
