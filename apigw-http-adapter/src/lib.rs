#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

// These are documented public exports since handlers and callers of the adapter depend on them.
pub use aws_lambda_events::apigw::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};
pub use http;
pub use lambda_runtime::{Context as LambdaContext, LambdaEvent};

mod adapter;

pub use adapter::{is_lambda, Handler, LambdaAdapter, LAMBDA_RUNTIME_API_ENV};

mod body;

pub use body::RequestBody;

/// Error handling.
pub mod error;

pub use error::AdapterError;

mod request;

pub use request::{apigw_to_request, ProtocolVersion, Request, RequestBuilder, X_FORWARDED_PROTO};

mod response;

pub use response::{ResponseCapture, ResponseWriter};

mod runtime;

pub use runtime::run_lambda;

#[cfg(test)]
mod test_util;
