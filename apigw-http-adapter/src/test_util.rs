use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use serde_json::{json, Value};

use std::sync::Arc;

/// HTTP API (payload format 2.0) event modeled after the sample in the API Gateway docs.
pub(crate) fn sample_event_json() -> Value {
  json!({
    "version": "2.0",
    "routeKey": "$default",
    "rawPath": "/my/path",
    "rawQueryString": "parameter1=value1&parameter1=value2&parameter2=value",
    "cookies": ["cookie1", "cookie2"],
    "headers": {
      "header1": "value1",
      "header2": "value1,value2",
      "host": "example.com",
    },
    "queryStringParameters": {
      "parameter1": "value1,value2",
      "parameter2": "value",
    },
    "requestContext": {
      "accountId": "123456789012",
      "apiId": "api-id",
      "domainName": "example.com",
      "domainPrefix": "id",
      "http": {
        "method": "POST",
        "path": "/my/path",
        "protocol": "HTTP/1.1",
        "sourceIp": "192.0.2.1",
        "userAgent": "agent",
      },
      "requestId": "id",
      "routeKey": "$default",
      "stage": "$default",
      "time": "12/Mar/2020:19:03:58 +0000",
      "timeEpoch": 1583348638390u64,
    },
    "body": "Hello from Lambda",
    "pathParameters": {},
    "isBase64Encoded": false,
    "stageVariables": {},
  })
}

/// Build a sample event after applying `modify` to its JSON representation.
pub(crate) fn sample_event<F>(modify: F) -> Arc<ApiGatewayV2httpRequest>
where
  F: FnOnce(&mut Value),
{
  let mut value = sample_event_json();
  modify(&mut value);
  Arc::new(
    serde_json::from_value(value).unwrap_or_else(|err| panic!("invalid sample event: {err}")),
  )
}
