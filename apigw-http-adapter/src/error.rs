// Until std::error::Backtrace is fully stabilized, we can't embed a type named `Backtrace` within
// a thiserror::Error (see https://github.com/dtolnay/thiserror/issues/204).
use backtrace::Backtrace as _Backtrace;
use itertools::Itertools;
use thiserror::Error;

/// Error that occurred while adapting an API Gateway event to a [`Handler`](crate::Handler).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AdapterError {
  /// The request URL assembled from the event could not be parsed.
  #[error("malformed request URL `{url}`")]
  MalformedUrl {
    /// URL assembled from the forwarded scheme, domain name, raw path, and raw query string.
    url: String,
    /// Underlying parse error.
    #[source]
    source: Box<http::uri::InvalidUri>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// The request was not produced by a [`LambdaAdapter`](crate::LambdaAdapter), so it carries no
  /// API Gateway event.
  #[error("request is not bound to an API Gateway event")]
  UnboundContext(_Backtrace),
  /// Request handler panicked.
  #[error("request handler panicked: {0}")]
  Panic(String, _Backtrace),
}

impl AdapterError {
  /// Return the backtrace associated with the error, if known.
  pub fn backtrace(&self) -> Option<&_Backtrace> {
    match self {
      AdapterError::MalformedUrl { backtrace, .. }
      | AdapterError::UnboundContext(backtrace)
      | AdapterError::Panic(_, backtrace) => Some(backtrace),
    }
  }

  /// Return the name of the error variant (e.g., `MalformedUrl`).
  pub fn name(&self) -> &str {
    match self {
      AdapterError::MalformedUrl { .. } => "MalformedUrl",
      AdapterError::UnboundContext(_) => "UnboundContext",
      AdapterError::Panic(_, _) => "Panic",
    }
  }
}

/// Helper function for formatting an error as a string containing a human-readable chain of causes.
///
/// This function will walk over the chain of causes returned by
/// [`Error::source`](std::error::Error::source) and append each underlying error (using the
/// [`Display`](std::fmt::Display) trait).
///
/// # Arguments
///
/// * `err` - Error to format.
/// * `name` - Optional name of the error type/variant (e.g., `AdapterError::MalformedUrl`).
/// * `backtrace` - Optional [`Backtrace`](backtrace::Backtrace) indicating where the top-level
///   error occurred.
pub fn format_error(
  err: &(dyn std::error::Error),
  name: Option<&str>,
  backtrace: Option<&_Backtrace>,
) -> String {
  let err_line = name
    .map(|n| format!("{}: {}", n, err))
    .unwrap_or_else(|| err.to_string());

  let top_error = if let Some(bt) = backtrace {
    format!("{err_line}\n  stack trace:\n{}", format_backtrace(bt, 4))
  } else {
    err_line
  };

  let cause_str = ErrorCauseIterator(err.source())
    .map(|cause| format!("  caused by: {cause}"))
    .join("\n");

  if !cause_str.is_empty() {
    format!("{top_error}\n{cause_str}")
  } else {
    top_error
  }
}

/// Format an [`AdapterError`] for logging, including its variant name and backtrace.
pub(crate) fn format_adapter_error(err: &AdapterError) -> String {
  format_error(
    err,
    Some(&format!("AdapterError::{}", err.name())),
    err.backtrace(),
  )
}

struct ErrorCauseIterator<'a>(Option<&'a (dyn std::error::Error + 'static)>);

impl<'a> Iterator for ErrorCauseIterator<'a> {
  type Item = &'a (dyn std::error::Error + 'static);

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.0;
    self.0 = current.and_then(|err| err.source());
    current
  }
}

fn format_backtrace(backtrace: &_Backtrace, indent: usize) -> String {
  let indent_str = " ".repeat(indent);
  format!("{backtrace:?}")
    .lines()
    .map(|line| format!("{indent_str}{line}"))
    .join("\n")
}
