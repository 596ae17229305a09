use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use base64::engine::general_purpose::{GeneralPurpose, STANDARD};
use base64::read::DecoderReader;

use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

/// Single-pass request body stream handed to a [`Handler`](crate::Handler).
///
/// Bodies produced by the adapter read directly from the API Gateway event's body text without
/// copying it. Base64-encoded bodies are decoded incrementally as they are read, so an invalid
/// encoding surfaces as an [`io::Error`] from [`Read::read`].
pub struct RequestBody(Inner);

enum Inner {
  Empty,
  Bytes(Cursor<Vec<u8>>),
  Event(EventBody),
  Base64Event(DecoderReader<'static, GeneralPurpose, EventBody>),
}

impl RequestBody {
  /// Return a body that yields no bytes.
  pub fn empty() -> Self {
    Self(Inner::Empty)
  }

  pub(crate) fn from_event(event: &Arc<ApiGatewayV2httpRequest>) -> Self {
    if event.body.is_none() {
      return Self::empty();
    }

    let raw = EventBody {
      event: Arc::clone(event),
      pos: 0,
    };
    if event.is_base64_encoded {
      Self(Inner::Base64Event(DecoderReader::new(raw, &STANDARD)))
    } else {
      Self(Inner::Event(raw))
    }
  }
}

impl Default for RequestBody {
  fn default() -> Self {
    Self::empty()
  }
}

impl From<Vec<u8>> for RequestBody {
  fn from(bytes: Vec<u8>) -> Self {
    Self(Inner::Bytes(Cursor::new(bytes)))
  }
}

impl From<String> for RequestBody {
  fn from(text: String) -> Self {
    text.into_bytes().into()
  }
}

impl From<&str> for RequestBody {
  fn from(text: &str) -> Self {
    text.as_bytes().to_vec().into()
  }
}

impl Read for RequestBody {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    match &mut self.0 {
      Inner::Empty => Ok(0),
      Inner::Bytes(cursor) => cursor.read(buf),
      Inner::Event(raw) => raw.read(buf),
      Inner::Base64Event(decoder) => decoder.read(buf),
    }
  }
}

impl fmt::Debug for RequestBody {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self.0 {
      Inner::Empty => "Empty",
      Inner::Bytes(_) => "Bytes",
      Inner::Event(_) => "Event",
      Inner::Base64Event(_) => "Base64Event",
    };
    f.debug_tuple("RequestBody").field(&kind).finish()
  }
}

/// Reader over the body text of a shared API Gateway event.
struct EventBody {
  event: Arc<ApiGatewayV2httpRequest>,
  pos: usize,
}

impl Read for EventBody {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    let text = self.event.body.as_deref().unwrap_or_default().as_bytes();
    let remaining = text.get(self.pos..).unwrap_or_default();
    let n = remaining.len().min(buf.len());
    buf[..n].copy_from_slice(&remaining[..n]);
    self.pos += n;
    Ok(n)
  }
}
