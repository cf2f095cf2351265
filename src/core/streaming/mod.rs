//! Server-Sent Events relay
//!
//! Streaming completions are passed through verbatim: the proxy never
//! re-encodes upstream frames, it only watches them go by. [`StreamProxy`]
//! owns the session lifecycle and its accounting; [`sse`] holds the frame
//! helpers and the pass-through scanner.

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{HttpResponse, web};
use futures::stream::Stream;

use crate::utils::error::Result;

mod proxy;
mod sse;


pub use proxy::{RelayBody, StreamProxy};
pub use sse::{DONE_SENTINEL, SseScanner, data_frame, done_frame};

/// Wrap a relay body in a Server-Sent Events response
pub fn create_sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<web::Bytes>> + Send + 'static,
{
    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(stream)
}
