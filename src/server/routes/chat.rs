//! Chat completions endpoint

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::core::forwarder::ForwardReply;
use crate::core::streaming::create_sse_response;
use crate::core::types::ChatCompletionRequest;
use crate::server::state::AppState;
use crate::utils::error::Result;

/// OpenAI-compatible chat completions endpoint.
///
/// Non-streaming requests answer with the upstream JSON body verbatim;
/// `stream: true` answers with a relayed `text/event-stream`. Failures fall
/// out as [`GatewayError`](crate::utils::error::GatewayError) and actix maps
/// them through `ResponseError`.
pub async fn chat_completions(
    state: web::Data<AppState>,
    request: web::Json<ChatCompletionRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    info!(
        model = %request.model,
        stream = request.is_stream(),
        "chat completion request"
    );

    match state.forwarder.forward(request).await? {
        ForwardReply::Full(body) => Ok(HttpResponse::Ok().json(body)),
        ForwardReply::Stream(relay) => Ok(create_sse_response(relay)),
    }
}
