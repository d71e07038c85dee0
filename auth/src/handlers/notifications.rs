use actix_web::{rt, web, Error, HttpRequest, HttpResponse};
use actix_ws::{Message, MessageStream, Session};
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::services::RoomMembership;
use crate::state::AppState;

/// WebSocket endpoint. The handshake token is checked before upgrading, so a
/// rejected client never gets a connection.
pub async fn notifications(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let identity = state.ws_guard.authenticate(&req).map_err(|e| {
        tracing::warn!(reason = %e, "websocket handshake rejected");
        e
    })?;

    let (response, session, stream) = actix_ws::handle(&req, body)?;
    let (membership, outbox) = state.notifications.join(identity.subject_id);
    tracing::info!(user_id = %identity.subject_id, "notification socket connected");

    rt::spawn(run_socket(session, stream, membership, outbox));
    Ok(response)
}

async fn run_socket(
    mut session: Session,
    mut stream: MessageStream,
    membership: RoomMembership,
    mut outbox: mpsc::UnboundedReceiver<String>,
) {
    loop {
        tokio::select! {
            outgoing = outbox.recv() => match outgoing {
                Some(text) => {
                    if session.text(text).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(reason))) => {
                    tracing::info!(user_id = %membership.user_id(), "notification socket closed by client");
                    let _ = session.close(reason).await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(user_id = %membership.user_id(), error = %e, "notification socket protocol error");
                    break;
                }
                None => break,
            },
        }
    }

    tracing::info!(user_id = %membership.user_id(), "notification socket disconnected");
    let _ = session.close(None).await;
}
