// ws — the /ws/todos live feed.
//
// Observers connect, get registered, and from then on only receive. The
// channel is a public feed: no authentication happens after the handshake,
// matching the public read path. Inbound frames are drained and ignored —
// their only use is detecting that the peer went away.

pub mod registry;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::AppContext;

pub async fn todos_ws(ws: WebSocketUpgrade, State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<AppContext>) {
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = ctx.registry.connect(tx);

    // Writer task: drains this observer's queue into the socket. Runs
    // independently per connection so one slow peer never delays another's
    // delivery. A send error just ends the task; the read loop below (or
    // the next broadcast) handles deregistration.
    let mut writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(Message::Text(message.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain inbound traffic until the peer disconnects.
    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {} // ignored — observers have nothing to say
                }
            }
            _ = &mut writer => break,
        }
    }

    ctx.registry.disconnect(id);
    debug!(conn = id, "ws session ended");
}
