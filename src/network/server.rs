use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::GameService;

/// Channel for sending serialized frames to one connected client.
type FrameTx = mpsc::UnboundedSender<Vec<u8>>;

/// Binds the WebSocket listener and serves clients until the process exits.
pub async fn start(addr: SocketAddr, service: Arc<GameService>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Game server listening on ws://{}", addr);
    serve(listener, service).await;
    Ok(())
}

pub async fn serve(listener: TcpListener, service: Arc<GameService>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Client connected from {}", addr);
                let service = service.clone();
                tokio::spawn(async move {
                    handle_client(stream, service).await;
                    info!("Client {} disconnected", addr);
                });
            }
            Err(e) => error!("Failed to accept connection: {}", e),
        }
    }
}

/// Serves one connection.
///
/// A write task forwards serialized frames from a channel to the socket;
/// the read loop decodes [`ClientMessage`]s, answers them through the
/// service, and pushes the replies into that channel.
async fn handle_client(stream: TcpStream, service: Arc<GameService>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    // ── Write task ──────────────────────────────────────────────
    let writer = tokio::spawn(async move {
        while let Some(bytes) = frame_rx.recv().await {
            if let Err(e) = ws_write.send(Message::Binary(bytes.into())).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // ── Read loop ───────────────────────────────────────────────
    let mut session = Session::default();
    while let Some(result) = ws_read.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket read error: {}", e);
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_binary() {
            continue;
        }

        let reply = match rmp_serde::from_slice::<ClientMessage>(&msg.into_data()) {
            Ok(message) => {
                // Store access locks and writes files, so keep it off the async workers.
                let svc = service.clone();
                let handled = tokio::task::spawn_blocking(move || {
                    let reply = session.handle(&svc, message);
                    (session, reply)
                })
                .await;
                match handled {
                    Ok((returned, reply)) => {
                        session = returned;
                        reply
                    }
                    Err(e) => {
                        error!("WebSocket handler failed: {}", e);
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to decode ClientMessage: {}", e);
                ServerMessage::Error {
                    request_id: None,
                    error: GameError::BadRequest(e.to_string()).to_body(),
                }
            }
        };
        if !send(&frame_tx, &reply) {
            break;
        }
    }

    drop(frame_tx);
    let _ = writer.await;
}

fn send(tx: &FrameTx, msg: &ServerMessage) -> bool {
    match rmp_serde::to_vec_named(msg) {
        Ok(bytes) => tx.send(bytes).is_ok(),
        Err(e) => {
            error!("Failed to serialize ServerMessage: {}", e);
            true
        }
    }
}

/// Per-connection state: which user, if any, this socket speaks for.
#[derive(Debug, Default)]
struct Session {
    user_id: Option<String>,
}

impl Session {
    fn handle(&mut self, service: &GameService, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::Login {
                user_id,
                first_name,
            } => match service.register_user(&user_id, first_name) {
                Ok(created) => {
                    self.user_id = Some(user_id.clone());
                    ServerMessage::Welcome { user_id, created }
                }
                Err(e) => ServerMessage::Error {
                    request_id: None,
                    error: e.to_body(),
                },
            },
            ClientMessage::Request {
                request_id,
                request,
            } => {
                let result = match &self.user_id {
                    Some(user_id) => service.dispatch(user_id, request),
                    None => Err(GameError::Unauthenticated),
                };
                match result {
                    Ok(body) => ServerMessage::Response { request_id, body },
                    Err(e) => ServerMessage::Error {
                        request_id: Some(request_id),
                        error: e.to_body(),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::protocol::{GameRequest, GameResponse};
    use crate::store::GameStore;

    fn service() -> GameService {
        GameService::new(GameStore::in_memory(), Arc::new(SystemClock))
    }

    #[test]
    fn requests_before_login_are_rejected() {
        let service = service();
        let mut session = Session::default();
        let reply = session.handle(
            &service,
            ClientMessage::Request {
                request_id: 1,
                request: GameRequest::GetGameState,
            },
        );
        let ServerMessage::Error { request_id, error } = reply else {
            panic!("expected an error");
        };
        assert_eq!(request_id, Some(1));
        assert_eq!(error.code, "unauthenticated");
    }

    #[test]
    fn login_binds_the_session() {
        let service = service();
        let mut session = Session::default();
        let reply = session.handle(
            &service,
            ClientMessage::Login {
                user_id: "12".into(),
                first_name: None,
            },
        );
        assert_eq!(
            reply,
            ServerMessage::Welcome {
                user_id: "12".into(),
                created: true
            }
        );

        let reply = session.handle(
            &service,
            ClientMessage::Request {
                request_id: 2,
                request: GameRequest::GetGameState,
            },
        );
        let ServerMessage::Response {
            request_id,
            body: GameResponse::State(view),
        } = reply
        else {
            panic!("expected game state");
        };
        assert_eq!(request_id, 2);
        assert!(view.machines.is_empty());
    }

    #[tokio::test]
    async fn round_trip_over_websocket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, Arc::new(service())));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();

        let login = ClientMessage::Login {
            user_id: "31".into(),
            first_name: Some("Kit".into()),
        };
        ws.send(Message::Binary(rmp_serde::to_vec_named(&login).unwrap().into()))
            .await
            .unwrap();
        let welcome = ws.next().await.unwrap().unwrap();
        let welcome: serde_json::Value = rmp_serde::from_slice(&welcome.into_data()).unwrap();
        assert_eq!(welcome["type"], "welcome");
        assert_eq!(welcome["created"], true);

        let build = ClientMessage::Request {
            request_id: 5,
            request: GameRequest::BuildMachine {
                machine_type: "amplifier".into(),
                x: 0,
                y: 0,
            },
        };
        ws.send(Message::Binary(rmp_serde::to_vec_named(&build).unwrap().into()))
            .await
            .unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        let reply: serde_json::Value = rmp_serde::from_slice(&reply.into_data()).unwrap();
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["requestId"], 5);
        assert_eq!(reply["error"]["code"], "insufficient_resources");
    }
}
