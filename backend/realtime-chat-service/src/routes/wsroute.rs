use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::state::AppState;
use crate::websocket::handlers::run_session_worker;
use crate::websocket::message_types::WsInboundEvent;
use crate::websocket::{ConnectionHandle, ServerEvent};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

// WebSocket Actor
struct WsSession {
    user_id: Uuid,
    state: AppState,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    // dropped on stop, which ends the session worker
    inbound: Option<UnboundedSender<WsInboundEvent>>,
}

impl WsSession {
    fn new(user_id: Uuid, state: AppState) -> Self {
        Self {
            user_id,
            heartbeat_interval: state.config.heartbeat_interval(),
            client_timeout: state.config.client_timeout(),
            state,
            hb: Instant::now(),
            inbound: None,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(user_id = %act.user_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        let (handle, outbound_rx) = ConnectionHandle::new(self.user_id);
        tracing::info!(
            user_id = %self.user_id,
            connection_id = %handle.id,
            "WebSocket session started"
        );

        // outbound events become socket text frames in channel order
        ctx.add_stream(UnboundedReceiverStream::new(outbound_rx));

        let (inbound_tx, inbound_rx) = unbounded_channel();
        self.inbound = Some(inbound_tx);
        actix::spawn(run_session_worker(self.state.clone(), handle, inbound_rx));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session stopped");
        self.inbound.take();
    }
}

impl StreamHandler<String> for WsSession {
    fn handle(&mut self, payload: String, ctx: &mut Self::Context) {
        ctx.text(payload);
    }
}

// Handle WebSocket protocol messages
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match serde_json::from_str::<WsInboundEvent>(&text) {
                    Ok(event) => {
                        let queued = self
                            .inbound
                            .as_ref()
                            .is_some_and(|tx| tx.send(event).is_ok());
                        if !queued {
                            tracing::warn!(user_id = %self.user_id, "session worker gone, closing");
                            ctx.stop();
                        }
                    }
                    Err(e) => {
                        tracing::debug!(user_id = %self.user_id, error = %e, "unparseable WS event");
                        if let Some(payload) =
                            ServerEvent::error("Invalid event payload", None).to_payload()
                        {
                            ctx.text(payload);
                        }
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(user_id = %self.user_id, ?reason, "WebSocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "WebSocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Resolves the connecting user. Runs before the upgrade, so a rejected
/// handshake never touches the registry.
pub async fn authenticate_ws(
    state: &AppState,
    params: &WsParams,
    req: &HttpRequest,
) -> Result<Uuid, AppError> {
    let token = params
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(req))
        .ok_or(AppError::AuthRequired)?;

    let user_id = state.verifier.verify(&token)?;
    if state.storage.users.get_user(user_id).await?.is_none() {
        tracing::warn!(%user_id, "WebSocket rejected: unknown user");
        return Err(AppError::AuthRequired);
    }
    Ok(user_id)
}

#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let user_id = authenticate_ws(&state, &query, &req).await?;
    ws::start(WsSession::new(user_id, state.get_ref().clone()), &req, stream)
}
