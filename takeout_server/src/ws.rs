//! The websocket endpoint that operator dashboards connect to.
//!
//! Each socket is registered in the [`NotificationHub`] under the session id from the path. Messages pushed by the hub
//! are forwarded as text frames until either side hangs up.
use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures::StreamExt;
use log::*;
use takeout_engine::notifications::{ChannelPusher, NotificationHub};
use tokio::sync::mpsc;

use crate::errors::ServerError;

/// How many undelivered messages a dashboard may fall behind before it is dropped
pub const DASHBOARD_BUFFER_SIZE: usize = 64;

#[get("/ws/{sid}")]
pub async fn dashboard_socket(
    req: HttpRequest,
    body: web::Payload,
    path: web::Path<String>,
    hub: web::Data<NotificationHub>,
) -> Result<HttpResponse, ServerError> {
    let sid = path.into_inner();
    let (response, mut session, mut stream) =
        actix_ws::handle(&req, body).map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let (tx, mut rx) = mpsc::channel::<String>(DASHBOARD_BUFFER_SIZE);
    let hub = hub.into_inner();
    let serial = hub.register(&sid, Box::new(ChannelPusher::new(tx)));
    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = session.text(text).await {
                            debug!("📣️ Dashboard {sid} went away. {e}");
                            break;
                        }
                    },
                    // The hub dropped this connection
                    None => break,
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    },
                    Some(Ok(Message::Close(reason))) => {
                        debug!("📣️ Dashboard {sid} closed the connection. {reason:?}");
                        break;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        warn!("📣️ Websocket error on dashboard {sid}. {e}");
                        break;
                    },
                    None => break,
                },
            }
        }
        hub.release(&sid, serial);
        let _ = session.close(None).await;
    });
    Ok(response)
}
