use futures::{SinkExt, StreamExt};
use tokio::select;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::Message;

use webrtsp_client::runtime::task_manager::TaskContext;
use webrtsp_client::runtime::Runtime;
use webrtsp_client::transport::{ConnectionState, Transport, TransportHandle};

/// Dial `url` over WebSocket and pump text frames through a transport
/// channel bundle. Dial failures surface as a transition straight to
/// `Disconnected`.
pub async fn connect(url: &str, runtime: &Runtime) -> Transport {
    let (transport, handle) = Transport::channel();

    runtime
        .task()
        .spawn({
            let url = url.to_string();
            move |task_context| run(url, handle, task_context)
        })
        .await;

    transport
}

async fn run(url: String, handle: TransportHandle, mut task_context: TaskContext) {
    let TransportHandle {
        mut outgoing,
        incoming,
        state,
    } = handle;

    let mut request = match url.into_client_request() {
        Ok(request) => request,
        Err(err) => {
            tracing::error!(%err, "invalid server url");
            let _ = state.send(ConnectionState::Disconnected);
            return;
        }
    };
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("webrtsp"));

    let (stream, _response) = match connect_async(request).await {
        Ok(connected) => connected,
        Err(err) => {
            tracing::error!(%err, "websocket connect failed");
            let _ = state.send(ConnectionState::Disconnected);
            return;
        }
    };
    let _ = state.send(ConnectionState::Connected);
    tracing::debug!("websocket open");

    let (mut sink, mut source) = stream.split();

    loop {
        select! {
            message = source.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let _ = incoming.send(text.as_str().to_string());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("websocket closed by server");
                        break;
                    }
                    // Binary frames are not part of the protocol; pings are
                    // answered by the websocket layer itself.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::error!(%err, "websocket receive failed");
                        break;
                    }
                }
            },
            text = outgoing.recv() => {
                match text {
                    Some(text) => {
                        if let Err(err) = sink.send(Message::text(text)).await {
                            tracing::error!(%err, "websocket send failed");
                            break;
                        }
                    }
                    None => break,
                }
            },
            _ = task_context.wait_for_stop() => {
                break;
            },
        }
    }

    let _ = state.send(ConnectionState::Disconnected);
    let _ = sink.close().await;
}
