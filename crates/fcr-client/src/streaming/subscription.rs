//! Server event subscription

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use fcr_core::ServerEvent;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::parser::SseParser;
use crate::error::{FcrClientError, Result};

/// An open `/heartbeat` event stream
///
/// Implements `Stream<Item = Result<ServerEvent>>`. Dropping it closes the
/// connection, which the server takes as the client going away.
pub struct ServerEvents {
    byte_stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    parser: SseParser,
    pending: VecDeque<Result<ServerEvent>>,
}

impl ServerEvents {
    pub(crate) async fn connect(http_client: &Client, url: Url) -> Result<Self> {
        debug!("Connecting to server event stream: {}", url);

        let response = http_client
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(FcrClientError::server_error(status, message));
        }

        Ok(Self {
            byte_stream: Box::pin(response.bytes_stream()),
            parser: SseParser::new(),
            pending: VecDeque::new(),
        })
    }

    /// Get the next event; `None` once the server closes the stream
    pub async fn next(&mut self) -> Option<Result<ServerEvent>> {
        <Self as StreamExt>::next(self).await
    }
}

impl Stream for ServerEvents {
    type Item = Result<ServerEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            match this.byte_stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.pending.extend(this.parser.feed(bytes)),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e.into()))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
