// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP side of the sidecar: one [`BridgeClient`] per session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wadesk_core::{
    MessageId, SessionId, TransportChat, TransportClient, TransportMessage, WadeskError,
};

use crate::protocol::{
    DecryptBody, ErrorBody, ReactionBody, SendFileBody, SendTextBody, SentResponse, classify_error,
};

/// Shared HTTP plumbing: base URL, timeout and error classification.
#[derive(Debug, Clone)]
pub struct BridgeHttp {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl BridgeHttp {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WadeskError> {
        let base = Url::parse(base_url)
            .map_err(|e| WadeskError::Config(format!("invalid bridge.base_url '{base_url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WadeskError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    /// `<base>/sessions/<session>/<segments...>` with each segment percent-encoded.
    pub fn session_url(&self, session: &SessionId, segments: &[&str]) -> Result<Url, WadeskError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| WadeskError::Config(format!("bridge.base_url cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .push("sessions")
            .push(session.as_str())
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the successful response.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, WadeskError> {
        let mut req = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        debug!(%method, %url, %status, "bridge response");
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("bridge returned {status}: {text}"));
        Err(classify_error(message))
    }

    pub async fn json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, WadeskError> {
        let response = self.request(method, url, body).await?;
        response.json::<T>().await.map_err(|e| WadeskError::Channel {
            message: format!("malformed bridge response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    fn classify(&self, e: reqwest::Error) -> WadeskError {
        if e.is_timeout() {
            WadeskError::Timeout {
                duration: self.timeout,
            }
        } else if e.is_connect() {
            // Nothing can be done on this session while the sidecar is down.
            WadeskError::TransportClosed(format!("bridge unreachable: {e}"))
        } else {
            WadeskError::Channel {
                message: format!("bridge request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// A live session on the sidecar.
pub struct BridgeClient {
    http: BridgeHttp,
    session: SessionId,
    events_cancel: CancellationToken,
}

impl BridgeClient {
    pub fn new(http: BridgeHttp, session: SessionId, events_cancel: CancellationToken) -> Self {
        Self {
            http,
            session,
            events_cancel,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    fn url(&self, segments: &[&str]) -> Result<Url, WadeskError> {
        self.http.session_url(&self.session, segments)
    }

    async fn send<B: Serialize>(&self, kind: &str, body: &B) -> Result<MessageId, WadeskError> {
        let url = self.url(&["messages", kind])?;
        let sent: SentResponse = self.http.json(Method::POST, url, Some(body)).await?;
        sent.message_id()
            .map(MessageId)
            .ok_or_else(|| WadeskError::channel(format!("bridge returned no id for {kind} send")))
    }

    async fn list_messages(
        &self,
        chat_id: &str,
        load_all: bool,
    ) -> Result<Vec<TransportMessage>, WadeskError> {
        let mut url = self.url(&["chats", chat_id, "messages"])?;
        if load_all {
            url.query_pairs_mut().append_pair("load", "all");
        }
        self.http.json::<(), _>(Method::GET, url, None).await
    }
}

#[async_trait]
impl TransportClient for BridgeClient {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId, WadeskError> {
        self.send("text", &SendTextBody { chat_id, text }).await
    }

    async fn send_image(
        &self,
        chat_id: &str,
        path: &str,
        file_name: &str,
        caption: &str,
    ) -> Result<MessageId, WadeskError> {
        let body = SendFileBody {
            chat_id,
            path,
            file_name: Some(file_name),
            caption: Some(caption).filter(|c| !c.is_empty()),
        };
        self.send("image", &body).await
    }

    async fn send_file(
        &self,
        chat_id: &str,
        path: &str,
        file_name: &str,
        caption: &str,
    ) -> Result<MessageId, WadeskError> {
        let body = SendFileBody {
            chat_id,
            path,
            file_name: Some(file_name),
            caption: Some(caption).filter(|c| !c.is_empty()),
        };
        self.send("file", &body).await
    }

    async fn send_voice(&self, chat_id: &str, path: &str) -> Result<MessageId, WadeskError> {
        let body = SendFileBody {
            chat_id,
            path,
            file_name: None,
            caption: None,
        };
        self.send("voice", &body).await
    }

    async fn decrypt_file(&self, message: &TransportMessage) -> Result<Vec<u8>, WadeskError> {
        let url = self.url(&["decrypt"])?;
        let response = self
            .http
            .request(Method::POST, url, Some(&DecryptBody { message }))
            .await?;
        let bytes = response.bytes().await.map_err(|e| WadeskError::Channel {
            message: format!("failed to read decrypted media: {e}"),
            source: Some(Box::new(e)),
        })?;
        if bytes.is_empty() {
            return Err(WadeskError::channel("decrypted media is empty"));
        }
        Ok(bytes.to_vec())
    }

    async fn get_all_chats(&self) -> Result<Vec<TransportChat>, WadeskError> {
        let url = self.url(&["chats"])?;
        self.http.json::<(), _>(Method::GET, url, None).await
    }

    async fn get_all_messages_in_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<TransportMessage>, WadeskError> {
        self.list_messages(chat_id, false).await
    }

    async fn load_and_get_all_messages_in_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<TransportMessage>, WadeskError> {
        self.list_messages(chat_id, true).await
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &MessageId,
    ) -> Result<(), WadeskError> {
        let url = self.url(&["chats", chat_id, "messages", message_id.as_str()])?;
        self.http.request::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn send_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<(), WadeskError> {
        let url = self.url(&["reactions"])?;
        let body = ReactionBody {
            message_id: message_id.as_str(),
            emoji,
        };
        self.http.request(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), WadeskError> {
        self.events_cancel.cancel();
        let url = self.url(&[])?;
        match self.http.request::<()>(Method::DELETE, url, None).await {
            Ok(_) => Ok(()),
            // Already gone is as good as closed.
            Err(WadeskError::TransportClosed(reason)) => {
                warn!(session = %self.session, %reason, "bridge session already closed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
