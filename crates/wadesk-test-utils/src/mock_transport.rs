// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockTransport` records outbound sends and serves scripted chat lists,
//! cached and deep histories, and decrypted media. `MockTransportFactory`
//! hands out one transport per session and keeps the event sender so tests
//! can inject transport events.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use wadesk_core::{
    MessageId, SessionId, TransportChat, TransportClient, TransportEvent, TransportFactory,
    TransportMessage, WadeskError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    Text,
    Image,
    File,
    Voice,
}

/// One outbound send captured by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub kind: SentKind,
    pub chat_id: String,
    /// Text for `Text`, the local path for file sends.
    pub body: String,
    pub caption: Option<String>,
    pub id: MessageId,
}

/// How a scripted history fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// Raise [`WadeskError::TransportClosed`].
    Closed,
    /// Raise an ordinary channel error.
    Error,
}

#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentMessage>>,
    chats: Mutex<Vec<TransportChat>>,
    cache: Mutex<HashMap<String, Vec<TransportMessage>>>,
    deep: Mutex<HashMap<String, Vec<TransportMessage>>>,
    fetch_failures: Mutex<HashMap<String, FetchFailure>>,
    media: Mutex<Option<Vec<u8>>>,
    deleted: Mutex<Vec<(String, MessageId)>>,
    reactions: Mutex<Vec<(MessageId, String)>>,
    fail_sends: AtomicBool,
    closed: AtomicBool,
    next_id: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    // --- scripting ---

    pub async fn set_chats(&self, chats: Vec<TransportChat>) {
        *self.chats.lock().await = chats;
    }

    /// Messages returned by the cache read for `chat_id`.
    pub async fn set_cached_messages(&self, chat_id: &str, messages: Vec<TransportMessage>) {
        self.cache.lock().await.insert(chat_id.to_string(), messages);
    }

    /// Messages returned by the deep (load-all) fetch for `chat_id`.
    pub async fn set_full_history(&self, chat_id: &str, messages: Vec<TransportMessage>) {
        self.deep.lock().await.insert(chat_id.to_string(), messages);
    }

    pub async fn fail_fetch(&self, chat_id: &str, failure: FetchFailure) {
        self.fetch_failures
            .lock()
            .await
            .insert(chat_id.to_string(), failure);
    }

    /// Bytes returned by `decrypt_file`; without it decryption fails.
    pub async fn set_media(&self, bytes: Vec<u8>) {
        *self.media.lock().await = Some(bytes);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    // --- inspection ---

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.kind == SentKind::Text)
            .map(|m| m.body.clone())
            .collect()
    }

    pub async fn deleted(&self) -> Vec<(String, MessageId)> {
        self.deleted.lock().await.clone()
    }

    pub async fn reactions(&self) -> Vec<(MessageId, String)> {
        self.reactions.lock().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn record(
        &self,
        kind: SentKind,
        chat_id: &str,
        body: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, WadeskError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(WadeskError::channel("mock send failure"));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = MessageId(format!("true_{chat_id}_OUT{n}"));
        self.sent.lock().await.push(SentMessage {
            kind,
            chat_id: chat_id.to_string(),
            body: body.to_string(),
            caption: caption.map(str::to_string),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn check_fetch(&self, chat_id: &str) -> Result<(), WadeskError> {
        match self.fetch_failures.lock().await.get(chat_id) {
            Some(FetchFailure::Closed) => Err(WadeskError::TransportClosed(
                "Protocol error: Target closed".into(),
            )),
            Some(FetchFailure::Error) => Err(WadeskError::channel("mock fetch failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId, WadeskError> {
        self.record(SentKind::Text, chat_id, text, None).await
    }

    async fn send_image(
        &self,
        chat_id: &str,
        path: &str,
        _file_name: &str,
        caption: &str,
    ) -> Result<MessageId, WadeskError> {
        self.record(SentKind::Image, chat_id, path, Some(caption)).await
    }

    async fn send_file(
        &self,
        chat_id: &str,
        path: &str,
        _file_name: &str,
        caption: &str,
    ) -> Result<MessageId, WadeskError> {
        self.record(SentKind::File, chat_id, path, Some(caption)).await
    }

    async fn send_voice(&self, chat_id: &str, path: &str) -> Result<MessageId, WadeskError> {
        self.record(SentKind::Voice, chat_id, path, None).await
    }

    async fn decrypt_file(&self, _message: &TransportMessage) -> Result<Vec<u8>, WadeskError> {
        self.media
            .lock()
            .await
            .clone()
            .ok_or_else(|| WadeskError::channel("mock decrypt failure"))
    }

    async fn get_all_chats(&self) -> Result<Vec<TransportChat>, WadeskError> {
        Ok(self.chats.lock().await.clone())
    }

    async fn get_all_messages_in_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<TransportMessage>, WadeskError> {
        self.check_fetch(chat_id).await?;
        Ok(self
            .cache
            .lock()
            .await
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_and_get_all_messages_in_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<TransportMessage>, WadeskError> {
        self.check_fetch(chat_id).await?;
        Ok(self
            .deep
            .lock()
            .await
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &MessageId,
    ) -> Result<(), WadeskError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(WadeskError::channel("mock delete failure"));
        }
        self.deleted
            .lock()
            .await
            .push((chat_id.to_string(), message_id.clone()));
        Ok(())
    }

    async fn send_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<(), WadeskError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(WadeskError::channel("mock reaction failure"));
        }
        self.reactions
            .lock()
            .await
            .push((message_id.clone(), emoji.to_string()));
        Ok(())
    }

    async fn close(&self) -> Result<(), WadeskError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`MockTransport`]s and captures each session's event sender.
#[derive(Default)]
pub struct MockTransportFactory {
    transports: Mutex<HashMap<SessionId, Arc<MockTransport>>>,
    senders: Mutex<HashMap<SessionId, mpsc::Sender<TransportEvent>>>,
    create_count: AtomicUsize,
    fail_create: AtomicBool,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transport `create` will return for `session`, created now so it can be scripted first.
    pub async fn prepare(&self, session: &SessionId) -> Arc<MockTransport> {
        self.transports
            .lock()
            .await
            .entry(session.clone())
            .or_insert_with(|| Arc::new(MockTransport::new()))
            .clone()
    }

    pub async fn transport(&self, session: &SessionId) -> Option<Arc<MockTransport>> {
        self.transports.lock().await.get(session).cloned()
    }

    /// Push an event into the session's worker loop. Returns `false` when
    /// the session was never created or its loop has stopped.
    pub async fn emit(&self, session: &SessionId, event: TransportEvent) -> bool {
        let tx = self.senders.lock().await.get(session).cloned();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        session: &SessionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn TransportClient>, WadeskError> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WadeskError::channel("mock create failure"));
        }
        let transport = self.prepare(session).await;
        self.senders.lock().await.insert(session.clone(), events);
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_with_unique_ids() {
        let t = MockTransport::new();
        let a = t.send_text("c@c.us", "one").await.unwrap();
        let b = t.send_text("c@c.us", "two").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(t.sent_texts().await, vec!["one", "two"]);

        t.set_fail_sends(true);
        assert!(t.send_text("c@c.us", "three").await.is_err());
        assert_eq!(t.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn scripted_fetch_failures() {
        let t = MockTransport::new();
        t.fail_fetch("a@c.us", FetchFailure::Closed).await;
        t.fail_fetch("b@c.us", FetchFailure::Error).await;

        let err = t.get_all_messages_in_chat("a@c.us").await.unwrap_err();
        assert!(err.is_transport_closed());
        let err = t.load_and_get_all_messages_in_chat("b@c.us").await.unwrap_err();
        assert!(!err.is_transport_closed());
        assert!(t.get_all_messages_in_chat("c@c.us").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn factory_routes_events() {
        let factory = MockTransportFactory::new();
        let session = SessionId::from("s1");
        let prepared = factory.prepare(&session).await;
        let (tx, mut rx) = mpsc::channel(4);

        factory.create(&session, tx).await.unwrap();
        assert_eq!(factory.create_count(), 1);
        assert!(Arc::ptr_eq(&prepared, &factory.transport(&session).await.unwrap()));

        assert!(
            factory
                .emit(&session, TransportEvent::StateChanged("CONNECTED".into()))
                .await
        );
        assert!(matches!(rx.recv().await, Some(TransportEvent::StateChanged(s)) if s == "CONNECTED"));
        assert!(!factory.emit(&SessionId::from("other"), TransportEvent::StateChanged("x".into())).await);
    }

    #[tokio::test]
    async fn factory_failure_is_counted() {
        let factory = MockTransportFactory::new();
        factory.set_fail_create(true);
        let (tx, _rx) = mpsc::channel(1);
        assert!(factory.create(&SessionId::from("s1"), tx).await.is_err());
        assert_eq!(factory.create_count(), 1);
    }
}
