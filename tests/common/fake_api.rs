//! In-memory portal backend
//!
//! Serves one user's view of the portal: a contact list and one thread per
//! conversation key. Every call is recorded. Fetches for a key, and
//! read-acknowledgements, can be held back until the test releases them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use maternity_messaging::client::api::{ApiError, PortalApi};
use maternity_messaging::shared::messaging::{
    Contact, ConversationKey, Message, MessageId, Role, SendMessageRequest, UserId,
};
use tokio::sync::{Notify, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListContacts(Role),
    Fetch(ConversationKey),
    Send(SendMessageRequest),
    MarkRead(MessageId),
}

pub struct FakeApi {
    me: UserId,
    contacts: Mutex<Result<Vec<Contact>, ApiError>>,
    threads: Mutex<HashMap<ConversationKey, Vec<Message>>>,
    gates: Mutex<HashMap<ConversationKey, Arc<Semaphore>>>,
    ack_gate: Mutex<Option<Arc<Semaphore>>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    pub fail_fetch: AtomicBool,
    pub fail_send: AtomicBool,
    pub fail_ack: AtomicBool,
    /// When false, acknowledgements succeed but the stored message stays unread
    pub apply_acks: AtomicBool,
    /// Wakes tasks already waiting when a fetch request arrives; stores no permit
    pub fetch_started: Notify,
}

impl FakeApi {
    pub fn new(me: UserId, contacts: Vec<Contact>) -> Arc<Self> {
        Arc::new(Self {
            me,
            contacts: Mutex::new(Ok(contacts)),
            threads: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            ack_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
            fail_fetch: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            fail_ack: AtomicBool::new(false),
            apply_acks: AtomicBool::new(true),
            fetch_started: Notify::new(),
        })
    }

    pub fn set_contacts(&self, contacts: Result<Vec<Contact>, ApiError>) {
        *self.contacts.lock().unwrap() = contacts;
    }

    pub fn set_thread(&self, key: ConversationKey, messages: Vec<Message>) {
        self.threads.lock().unwrap().insert(key, messages);
    }

    pub fn thread(&self, key: ConversationKey) -> Vec<Message> {
        self.threads
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Hold every fetch for `key` until [`release`](Self::release) is called.
    pub fn hold(&self, key: ConversationKey) {
        self.gates
            .lock()
            .unwrap()
            .insert(key, Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch for `key` through.
    pub fn release(&self, key: ConversationKey) {
        if let Some(gate) = self.gates.lock().unwrap().get(&key) {
            gate.add_permits(1);
        }
    }

    /// Hold every acknowledgement until [`release_ack`](Self::release_ack) is called.
    pub fn hold_acks(&self) {
        *self.ack_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held acknowledgement through.
    pub fn release_ack(&self) {
        if let Some(gate) = self.ack_gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.count(|c| matches!(c, Call::Fetch(_)))
    }

    pub fn sends(&self) -> usize {
        self.count(|c| matches!(c, Call::Send(_)))
    }

    pub fn acks_for(&self, id: MessageId) -> usize {
        self.count(|c| *c == Call::MarkRead(id))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PortalApi for FakeApi {
    async fn list_contacts(&self, role: Role) -> Result<Vec<Contact>, ApiError> {
        self.record(Call::ListContacts(role));
        self.contacts.lock().unwrap().clone()
    }

    async fn fetch_messages(&self, key: ConversationKey) -> Result<Vec<Message>, ApiError> {
        self.record(Call::Fetch(key));
        self.fetch_started.notify_waiters();

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?
                .forget();
        }

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.thread(key))
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message, ApiError> {
        self.record(Call::Send(request.clone()));
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection reset".into()));
        }

        let message = Message {
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            pregnancy_id: request.pregnancy_id,
            from_user_id: self.me,
            to_user_id: request.to_user_id,
            body: request.message.clone(),
            timestamp: Utc::now(),
            read: false,
        };
        let key = ConversationKey::new(request.pregnancy_id, request.to_user_id);
        self.threads
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, id: MessageId) -> Result<(), ApiError> {
        self.record(Call::MarkRead(id));

        let gate = self.ack_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?
                .forget();
        }

        if self.fail_ack.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "ack failed".into(),
            });
        }
        if self.apply_acks.load(Ordering::SeqCst) {
            for message in self.threads.lock().unwrap().values_mut().flatten() {
                if message.id == id {
                    message.read = true;
                }
            }
        }
        Ok(())
    }
}
