use crate::error::QueueResult;
use crate::message::QueuedMessage;
use crate::store::QueueStore;
use crate::transport::MessageTransport;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications for UI indicators.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Online,
    Offline,
    Queued { local_id: Uuid },
    Processing { pending: usize },
    Sent { local_id: Uuid },
    Failed { local_id: Uuid, error: String },
    Processed { sent: usize, remaining: usize },
}

/// What `send_or_enqueue` did with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Queued,
}

/// Outcome of one flush cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub remaining: usize,
    /// Message that failed and now blocks the front of the queue.
    pub failed: Option<Uuid>,
    /// Connectivity dropped before the queue was drained.
    pub interrupted: bool,
}

struct QueueState {
    messages: VecDeque<QueuedMessage>,
    online: bool,
}

/// Ordered, persisted queue of messages written while the connection was down.
///
/// - **Order**: replay is strictly front to back, one acknowledgment at a time
/// - **Head-of-line blocking**: a failed message stays at the front and ends the cycle
/// - **Durability**: the store is rewritten after every enqueue, acknowledgment and clear
///
/// The state lock is never held across a transport call.
pub struct OfflineQueue<S: QueueStore, T: MessageTransport> {
    store: Arc<S>,
    transport: Arc<T>,
    state: Mutex<QueueState>,
    flush_lock: Mutex<()>,
    events: broadcast::Sender<QueueEvent>,
}

impl<S: QueueStore, T: MessageTransport> OfflineQueue<S, T> {
    /// Loads whatever the store kept from a previous run. Nothing is sent until
    /// `flush` or an offline to online transition.
    pub async fn open(store: Arc<S>, transport: Arc<T>, online: bool) -> QueueResult<Self> {
        let messages: VecDeque<QueuedMessage> = store.load().await?.into();
        if !messages.is_empty() {
            info!(pending = messages.len(), "Restored offline queue");
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            store,
            transport,
            state: Mutex::new(QueueState {
                messages,
                online,
            }),
            flush_lock: Mutex::new(()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub async fn enqueue(&self, message: QueuedMessage) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        let local_id = message.local_id;
        state.messages.push_back(message);
        self.persist(&state).await?;
        drop(state);

        debug!(%local_id, "Message queued");
        self.emit(QueueEvent::Queued { local_id });
        Ok(())
    }

    /// Sends right away only when online with nothing queued ahead of the message
    /// and no replay or other direct send running. Anything else, including a
    /// transport failure, queues it.
    pub async fn send_or_enqueue(&self, message: QueuedMessage) -> QueueResult<Delivery> {
        // a direct send holds the flush lock so later sends and replays wait behind it
        let in_flight = {
            let state = self.state.lock().await;
            if state.online && state.messages.is_empty() {
                self.flush_lock.try_lock().ok()
            } else {
                None
            }
        };
        let Some(_in_flight) = in_flight else {
            self.enqueue(message).await?;
            return Ok(Delivery::Queued);
        };

        match self.transport.send(&message).await {
            Ok(()) => {
                self.emit(QueueEvent::Sent {
                    local_id: message.local_id,
                });
                Ok(Delivery::Sent)
            }
            Err(e) => {
                warn!(local_id = %message.local_id, error = %e, "Direct send failed, queueing");
                // written before anything queued while it was in flight
                let local_id = message.local_id;
                let mut state = self.state.lock().await;
                state.messages.push_front(message);
                self.persist(&state).await?;
                drop(state);

                self.emit(QueueEvent::Queued { local_id });
                Ok(Delivery::Queued)
            }
        }
    }

    /// Records connectivity. Going from offline to online replays the queue and
    /// returns that cycle's report.
    pub async fn set_online(&self, online: bool) -> QueueResult<Option<FlushReport>> {
        let was_online = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut state.online, online)
        };
        if was_online == online {
            return Ok(None);
        }

        if online {
            info!("Back online");
            self.emit(QueueEvent::Online);
            Ok(Some(self.flush().await?))
        } else {
            info!("Gone offline");
            self.emit(QueueEvent::Offline);
            Ok(None)
        }
    }

    /// Replays queued messages in order until the queue is empty, a send fails
    /// or connectivity drops. Concurrent calls run one after another.
    pub async fn flush(&self) -> QueueResult<FlushReport> {
        let _flush = self.flush_lock.lock().await;

        let pending = {
            let state = self.state.lock().await;
            if !state.online || state.messages.is_empty() {
                return Ok(FlushReport {
                    remaining: state.messages.len(),
                    interrupted: !state.online && !state.messages.is_empty(),
                    ..FlushReport::default()
                });
            }
            state.messages.len()
        };

        info!(pending, "Processing offline queue");
        self.emit(QueueEvent::Processing { pending });

        let mut report = FlushReport::default();
        let result = self.replay(&mut report).await;

        report.remaining = self.state.lock().await.messages.len();

        result?;
        info!(
            sent = report.sent,
            remaining = report.remaining,
            "Offline queue processed"
        );
        self.emit(QueueEvent::Processed {
            sent: report.sent,
            remaining: report.remaining,
        });
        Ok(report)
    }

    async fn replay(&self, report: &mut FlushReport) -> QueueResult<()> {
        loop {
            let next = {
                let state = self.state.lock().await;
                if !state.online {
                    report.interrupted = !state.messages.is_empty();
                    return Ok(());
                }
                match state.messages.front() {
                    Some(message) => message.clone(),
                    None => return Ok(()),
                }
            };

            match self.transport.send(&next).await {
                Ok(()) => {
                    let mut state = self.state.lock().await;
                    // `clear` may have emptied the queue while the send was in flight
                    if state.messages.front().map(|m| m.local_id) == Some(next.local_id) {
                        state.messages.pop_front();
                        self.persist(&state).await?;
                    }
                    drop(state);

                    report.sent += 1;
                    debug!(local_id = %next.local_id, "Queued message sent");
                    self.emit(QueueEvent::Sent {
                        local_id: next.local_id,
                    });
                }
                Err(e) => {
                    warn!(
                        local_id = %next.local_id,
                        error = %e,
                        "Queued message failed, stopping replay"
                    );
                    report.failed = Some(next.local_id);
                    self.emit(QueueEvent::Failed {
                        local_id: next.local_id,
                        error: e.to_string(),
                    });
                    return Ok(());
                }
            }
        }
    }

    pub async fn pending(&self) -> Vec<QueuedMessage> {
        self.state.lock().await.messages.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_online(&self) -> bool {
        self.state.lock().await.online
    }

    pub async fn clear(&self) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.messages.clear();
        self.persist(&state).await
    }

    async fn persist(&self, state: &QueueState) -> QueueResult<()> {
        let messages: Vec<QueuedMessage> = state.messages.iter().cloned().collect();
        self.store.save(&messages).await
    }

    fn emit(&self, event: QueueEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
