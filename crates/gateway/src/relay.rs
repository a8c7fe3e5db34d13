//! Streaming relay: one question in, one ordered event sequence out.
//!
//! [`StreamingRelay::open`] validates the request and resolves the tenant
//! synchronously, so callers can still answer with a plain HTTP error. Once
//! it returns, a producer task owns the request: it emits `start`, pumps
//! upstream tokens, extracts the answer, updates memory, and emits exactly one
//! terminal event. Dropping the event receiver cancels the producer and, with
//! it, the upstream call.

use std::sync::Arc;
use streamgate_core::{
    Adapter, Error, ExtractedAnswer, StreamContent, StreamEvent, TenantProviderConfig,
    TenantStore, TokenStream, is_greeting,
};
use streamgate_memory::{ConversationStore, MemoryKey};
use streamgate_providers::ProviderSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extract::{build_answer, greeting_answer};

/// Event channel depth per request.
const EVENT_BUFFER: usize = 64;

/// One ask.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub tenant_id: String,
    pub question: String,
    pub session_id: Option<String>,
}

/// How a producer task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// The answer streamed to the end and memory was updated.
    Completed(ExtractedAnswer),
    /// A greeting was answered locally.
    Greeted,
    /// An error event terminated the sequence.
    Failed(String),
    /// The client went away before the terminal event.
    Cancelled,
}

/// A live answer: the ordered events plus the producer's handle.
pub struct RelayStream {
    pub events: mpsc::Receiver<StreamEvent>,
    pub handle: JoinHandle<RelayOutcome>,
}

/// Routes questions to the tenant's upstream provider and relays the answer.
pub struct StreamingRelay {
    store: Arc<dyn TenantStore>,
    providers: ProviderSet,
    memory: Arc<ConversationStore>,
}

impl StreamingRelay {
    pub fn new(
        store: Arc<dyn TenantStore>,
        providers: ProviderSet,
        memory: Arc<ConversationStore>,
    ) -> Self {
        Self {
            store,
            providers,
            memory,
        }
    }

    pub fn memory(&self) -> &Arc<ConversationStore> {
        &self.memory
    }

    /// Validate, resolve the tenant, and start the producer.
    ///
    /// Fails with `InvalidInput`, `ConfigNotFound` or a store error before
    /// any event is produced.
    pub async fn open(&self, request: RelayRequest) -> Result<RelayStream, Error> {
        if request.tenant_id.trim().is_empty() {
            return Err(Error::InvalidInput("tenant_id must not be empty".into()));
        }
        if request.question.trim().is_empty() {
            return Err(Error::InvalidInput("question must not be empty".into()));
        }

        let config = self
            .store
            .get(&request.tenant_id)
            .await?
            .ok_or_else(|| Error::ConfigNotFound {
                tenant_id: request.tenant_id.clone(),
            })?;

        let kind = config.provider;
        let turn = Turn {
            greet: self.providers.greeting_shortcut(kind) && is_greeting(&request.question),
            adapter: self.providers.adapter(kind),
            key: MemoryKey::new(request.tenant_id, request.session_id),
            memory: self.memory.clone(),
            question: request.question,
            config,
        };

        let request_id = Uuid::new_v4();
        debug!(%request_id, tenant_id = %turn.config.tenant_id, greet = turn.greet, "Relay opened");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(async move {
            let tenant_id = turn.config.tenant_id.clone();
            let provider = turn.adapter.name().to_string();
            let outcome = turn.run(&tx).await;
            match &outcome {
                RelayOutcome::Completed(answer) => info!(
                    %request_id,
                    %tenant_id,
                    %provider,
                    follow_ups = answer.questions.len(),
                    "Relay completed"
                ),
                RelayOutcome::Greeted => info!(%request_id, %tenant_id, "Greeting answered locally"),
                RelayOutcome::Failed(message) => {
                    warn!(%request_id, %tenant_id, %provider, error = %message, "Relay failed")
                }
                RelayOutcome::Cancelled => {
                    info!(%request_id, %tenant_id, %provider, "Client disconnected")
                }
            }
            outcome
        });

        Ok(RelayStream { events: rx, handle })
    }
}

/// Everything the producer task owns.
struct Turn {
    config: TenantProviderConfig,
    adapter: Arc<dyn Adapter>,
    question: String,
    key: MemoryKey,
    memory: Arc<ConversationStore>,
    greet: bool,
}

impl Turn {
    async fn run(self, tx: &mpsc::Sender<StreamEvent>) -> RelayOutcome {
        let start = StreamEvent::Start {
            question: self.question.clone(),
        };
        if tx.send(start).await.is_err() {
            return RelayOutcome::Cancelled;
        }

        if self.greet {
            let answer = StreamEvent::Stream {
                content: StreamContent::Answer(greeting_answer()),
            };
            if tx.send(answer).await.is_err() || tx.send(StreamEvent::End).await.is_err() {
                return RelayOutcome::Cancelled;
            }
            return RelayOutcome::Greeted;
        }

        let previous_summary = self.memory.summary(&self.key);

        let opened = tokio::select! {
            _ = tx.closed() => return RelayOutcome::Cancelled,
            opened = self.adapter.open_stream(&self.config, &self.question, &previous_summary) => opened,
        };
        let tokens = match opened {
            Ok(tokens) => tokens,
            Err(e) => return fail(tx, e.to_string()).await,
        };

        let text = match pump(tokens, tx).await {
            Pumped::Finished(text) => text,
            Pumped::Failed(message) => return fail(tx, message).await,
            Pumped::Cancelled => return RelayOutcome::Cancelled,
        };

        let answer = build_answer(&text, &previous_summary);
        let recorded = self.memory.record(&self.key, &answer.answer);
        debug!(
            tenant_id = %self.config.tenant_id,
            chars = text.len(),
            recorded,
            "Answer extracted"
        );

        if tx.send(StreamEvent::End).await.is_err() {
            debug!(tenant_id = %self.config.tenant_id, "Client left before end event");
        }
        RelayOutcome::Completed(answer)
    }
}

enum Pumped {
    Finished(String),
    Failed(String),
    Cancelled,
}

/// Forward tokens verbatim while accumulating them.
async fn pump(mut tokens: TokenStream, tx: &mpsc::Sender<StreamEvent>) -> Pumped {
    let mut text = String::new();

    loop {
        let next = tokio::select! {
            _ = tx.closed() => return Pumped::Cancelled,
            next = tokens.recv() => next,
        };

        match next {
            Some(Ok(token)) => {
                text.push_str(&token);
                if tx.send(StreamEvent::token(token)).await.is_err() {
                    return Pumped::Cancelled;
                }
            }
            Some(Err(e)) => return Pumped::Failed(e.to_string()),
            None => return Pumped::Finished(text),
        }
    }
}

async fn fail(tx: &mpsc::Sender<StreamEvent>, message: String) -> RelayOutcome {
    if tx.send(StreamEvent::error(message.clone())).await.is_err() {
        return RelayOutcome::Cancelled;
    }
    RelayOutcome::Failed(message)
}
