//! Background request interception
//!
//! Programmatic generations issued by other components bypass the host's
//! generation lifecycle. Callers route them through [`RequestInterceptor`],
//! which counts the prompt while the request is in flight and records once
//! the response arrives.
//!
//! The interception scope is a task-local marker set around the wrapped
//! request. Only code running inside that call chain sees it: nested
//! interceptions pass straight through and the lifecycle tracker ignores
//! request-ready events raised by the background request itself.
//! Independent requests and user generations on other tasks are unaffected.

use crate::ledger::UsageLedger;
use crate::lifecycle::ChatContext;
use std::future::Future;
use std::sync::Arc;
use tokentally_llm::{PromptPayload, TokenCounter};
use tracing::debug;

tokio::task_local! {
    static INTERCEPTING: ();
}

/// Handle on the task-local reentrancy marker
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptScope;

impl InterceptScope {
    /// Create a handle
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether the calling task is inside an interception
    #[must_use]
    pub fn is_active(&self) -> bool {
        INTERCEPTING.try_with(|_| ()).is_ok()
    }

    /// Run `fut` with the scope active for its call chain
    pub async fn run<F: Future>(&self, fut: F) -> F::Output {
        INTERCEPTING.scope((), fut).await
    }
}

/// Response types the interceptor can count
pub trait ResponseText {
    /// Generated text of the response
    fn response_text(&self) -> &str;
}

impl ResponseText for String {
    fn response_text(&self) -> &str {
        self
    }
}

/// Wraps background requests with accounting
#[derive(Clone)]
pub struct RequestInterceptor {
    counter: TokenCounter,
    ledger: Arc<UsageLedger>,
    chat: Arc<dyn ChatContext>,
    scope: InterceptScope,
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("counter", &self.counter)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl RequestInterceptor {
    /// Create an interceptor sharing `scope` with the lifecycle tracker
    #[must_use]
    pub fn new(
        counter: TokenCounter,
        ledger: Arc<UsageLedger>,
        chat: Arc<dyn ChatContext>,
        scope: InterceptScope,
    ) -> Self {
        Self {
            counter,
            ledger,
            chat,
            scope,
        }
    }

    /// The reentrancy marker
    #[must_use]
    pub fn scope(&self) -> &InterceptScope {
        &self.scope
    }

    /// Run `request`, recording its usage on success
    ///
    /// The request's result is always returned unchanged. Failed requests
    /// and nested interceptions record nothing.
    pub async fn intercept<F, T, E>(
        &self,
        model_id: Option<&str>,
        payload: &PromptPayload,
        request: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        T: ResponseText,
    {
        if self.scope.is_active() {
            debug!("nested interception, passing through");
            return request.await;
        }

        let (input, result) = self
            .scope
            .run(async { tokio::join!(self.counter.count_prompt(payload), request) })
            .await;

        match &result {
            Ok(response) => {
                let output = self.counter.count_text(response.response_text()).await;
                let model_id = model_id
                    .map(str::to_string)
                    .or_else(|| self.chat.current_model());
                let chat_id = self.chat.chat_id();
                debug!(input, output, "background request completed");
                self.ledger
                    .record(
                        input as u64,
                        output as u64,
                        chat_id.as_deref(),
                        model_id.as_deref(),
                    )
                    .await;
            }
            Err(_) => debug!(input, "background request failed, not recorded"),
        }
        result
    }
}
