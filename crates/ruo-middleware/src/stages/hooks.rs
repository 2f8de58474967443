//! Observation hooks around the handler.
//!
//! Hooks are synchronous observers: they see the context but cannot change
//! the outcome. The stages also record handler timings in the context.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ruo_core::{BoxFuture, PipelineError, Reply};

use crate::context::RequestContext;
use crate::stage::{Flow, ResponseStage, Stage};
use crate::types::Request;

/// A function observing the request context.
pub type ObserveHook = Arc<dyn Fn(&RequestContext) + Send + Sync>;

/// When the handler started and finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Set just before the invoker runs.
    pub handler_started: Option<Instant>,
    /// Set when the response pipeline begins.
    pub handler_finished: Option<Instant>,
}

impl StageTimings {
    /// Returns how long the handler took, if both ends were recorded.
    #[must_use]
    pub fn handler_duration(&self) -> Option<Duration> {
        match (self.handler_started, self.handler_finished) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}

/// Runs the pre-handler hook and marks the handler start.
#[derive(Clone, Default)]
pub struct PreHandlerHookStage {
    hook: Option<ObserveHook>,
}

impl PreHandlerHookStage {
    /// Creates the stage; `None` only records timings.
    #[must_use]
    pub fn new(hook: Option<ObserveHook>) -> Self {
        Self { hook }
    }
}

impl fmt::Debug for PreHandlerHookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreHandlerHookStage")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Stage for PreHandlerHookStage {
    fn name(&self) -> &'static str {
        "pre_handler_hook"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        ctx.set_extension(StageTimings {
            handler_started: Some(Instant::now()),
            handler_finished: None,
        });
        if let Some(hook) = &self.hook {
            hook(ctx);
        }
        Box::pin(std::future::ready(Ok(Flow::Continue)))
    }
}

/// Marks the handler end and runs the post-handler hook.
///
/// Runs for every reply; the hook can tell whether a handler ran from
/// [`StageTimings`].
#[derive(Clone, Default)]
pub struct PostHandlerHookStage {
    hook: Option<ObserveHook>,
}

impl PostHandlerHookStage {
    /// Creates the stage; `None` only records timings.
    #[must_use]
    pub fn new(hook: Option<ObserveHook>) -> Self {
        Self { hook }
    }
}

impl fmt::Debug for PostHandlerHookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostHandlerHookStage")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl ResponseStage for PostHandlerHookStage {
    fn name(&self) -> &'static str {
        "post_handler_hook"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _reply: &'a mut Reply,
    ) -> BoxFuture<'a, ()> {
        if let Some(timings) = ctx.get_extension_mut::<StageTimings>() {
            timings.handler_finished = Some(Instant::now());
        }
        if let Some(hook) = &self.hook {
            hook(ctx);
        }
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use ruo_core::RequestId;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> RequestContext {
        RequestContext::new(RequestId::new(), Arc::from("1"), Method::GET, "/users")
    }

    #[tokio::test]
    async fn test_hooks_observe_and_time() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let hook: ObserveHook = Arc::new(move |ctx: &RequestContext| {
            assert_eq!(ctx.path(), "/users");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut ctx = context();
        let mut request = http::Request::new(Bytes::new());
        PreHandlerHookStage::new(Some(Arc::clone(&hook)))
            .process(&mut ctx, &mut request)
            .await
            .unwrap();
        assert!(ctx.get_extension::<StageTimings>().unwrap().handler_started.is_some());

        let mut reply = Reply::ok(json!({}));
        PostHandlerHookStage::new(Some(hook))
            .process(&mut ctx, &mut reply)
            .await;

        let timings = ctx.get_extension::<StageTimings>().unwrap();
        assert!(timings.handler_duration().is_some());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_post_hook_without_handler() {
        let mut ctx = context();
        let mut reply = Reply::ok(json!({}));
        PostHandlerHookStage::new(None).process(&mut ctx, &mut reply).await;
        assert!(ctx.get_extension::<StageTimings>().is_none());
    }

    #[test]
    fn test_duration_requires_both_ends() {
        assert_eq!(StageTimings::default().handler_duration(), None);
    }
}
