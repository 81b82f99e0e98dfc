//! Correlation wrapper
//!
//! One generic wrapper for every trigger kind. The only per-trigger part is
//! the [`CorrelationExtractor`] it is built with.
//!
//! Invocation path:
//! extract id → open scope → `iteration N` trace → run handler in the
//! scope span → one dependency record → non-blocking flush → handler result.
//!
//! The dependency record always reports `success = true` and result code
//! 200, also when the handler fails. Telemetry problems never fail the
//! invocation.

use invocation_span::{
    Correlation, CorrelationScope, DependencyTemplate, InvocationContext, SeverityLevel,
};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::Instrument;

use crate::contracts::TriggerKind;
use crate::telemetry::{Outcome, TelemetryClient, TriggerMetrics};
use crate::triggers::{CorrelationExtractor, ExtractionError, TriggerExtractor};

/// Failure of a wrapped invocation.
#[derive(Error, Debug)]
pub enum WrapError<E> {
    /// No correlation id could be derived; the handler was not called.
    #[error("correlation extraction failed: {0}")]
    Extraction(#[source] ExtractionError),

    /// The handler ran and failed. Carried unchanged.
    #[error("handler failed: {0}")]
    Handler(#[source] E),
}

impl<E> WrapError<E> {
    /// The handler's own error, if it got that far
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            WrapError::Handler(e) => Some(e),
            WrapError::Extraction(_) => None,
        }
    }
}

/// Counts an invocation as in flight until dropped, also when the invocation
/// future is cancelled mid-handler.
struct InFlight<'a>(Option<&'a TriggerMetrics>);

impl<'a> InFlight<'a> {
    fn enter(metrics: Option<&'a TriggerMetrics>) -> Self {
        if let Some(m) = metrics {
            m.inc_in_flight();
        }
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(m) = self.0 {
            m.dec_in_flight();
        }
    }
}

/// Wraps trigger handlers with correlation and dependency telemetry.
pub struct CorrelationWrapper<X> {
    extractor: X,
    telemetry: TelemetryClient,
    template: DependencyTemplate,
}

impl CorrelationWrapper<TriggerExtractor> {
    /// Wrapper using the built-in rule of `trigger`.
    pub fn for_trigger(
        trigger: TriggerKind,
        telemetry: TelemetryClient,
        template: DependencyTemplate,
    ) -> Self {
        Self::new(TriggerExtractor::new(trigger), telemetry, template)
    }
}

impl<X: CorrelationExtractor> CorrelationWrapper<X> {
    pub fn new(extractor: X, telemetry: TelemetryClient, template: DependencyTemplate) -> Self {
        Self {
            extractor,
            telemetry,
            template,
        }
    }

    pub fn extractor(&self) -> &X {
        &self.extractor
    }

    pub fn telemetry(&self) -> &TelemetryClient {
        &self.telemetry
    }

    pub fn template(&self) -> &DependencyTemplate {
        &self.template
    }

    /// Run `handler` for one invocation.
    ///
    /// The handler receives the [`Correlation`] of the invocation and runs
    /// inside its tracing span. Its result is returned unchanged.
    ///
    /// If the returned future is dropped before the handler completes (a
    /// host timeout or a client disconnect), no dependency record is
    /// emitted for the invocation.
    pub async fn wrap<H, Fut, T, E>(
        &self,
        ctx: &InvocationContext,
        payload: &Value,
        handler: H,
    ) -> Result<T, WrapError<E>>
    where
        H: FnOnce(Correlation) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let rule = self.extractor.name();

        let correlation_id = match self.extractor.extract(payload) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    function = %ctx.function_name,
                    invocation_id = %ctx.invocation_id,
                    rule = rule,
                    error = %e,
                    "Correlation extraction failed"
                );
                if let Some(m) = self.telemetry.metrics() {
                    m.record_invocation(rule, Outcome::ExtractionError);
                }
                return Err(WrapError::Extraction(e));
            }
        };

        let scope = CorrelationScope::open(ctx, correlation_id);

        let iteration = self.telemetry.next_iteration();
        self.telemetry.track_trace(scope.trace(
            format!("iteration {}", iteration),
            SeverityLevel::Information,
        ));

        let in_flight = InFlight::enter(self.telemetry.metrics().map(|m| m.as_ref()));
        let result = scope
            .span()
            .in_scope(|| handler(scope.correlation()))
            .instrument(scope.span().clone())
            .await;
        drop(in_flight);

        let elapsed = scope.elapsed();
        let correlation_id = scope.correlation_id().to_string();
        self.telemetry
            .track_dependency(scope.finish_dependency(&self.template));
        self.telemetry.flush();

        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::HandlerError
        };

        if let Some(m) = self.telemetry.metrics() {
            m.record_invocation(rule, outcome);
            m.observe_duration(rule, elapsed.as_secs_f64());
        }

        tracing::debug!(
            function = %ctx.function_name,
            correlation_id = %correlation_id,
            iteration = iteration,
            outcome = outcome.as_str(),
            duration_ms = elapsed.as_millis() as u64,
            "Invocation wrapped"
        );

        result.map_err(WrapError::Handler)
    }
}
