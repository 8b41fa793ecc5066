//! Pipeline execution.
//!
//! # State machine
//! ```text
//! cursor → step i
//!   request-response : forward effective body
//!       2xx ∧ more steps  → module response body becomes effective body
//!       otherwise         → relay module response, end
//!   request-only     : forward a buffered copy of the effective body
//!       non-2xx           → relay module response, end
//!       2xx ∧ more steps  → keep effective body
//!       2xx ∧ last        → module status/headers + effective body, end
//!   headers          : forward headers only
//!       non-2xx           → relay module response, end
//!       2xx ∧ more steps  → wait for module response to complete, keep body
//!       2xx ∧ last        → module status/headers + effective body, end
//!   X-Okapi-Stop on any response → relay it, end
//! no steps remain → drain effective body, 404
//! ```
//!
//! Steps run strictly one after another inside the request's own task, so
//! trace entries are recorded in execution order. Nothing is retried: a hop
//! that cannot be reached ends the request with 500.

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response as HttpResponse},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::{forward_headers, RequestContext};
use crate::http::response::{relay, relay_okapi_headers, relay_with_body, stop_requested};
use crate::pipeline::body;
use crate::pipeline::client::ModuleClient;
use crate::pipeline::step::PipelineStep;
use crate::pipeline::trace::Trace;
use crate::registry::RoutingType;

/// Forwarding strategy of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RequestResponse,
    RequestOnly,
    Headers,
}

impl Strategy {
    /// Strategy for a resolved step. Redirects are expanded by the resolver,
    /// so a redirect reaching the executor is as much a defect as an unknown
    /// type.
    pub fn for_step(step: &PipelineStep) -> GatewayResult<Self> {
        match &step.entry.kind {
            RoutingType::RequestResponse => Ok(Strategy::RequestResponse),
            RoutingType::RequestOnly => Ok(Strategy::RequestOnly),
            RoutingType::Headers => Ok(Strategy::Headers),
            kind @ (RoutingType::Redirect | RoutingType::Other(_)) => {
                Err(GatewayError::UnsupportedRoutingType {
                    kind: kind.to_string(),
                    module: step.module_id().clone(),
                    path: step.path.clone(),
                })
            }
        }
    }
}

/// Decision taken after one step.
enum Flow {
    /// Run the next step with this effective body.
    Continue(Body),
    /// The pipeline ends with this response.
    Respond(Response),
}

/// Per-request mutable state, owned by the request's task.
struct Exchange<'a> {
    ctx: &'a RequestContext,
    /// Request headers for the next module call.
    headers: HeaderMap,
    trace: Trace,
}

impl Exchange<'_> {
    fn record(&mut self, step: &PipelineStep, response: &HttpResponse<Incoming>, elapsed: Duration) {
        tracing::debug!(
            request_id = %self.ctx.request_id,
            module = %step.module_id(),
            level = %step.level(),
            kind = %step.entry.kind,
            status = response.status().as_u16(),
            elapsed_us = elapsed.as_micros() as u64,
            "Module responded"
        );
        self.trace.record(
            self.ctx.method.clone(),
            step.module_id().clone(),
            response.status(),
            elapsed,
        );
    }
}

/// Drives resolved steps to a client response.
#[derive(Clone)]
pub struct Pipeline {
    client: ModuleClient,
    public_url: Option<HeaderValue>,
    max_buffered_body: usize,
}

impl Pipeline {
    pub fn new(
        client: ModuleClient,
        public_url: Option<HeaderValue>,
        max_buffered_body: usize,
    ) -> Self {
        Self {
            client,
            public_url,
            max_buffered_body,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let public_url = match HeaderValue::from_str(&config.listener.public_url) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(public_url = %config.listener.public_url, "Invalid public URL, not forwarding X-Okapi-Url");
                None
            }
        };
        Self::new(
            ModuleClient::new(Duration::from_secs(config.timeouts.connect_secs)),
            public_url,
            config.limits.max_buffered_body_bytes,
        )
    }

    /// Execute `steps` for one request and produce the client response.
    ///
    /// The trace accumulated up to the terminating step is attached to every
    /// outcome, including errors.
    pub async fn execute(
        &self,
        steps: Vec<PipelineStep>,
        ctx: &RequestContext,
        inbound: &HeaderMap,
        body: Body,
    ) -> Response {
        let plan = match plan(steps) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id, error = %e, "Rejecting misconfigured pipeline");
                body::drain(body).await;
                return e.into_response();
            }
        };

        let mut exchange = Exchange {
            ctx,
            headers: forward_headers(inbound, &ctx.request_id, self.public_url.as_ref()),
            trace: Trace::new(),
        };

        let mut current = body;
        let total = plan.len();

        for (index, (strategy, step)) in plan.iter().enumerate() {
            let last = index + 1 == total;
            let outcome = match strategy {
                Strategy::RequestResponse => {
                    self.request_response(&mut exchange, step, current, last).await
                }
                Strategy::RequestOnly => self.request_only(&mut exchange, step, current, last).await,
                Strategy::Headers => self.headers_only(&mut exchange, step, current, last).await,
            };

            match outcome {
                Ok(Flow::Continue(next)) => current = next,
                Ok(Flow::Respond(response)) => return exchange.trace.finish(response),
                Err(e) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        module = %step.module_id(),
                        error = %e,
                        "Pipeline aborted"
                    );
                    return exchange.trace.finish(e.into_response());
                }
            }
        }

        // No steps remain.
        body::drain(current).await;
        let not_found = GatewayError::NoRoute {
            path: ctx.path.clone(),
            tenant: ctx.tenant.clone(),
        };
        exchange.trace.finish(not_found.into_response())
    }

    async fn call(
        &self,
        exchange: &Exchange<'_>,
        step: &PipelineStep,
        headers: HeaderMap,
        body: Body,
    ) -> GatewayResult<HttpResponse<Incoming>> {
        tracing::debug!(
            request_id = %exchange.ctx.request_id,
            module = %step.module_id(),
            location = %step.location,
            path = %step.path,
            "Invoking module"
        );
        self.client
            .send(
                &step.location,
                exchange.ctx.method.clone(),
                &exchange.ctx.path_and_query(&step.path),
                headers,
                body,
            )
            .await
    }

    async fn request_response(
        &self,
        exchange: &mut Exchange<'_>,
        step: &PipelineStep,
        body: Body,
        last: bool,
    ) -> GatewayResult<Flow> {
        let start = Instant::now();
        let response = self.call(exchange, step, exchange.headers.clone(), body).await?;
        exchange.record(step, &response, start.elapsed());

        if last || !response.status().is_success() || stop_requested(response.headers()) {
            return Ok(Flow::Respond(relay(response)));
        }

        // The module's response is the payload of the next hop.
        relay_okapi_headers(response.headers(), &mut exchange.headers);
        exchange.headers.remove(header::CONTENT_LENGTH);
        match response.headers().get(header::CONTENT_TYPE) {
            Some(content_type) => {
                exchange.headers.insert(header::CONTENT_TYPE, content_type.clone());
            }
            None => {
                exchange.headers.remove(header::CONTENT_TYPE);
            }
        }
        Ok(Flow::Continue(Body::new(response.into_body())))
    }

    async fn request_only(
        &self,
        exchange: &mut Exchange<'_>,
        step: &PipelineStep,
        body: Body,
        last: bool,
    ) -> GatewayResult<Flow> {
        let payload = body::buffer(body, self.max_buffered_body).await?;

        let mut headers = exchange.headers.clone();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));

        let start = Instant::now();
        let response = self.call(exchange, step, headers, Body::from(payload.clone())).await?;
        exchange.record(step, &response, start.elapsed());

        if !response.status().is_success() || stop_requested(response.headers()) {
            return Ok(Flow::Respond(relay(response)));
        }
        if last {
            return Ok(Flow::Respond(relay_with_body(response, Body::from(payload))));
        }

        relay_okapi_headers(response.headers(), &mut exchange.headers);
        body::drain(Body::new(response.into_body())).await;
        Ok(Flow::Continue(Body::from(payload)))
    }

    async fn headers_only(
        &self,
        exchange: &mut Exchange<'_>,
        step: &PipelineStep,
        body: Body,
        last: bool,
    ) -> GatewayResult<Flow> {
        let mut headers = exchange.headers.clone();
        headers.remove(header::CONTENT_LENGTH);

        // The effective body stays untouched, and unread, while the module
        // looks at the headers.
        let start = Instant::now();
        let response = self.call(exchange, step, headers, Body::empty()).await?;
        exchange.record(step, &response, start.elapsed());

        if !response.status().is_success() || stop_requested(response.headers()) {
            return Ok(Flow::Respond(relay(response)));
        }
        if last {
            return Ok(Flow::Respond(relay_with_body(response, body)));
        }

        relay_okapi_headers(response.headers(), &mut exchange.headers);
        body::drain(Body::new(response.into_body())).await;
        Ok(Flow::Continue(body))
    }
}

/// Pair each step with its strategy, refusing the whole pipeline when any
/// step cannot be executed.
fn plan(steps: Vec<PipelineStep>) -> GatewayResult<Vec<(Strategy, PipelineStep)>> {
    steps
        .into_iter()
        .map(|step| Strategy::for_step(&step).map(|strategy| (strategy, step)))
        .collect()
}
