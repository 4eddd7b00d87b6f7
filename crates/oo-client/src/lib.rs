//! # oo-client
//!
//! HTTP client for the Ouroboros Compute API.
//!
//! The crate is layered:
//! - `HttpTransport` moves one request over the wire (reqwest, or a mock)
//! - `RequestDispatcher` turns a request into a JSON payload or an
//!   `OoError`, retrying only when no HTTP response arrived at all
//! - `OperationPoller` waits for a long-running execution to finish
//! - `OuroborosClient` wraps every REST endpoint in a typed method
//!
//! Sleeping goes through the `Clock` trait so retry backoff and poll
//! deadlines can be driven by a virtual clock in tests.

mod client;
mod clock;
mod dispatcher;
pub mod filters;
mod poller;
mod query;
mod transport;

pub use client::OuroborosClient;
pub use clock::{Clock, MockClock, TokioClock};
pub use dispatcher::{RequestDispatcher, RetryPolicy};
pub use poller::{OperationEndpoints, OperationPoller, PollOptions};
pub use query::{QueryParams, QueryValue};
pub use transport::{
    ApiRequest, HttpTransport, Method, MockTransport, RawResponse, ReqwestTransport,
    TransportError,
};
