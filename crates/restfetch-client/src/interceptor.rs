//! Request and response interception.
//!
//! An interceptor observes an outgoing request or an incoming response
//! and answers with an explicit decision. Decisions are tagged, so the
//! executor never has to guess what a returned value means: a request
//! interceptor either lets the request through, replaces it, or aborts
//! the call; a response interceptor either lets the response through or
//! replaces it before parsing.

use async_trait::async_trait;
use restfetch_http::{RequestDescriptor, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A request interceptor's decision.
#[derive(Debug)]
pub enum RequestIntercept {
    /// Send the request unchanged.
    Continue,
    /// Send this descriptor instead.
    Replace(RequestDescriptor),
    /// Do not send anything; the call fails with an abort error carrying
    /// this reason.
    Abort(String),
}

/// A response interceptor's decision.
#[derive(Debug)]
pub enum ResponseIntercept {
    /// Hand the response to parsing unchanged.
    Continue,
    /// Parse this response instead.
    Replace(Response),
}

/// Inspects outgoing requests before they reach the transport.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: &RequestDescriptor) -> RequestIntercept;
}

/// Inspects responses before they are parsed.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn intercept(&self, request: &RequestDescriptor, response: &Response)
        -> ResponseIntercept;
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Adapts an async closure into a [`RequestInterceptor`].
pub struct RequestFn<F>(pub F);

#[async_trait]
impl<F> RequestInterceptor for RequestFn<F>
where
    F: Fn(&RequestDescriptor) -> BoxFuture<RequestIntercept> + Send + Sync,
{
    async fn intercept(&self, request: &RequestDescriptor) -> RequestIntercept {
        (self.0)(request).await
    }
}

/// Adapts an async closure into a [`ResponseInterceptor`].
pub struct ResponseFn<F>(pub F);

#[async_trait]
impl<F> ResponseInterceptor for ResponseFn<F>
where
    F: Fn(&RequestDescriptor, &Response) -> BoxFuture<ResponseIntercept> + Send + Sync,
{
    async fn intercept(
        &self,
        request: &RequestDescriptor,
        response: &Response,
    ) -> ResponseIntercept {
        (self.0)(request, response).await
    }
}

/// Builds a request interceptor from a synchronous closure.
pub fn request_interceptor<F>(f: F) -> Arc<dyn RequestInterceptor>
where
    F: Fn(&RequestDescriptor) -> RequestIntercept + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(RequestFn(move |request: &RequestDescriptor| {
        let f = Arc::clone(&f);
        let request = request.clone();
        Box::pin(async move { f(&request) }) as BoxFuture<RequestIntercept>
    }))
}

/// Builds a response interceptor from a synchronous closure.
pub fn response_interceptor<F>(f: F) -> Arc<dyn ResponseInterceptor>
where
    F: Fn(&RequestDescriptor, &Response) -> ResponseIntercept + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(ResponseFn(
        move |request: &RequestDescriptor, response: &Response| {
            let f = Arc::clone(&f);
            let request = request.clone();
            let response = response.clone();
            Box::pin(async move { f(&request, &response) }) as BoxFuture<ResponseIntercept>
        },
    ))
}
