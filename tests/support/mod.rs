//! Shared test doubles for behaviour tests.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tickpulse_core::provider::ProviderFuture;
use tickpulse_core::{
    AggregatesRequest, Bar, Dividend, HttpClient, HttpError, HttpRequest, HttpResponse,
    MarketDataProvider, PolygonAdapter, PolygonConfig, Quote, Snapshot, SourceError, Ticker,
    Trade, TradesRequest,
};

pub const BASE_URL: &str = "https://polygon.test";
pub const API_KEY: &str = "contract-key";

/// HTTP double answering by URL fragment and recording every request.
#[derive(Default)]
pub struct StubHttpClient {
    routes: Vec<(String, Result<HttpResponse, HttpError>)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, status: u16, body: &str) -> Self {
        self.routes
            .push((fragment.to_owned(), Ok(HttpResponse::new(status, body))));
        self
    }

    pub fn fail(mut self, fragment: &str, error: HttpError) -> Self {
        self.routes.push((fragment.to_owned(), Err(error)));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }
}

impl HttpClient for StubHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(HttpResponse::new(404, r#"{"status":"NOT_FOUND"}"#)));
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        Box::pin(async move { response })
    }
}

pub fn polygon_with(client: Arc<StubHttpClient>) -> PolygonAdapter {
    let config = PolygonConfig::new(API_KEY).with_base_url(BASE_URL);
    PolygonAdapter::with_http_client(client, &config)
}

pub fn ticker(value: &str) -> Ticker {
    Ticker::parse(value).expect("valid ticker")
}

/// Provider double with canned results and per-endpoint call counters.
pub struct StubProvider {
    pub bars: Result<Vec<Bar>, SourceError>,
    pub trades: Result<Vec<Trade>, SourceError>,
    pub quote: Result<Quote, SourceError>,
    pub snapshot: Result<Snapshot, SourceError>,
    pub dividends: Result<Vec<Dividend>, SourceError>,
    pub aggregate_calls: AtomicUsize,
    pub quote_calls: AtomicUsize,
    pub last_aggregates: Mutex<Option<AggregatesRequest>>,
    pub last_trades: Mutex<Option<TradesRequest>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self {
            bars: Ok(Vec::new()),
            trades: Ok(Vec::new()),
            quote: Err(SourceError::not_found("no quote configured")),
            snapshot: Ok(Snapshot::default()),
            dividends: Ok(Vec::new()),
            aggregate_calls: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
            last_aggregates: Mutex::new(None),
            last_trades: Mutex::new(None),
        }
    }
}

impl MarketDataProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn aggregates<'a>(&'a self, req: AggregatesRequest) -> ProviderFuture<'a, Vec<Bar>> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_aggregates
            .lock()
            .expect("request store should not be poisoned") = Some(req);
        let result = self.bars.clone();
        Box::pin(async move { result })
    }

    fn trades<'a>(&'a self, req: TradesRequest) -> ProviderFuture<'a, Vec<Trade>> {
        *self
            .last_trades
            .lock()
            .expect("request store should not be poisoned") = Some(req);
        let result = self.trades.clone();
        Box::pin(async move { result })
    }

    fn last_quote<'a>(&'a self, _ticker: Ticker) -> ProviderFuture<'a, Quote> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.quote.clone();
        Box::pin(async move { result })
    }

    fn snapshot<'a>(&'a self, _ticker: Ticker) -> ProviderFuture<'a, Snapshot> {
        let result = self.snapshot.clone();
        Box::pin(async move { result })
    }

    fn dividends<'a>(&'a self, _ticker: Ticker) -> ProviderFuture<'a, Vec<Dividend>> {
        let result = self.dividends.clone();
        Box::pin(async move { result })
    }
}
