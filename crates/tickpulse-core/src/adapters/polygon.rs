use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::PolygonConfig;
use crate::http_client::{BearerToken, HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::provider::{
    AggregatesRequest, MarketDataProvider, ProviderFuture, SourceError, TradesRequest,
};
use crate::{
    Bar, Dividend, MinuteStats, PrevDayStats, Quote, Snapshot, Ticker, Trade, TradeDate,
    ValidationError,
};

/// Polygon accepts at most this many rows per page on list endpoints.
const PAGE_LIMIT: u32 = 50_000;

/// Polygon.io REST adapter.
#[derive(Clone)]
pub struct PolygonAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: BearerToken,
    base_url: String,
    timeout_ms: u64,
}

impl PolygonAdapter {
    pub fn from_config(config: &PolygonConfig) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), config)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, config: &PolygonConfig) -> Self {
        Self {
            http_client,
            auth: BearerToken::new(config.api_key.as_str()),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            timeout_ms: config.timeout_ms,
        }
    }

    async fn execute_authenticated_call<T>(
        &self,
        endpoint: &'static str,
        path_and_query: &str,
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(endpoint, url = %url, "polygon request");

        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|error| {
            warn!(endpoint, error = %error, "polygon transport failure");
            if error.retryable() {
                SourceError::unavailable(format!("polygon transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("polygon transport error: {}", error.message()))
            }
        })?;

        if let Err(error) = check_status(&response) {
            warn!(
                endpoint,
                status = response.status,
                code = error.code(),
                "polygon request failed"
            );
            return Err(error);
        }

        serde_json::from_str(&response.body).map_err(|e| {
            SourceError::malformed_response(format!(
                "failed to parse polygon {endpoint} response: {e}"
            ))
        })
    }
}

impl MarketDataProvider for PolygonAdapter {
    fn name(&self) -> &'static str {
        "polygon"
    }

    fn aggregates<'a>(&'a self, req: AggregatesRequest) -> ProviderFuture<'a, Vec<Bar>> {
        Box::pin(async move {
            let path = format!(
                "/v2/aggs/ticker/{}/range/{}/{}/{}/{}?adjusted=true&sort=asc&limit={PAGE_LIMIT}",
                req.ticker, req.multiplier, req.timespan, req.from, req.to
            );
            let response: PolygonAggregatesResponse =
                self.execute_authenticated_call("aggregates", &path).await?;
            note_truncation("aggregates", response.next_url.as_deref());

            response
                .results
                .unwrap_or_default()
                .into_iter()
                .map(normalize_bar)
                .collect()
        })
    }

    fn trades<'a>(&'a self, req: TradesRequest) -> ProviderFuture<'a, Vec<Trade>> {
        Box::pin(async move {
            let path = format!(
                "/v3/trades/{}?timestamp={}&limit={PAGE_LIMIT}",
                req.ticker, req.date
            );
            let response: PolygonTradesResponse =
                self.execute_authenticated_call("trades", &path).await?;
            note_truncation("trades", response.next_url.as_deref());

            response
                .results
                .unwrap_or_default()
                .into_iter()
                .map(normalize_trade)
                .collect()
        })
    }

    fn last_quote<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, Quote> {
        Box::pin(async move {
            let path = format!("/v2/last/nbbo/{ticker}");
            let response: PolygonLastQuoteResponse =
                self.execute_authenticated_call("last_quote", &path).await?;

            let payload = response.results.ok_or_else(|| {
                SourceError::not_found(format!("polygon has no NBBO quote for {ticker}"))
            })?;
            normalize_quote(payload)
        })
    }

    fn snapshot<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, Snapshot> {
        Box::pin(async move {
            let path = format!("/v2/snapshot/locale/us/markets/stocks/tickers/{ticker}");
            let response: PolygonSnapshotResponse =
                self.execute_authenticated_call("snapshot", &path).await?;

            let payload = response.ticker.ok_or_else(|| {
                SourceError::malformed_response(format!(
                    "polygon snapshot response for {ticker} has no ticker object"
                ))
            })?;
            normalize_snapshot(payload)
        })
    }

    fn dividends<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, Vec<Dividend>> {
        Box::pin(async move {
            let path = format!(
                "/v3/reference/dividends?ticker={}",
                urlencoding::encode(ticker.as_str())
            );
            let response: PolygonDividendsResponse =
                self.execute_authenticated_call("dividends", &path).await?;
            note_truncation("dividends", response.next_url.as_deref());

            response
                .results
                .unwrap_or_default()
                .into_iter()
                .map(normalize_dividend)
                .collect()
        })
    }
}

/// Maps non-2xx statuses and `status: "ERROR"` bodies to typed errors.
fn check_status(response: &HttpResponse) -> Result<(), SourceError> {
    let status_body = serde_json::from_str::<PolygonStatusBody>(&response.body).ok();
    let upstream_message = status_body
        .as_ref()
        .and_then(|body| body.error.clone().or_else(|| body.message.clone()))
        .filter(|message| !message.trim().is_empty());

    if !response.is_success() {
        let message = upstream_message.unwrap_or_else(|| {
            format!("polygon upstream returned status {}", response.status)
        });
        return Err(match response.status {
            401 | 403 => SourceError::unauthorized(message),
            404 => SourceError::not_found(message),
            429 => SourceError::rate_limited(message),
            _ => SourceError::unavailable(message),
        });
    }

    match status_body.as_ref().and_then(|body| body.status.as_deref()) {
        Some("ERROR") => Err(SourceError::unavailable(
            upstream_message.unwrap_or_else(|| String::from("polygon reported an error")),
        )),
        Some("NOT_AUTHORIZED") => Err(SourceError::unauthorized(
            upstream_message.unwrap_or_else(|| String::from("polygon rejected the api key")),
        )),
        _ => Ok(()),
    }
}

fn note_truncation(endpoint: &'static str, next_url: Option<&str>) {
    if next_url.is_some() {
        debug!(endpoint, "polygon returned more pages; using first page only");
    }
}

#[derive(Debug, Deserialize)]
struct PolygonStatusBody {
    status: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonAggregatesResponse {
    results: Option<Vec<PolygonAggregatePayload>>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonAggregatePayload {
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
    #[serde(rename = "vw")]
    vwap: Option<f64>,
    #[serde(rename = "t")]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct PolygonTradesResponse {
    results: Option<Vec<PolygonTradePayload>>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonTradePayload {
    price: f64,
    size: f64,
}

#[derive(Debug, Deserialize)]
struct PolygonLastQuoteResponse {
    results: Option<PolygonNbboPayload>,
}

#[derive(Debug, Deserialize)]
struct PolygonNbboPayload {
    #[serde(rename = "P")]
    ask_price: f64,
    #[serde(rename = "S")]
    ask_size: f64,
    #[serde(rename = "p")]
    bid_price: f64,
    #[serde(rename = "s")]
    bid_size: f64,
}

#[derive(Debug, Deserialize)]
struct PolygonSnapshotResponse {
    ticker: Option<PolygonSnapshotPayload>,
}

#[derive(Debug, Deserialize)]
struct PolygonSnapshotPayload {
    #[serde(rename = "lastQuote")]
    last_quote: Option<PolygonNbboPayload>,
    #[serde(rename = "lastTrade")]
    last_trade: Option<PolygonLastTradePayload>,
    min: Option<PolygonMinutePayload>,
    #[serde(rename = "prevDay")]
    prev_day: Option<PolygonPrevDayPayload>,
}

#[derive(Debug, Deserialize)]
struct PolygonLastTradePayload {
    #[serde(rename = "p")]
    price: f64,
    #[serde(rename = "s")]
    size: f64,
}

#[derive(Debug, Deserialize)]
struct PolygonMinutePayload {
    #[serde(rename = "av")]
    accumulated_volume: f64,
}

#[derive(Debug, Deserialize)]
struct PolygonPrevDayPayload {
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct PolygonDividendsResponse {
    results: Option<Vec<PolygonDividendPayload>>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonDividendPayload {
    cash_amount: f64,
    pay_date: Option<String>,
}

fn normalize_bar(payload: PolygonAggregatePayload) -> Result<Bar, SourceError> {
    Bar::new(
        payload.open,
        payload.high,
        payload.low,
        payload.close,
        payload.volume,
        payload.vwap,
        payload.timestamp,
    )
    .map_err(validation_to_error)
}

fn normalize_trade(payload: PolygonTradePayload) -> Result<Trade, SourceError> {
    let size = whole_shares("size", payload.size)?;
    Trade::new(payload.price, size).map_err(validation_to_error)
}

fn normalize_quote(payload: PolygonNbboPayload) -> Result<Quote, SourceError> {
    Quote::new(
        payload.bid_price,
        payload.ask_price,
        whole_shares("bid_size", payload.bid_size)?,
        whole_shares("ask_size", payload.ask_size)?,
    )
    .map_err(validation_to_error)
}

fn normalize_snapshot(payload: PolygonSnapshotPayload) -> Result<Snapshot, SourceError> {
    let last_quote = payload.last_quote.map(normalize_quote).transpose()?;
    let last_trade = payload
        .last_trade
        .map(|trade| {
            normalize_trade(PolygonTradePayload {
                price: trade.price,
                size: trade.size,
            })
        })
        .transpose()?;
    let min = payload
        .min
        .map(|min| {
            finite_non_negative("min.av", min.accumulated_volume).map(|accumulated_volume| {
                MinuteStats { accumulated_volume }
            })
        })
        .transpose()?;
    let prev_day = payload
        .prev_day
        .map(|prev| -> Result<PrevDayStats, SourceError> {
            let open = finite_non_negative("prevDay.o", prev.open)?;
            let close = finite_non_negative("prevDay.c", prev.close)?;
            Ok(PrevDayStats {
                volume: finite_non_negative("prevDay.v", prev.volume)?,
                change: close - open,
            })
        })
        .transpose()?;

    Ok(Snapshot {
        last_quote,
        last_trade,
        min,
        prev_day,
    })
}

fn normalize_dividend(payload: PolygonDividendPayload) -> Result<Dividend, SourceError> {
    let pay_date = payload
        .pay_date
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(TradeDate::parse)
        .transpose()
        .map_err(validation_to_error)?;
    Dividend::new(payload.cash_amount, pay_date).map_err(validation_to_error)
}

/// Polygon reports sizes as JSON numbers that may carry a fractional part
/// for odd lots; they are rounded to whole shares.
fn whole_shares(field: &'static str, value: f64) -> Result<u64, SourceError> {
    let shares = finite_non_negative(field, value)?.round();
    // 2^63 is the first float past i64::MAX.
    if shares >= i64::MAX as f64 {
        return Err(SourceError::malformed_response(format!(
            "polygon field '{field}' is out of range for a share count, got {value}"
        )));
    }
    Ok(shares as u64)
}

fn finite_non_negative(field: &'static str, value: f64) -> Result<f64, SourceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SourceError::malformed_response(format!(
            "polygon field '{field}' must be a finite non-negative number, got {value}"
        )));
    }
    Ok(value)
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::malformed_response(format!("polygon returned invalid data: {error}"))
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::http_client::HttpError;
    use crate::provider::SourceErrorKind;
    use crate::Timespan;

    #[derive(Debug)]
    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn responding(status: u16, body: &str) -> Self {
            Self {
                response: Ok(HttpResponse::new(status, body)),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: HttpError) -> Self {
            Self {
                response: Err(error),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn adapter(client: Arc<RecordingHttpClient>) -> PolygonAdapter {
        let config = PolygonConfig::new("test-key").with_base_url("https://polygon.test");
        PolygonAdapter::with_http_client(client, &config)
    }

    fn ticker(value: &str) -> Ticker {
        Ticker::parse(value).expect("valid ticker")
    }

    #[tokio::test]
    async fn aggregates_builds_range_url_and_parses_bars() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"status":"OK","results":[
                {"o":150.0,"h":151.0,"l":149.0,"c":150.5,"v":1000000,"vw":150.25,"t":1703123456789},
                {"o":150.5,"h":152.0,"l":150.1,"c":151.7,"v":800000,"t":1703123516789}
            ]}"#,
        ));
        let request = AggregatesRequest::new(
            ticker("AAPL"),
            1,
            Timespan::Minute,
            TradeDate::parse("2024-12-20").expect("valid"),
            TradeDate::parse("2024-12-27").expect("valid"),
        )
        .expect("valid request");

        let bars = adapter(client.clone())
            .aggregates(request)
            .await
            .expect("bars should decode");

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].vwap, Some(150.25));
        assert_eq!(bars[1].vwap, None);
        assert_eq!(bars[1].close, 151.7);

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].url,
            "https://polygon.test/v2/aggs/ticker/AAPL/range/1/minute/2024-12-20/2024-12-27?adjusted=true&sort=asc&limit=50000"
        );
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer test-key")
        );
    }

    #[tokio::test]
    async fn missing_results_on_list_endpoint_is_empty() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"status":"OK","resultsCount":0}"#,
        ));
        let trades = adapter(client)
            .trades(TradesRequest::new(
                ticker("AAPL"),
                TradeDate::parse("2024-12-27").expect("valid"),
            ))
            .await
            .expect("empty list is not an error");
        assert!(trades.is_empty());
    }

    #[tokio::test]
    async fn fractional_trade_sizes_round_to_whole_shares() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"results":[{"price":10.0,"size":0.6},{"price":10.5,"size":100}]}"#,
        ));
        let trades = adapter(client)
            .trades(TradesRequest::new(
                ticker("AAPL"),
                TradeDate::parse("2024-12-27").expect("valid"),
            ))
            .await
            .expect("trades should decode");
        assert_eq!(trades[0].size, 1);
        assert_eq!(trades[1].size, 100);
    }

    #[tokio::test]
    async fn last_quote_maps_case_sensitive_fields() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"status":"OK","results":{"P":190.12,"S":3,"p":190.10,"s":5,"t":1}}"#,
        ));
        let quote = adapter(client)
            .last_quote(ticker("AAPL"))
            .await
            .expect("quote should decode");
        assert_eq!(quote.ask_price, 190.12);
        assert_eq!(quote.ask_size, 3);
        assert_eq!(quote.bid_price, 190.10);
        assert_eq!(quote.bid_size, 5);
    }

    #[tokio::test]
    async fn last_quote_without_results_is_not_found() {
        let client = Arc::new(RecordingHttpClient::responding(200, r#"{"status":"OK"}"#));
        let err = adapter(client)
            .last_quote(ticker("ZZZZ"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn snapshot_derives_previous_day_change() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"status":"OK","ticker":{
                "lastTrade":{"p":191.0,"s":20},
                "min":{"av":123456},
                "prevDay":{"o":188.0,"c":190.5,"v":5000000}
            }}"#,
        ));
        let snapshot = adapter(client)
            .snapshot(ticker("AAPL"))
            .await
            .expect("snapshot should decode");

        assert!(snapshot.last_quote.is_none());
        assert_eq!(snapshot.last_trade.map(|t| t.price), Some(191.0));
        assert_eq!(snapshot.min.map(|m| m.accumulated_volume), Some(123_456.0));
        let prev = snapshot.prev_day.expect("prev day present");
        assert_eq!(prev.volume, 5_000_000.0);
        assert_eq!(prev.change, 2.5);
    }

    #[tokio::test]
    async fn snapshot_without_ticker_object_is_malformed() {
        let client = Arc::new(RecordingHttpClient::responding(200, r#"{"status":"OK"}"#));
        let err = adapter(client)
            .snapshot(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn dividends_encode_ticker_query_and_parse_dates() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"results":[
                {"cash_amount":0.25,"pay_date":"2024-11-14"},
                {"cash_amount":0.24}
            ],"next_url":"https://polygon.test/v3/reference/dividends?cursor=abc"}"#,
        ));
        let dividends = adapter(client.clone())
            .dividends(ticker("BRK.B"))
            .await
            .expect("dividends should decode");

        assert_eq!(dividends.len(), 2);
        assert_eq!(
            dividends[0].pay_date,
            Some(TradeDate::parse("2024-11-14").expect("valid"))
        );
        assert_eq!(dividends[1].pay_date, None);
        assert_eq!(
            client.recorded_requests()[0].url,
            "https://polygon.test/v3/reference/dividends?ticker=BRK.B"
        );
    }

    #[tokio::test]
    async fn negative_size_is_malformed() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"results":{"P":1.0,"S":-3,"p":0.9,"s":5}}"#,
        ));
        let err = adapter(client)
            .last_quote(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn size_beyond_share_range_is_malformed() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"results":{"P":1.0,"S":1e19,"p":0.9,"s":5}}"#,
        ));
        let err = adapter(client)
            .last_quote(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::MalformedResponse);
        assert!(err.message().contains("'ask_size'"));
    }

    #[tokio::test]
    async fn signed_pay_date_is_malformed() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"results":[{"cash_amount":0.25,"pay_date":"2024-+1-14"}]}"#,
        ));
        let err = adapter(client)
            .dividends(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let cases = [
            (401, SourceErrorKind::Unauthorized),
            (403, SourceErrorKind::Unauthorized),
            (404, SourceErrorKind::NotFound),
            (429, SourceErrorKind::RateLimited),
            (502, SourceErrorKind::Unavailable),
        ];

        for (status, expected) in cases {
            let client = Arc::new(RecordingHttpClient::responding(
                status,
                r#"{"status":"ERROR","error":"upstream said no"}"#,
            ));
            let err = adapter(client)
                .snapshot(ticker("AAPL"))
                .await
                .expect_err("must fail");
            assert_eq!(err.kind(), expected, "status {status}");
            assert_eq!(err.message(), "upstream said no");
        }
    }

    #[tokio::test]
    async fn error_status_in_ok_body_is_unavailable() {
        let client = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"status":"ERROR","error":"internal error"}"#,
        ));
        let err = adapter(client)
            .dividends(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Unavailable);
        assert!(err.retryable());
    }

    #[tokio::test]
    async fn retryable_transport_failure_is_unavailable() {
        let client = Arc::new(RecordingHttpClient::failing(HttpError::new(
            "connection failed",
        )));
        let err = adapter(client)
            .last_quote(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Unavailable);

        let client = Arc::new(RecordingHttpClient::failing(HttpError::non_retryable(
            "invalid request",
        )));
        let err = adapter(client)
            .last_quote(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Internal);
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let client = Arc::new(RecordingHttpClient::responding(200, "<html>oops</html>"));
        let err = adapter(client)
            .last_quote(ticker("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::MalformedResponse);
    }
}
