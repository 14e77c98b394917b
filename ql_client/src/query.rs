use std::collections::HashMap;
use std::sync::Arc;

use ql_ledger::Admission;
use ql_ledger::QueryWeight;
use ql_ledger::RateLimitRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::descriptor::RequestDescriptor;
use crate::errors;
use crate::errors::ClientError;
use crate::errors::Result;
use crate::headers::HeaderLimitMaps;
use crate::transport::Transport;
use crate::transport::TransportReply;

type ParseFn<T> = Box<dyn FnOnce(&[u8], Option<&Value>) -> serde_json::Result<T> + Send>;

/// A single-shot outbound call: request descriptor, declared quota costs,
/// the family's header-to-limit map, and a parse delegate
///
/// `execute` consumes the query, so re-executing a completed or faulted
/// instance is rejected by ownership; retrying means building a fresh
/// query from the same descriptor.
pub struct DeferredQuery<T> {
    descriptor: RequestDescriptor,
    weights: Vec<QueryWeight>,
    header_map: Option<Arc<HashMap<String, i64>>>,
    context: Option<Value>,
    parse: ParseFn<T>,
}

impl<T> DeferredQuery<T> {
    pub fn builder(descriptor: RequestDescriptor) -> DeferredQueryBuilder<T> {
        DeferredQueryBuilder::new(descriptor)
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn weights(&self) -> &[QueryWeight] {
        &self.weights
    }

    /// Run the full admission pipeline for this query
    ///
    /// Admission and the optimistic reservation happen synchronously
    /// before the transport await, so every concurrently dispatching query
    /// observes the reserved usage. A cancellation seen after dispatch
    /// does not retract the reservation; the drift is corrected by the
    /// next reconciling response or window rollover.
    pub async fn execute(self, transport: &dyn Transport, registry: &RateLimitRegistry, cancel: &CancelToken) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let t0 = registry.timestamp();
        if let Admission::Refused(refusal) = registry.reserve(&self.weights, t0) {
            return Err(ClientError::RateLimitPrevention(refusal));
        }

        let reply = transport.send(&self.descriptor, cancel).await?;

        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        self.reconcile(registry, &reply, t0);

        if !reply.success {
            return Err(errors::classify_error_body(&reply.body));
        }

        let context = self.context;
        match (self.parse)(&reply.body, context.as_ref()) {
            Ok(value) => Ok(value),
            Err(err) => Err(ClientError::UnknownResponseFormat(err.to_string())),
        }
    }

    /// Overwrite ledger usage from the response's usage headers
    ///
    /// Overwrites, never accumulates; `update_usage` discards writes older
    /// than the entry's last recorded change, so a slow response cannot
    /// regress an entry already advanced by a newer one.
    fn reconcile(&self, registry: &RateLimitRegistry, reply: &TransportReply, t0: u64) {
        let Some(map) = &self.header_map else {
            if reply.success {
                tracing::warn!(family = %self.descriptor.family, "No header map registered for endpoint family");
            }
            return;
        };

        let mut matched = 0usize;
        for (name, value) in &reply.headers {
            let Some(&id) = map.get(&name.to_ascii_lowercase()) else {
                continue;
            };
            matched += 1;

            match value.trim().parse::<u32>() {
                Ok(absolute) => {
                    if registry.update_usage(id, absolute, t0) {
                        tracing::debug!(limit = id, usage = absolute, "Reconciled usage from response header");
                    } else {
                        tracing::debug!(limit = id, "Discarded out-of-order usage reconciliation");
                    }
                }
                Err(_) => {
                    tracing::debug!(header = %name, value = %value, "Unparseable usage header value");
                }
            }
        }

        if matched == 0 && reply.success {
            tracing::warn!(family = %self.descriptor.family, "Response carried no usage headers; header map may be stale");
        }
    }
}

/// Builder binding a request descriptor to its weights and delegates
pub struct DeferredQueryBuilder<T> {
    descriptor: RequestDescriptor,
    weights: Vec<QueryWeight>,
    header_map: Option<Arc<HashMap<String, i64>>>,
    context: Option<Value>,
    parse: Option<ParseFn<T>>,
}

impl<T> DeferredQueryBuilder<T> {
    pub fn new(descriptor: RequestDescriptor) -> Self {
        Self { descriptor, weights: Vec::new(), header_map: None, context: None, parse: None }
    }

    /// Declare a cost against one dimension
    pub fn weight(mut self, dimension: i64, amount: u32) -> Self {
        self.weights.push(QueryWeight::new(dimension, amount));
        self
    }

    /// Resolve the header-to-limit map for this query's endpoint family
    pub fn limits_from(mut self, maps: &HeaderLimitMaps) -> Self {
        self.header_map = maps.get(&self.descriptor.family);
        self
    }

    /// Opaque value handed to the parse delegate alongside the body
    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Install a custom parse delegate
    pub fn parse_with(mut self, parse: impl FnOnce(&[u8], Option<&Value>) -> serde_json::Result<T> + Send + 'static) -> Self {
        self.parse = Some(Box::new(parse));
        self
    }

    /// Build the query
    ///
    /// # Panics
    /// Panics if no parse delegate is set
    pub fn build(self) -> DeferredQuery<T> {
        let parse = self.parse.expect("Parse delegate must be set");
        DeferredQuery { descriptor: self.descriptor, weights: self.weights, header_map: self.header_map, context: self.context, parse }
    }
}

impl<T: DeserializeOwned> DeferredQueryBuilder<T> {
    /// Parse the body as JSON straight into the target type
    pub fn parse_json(self) -> Self {
        self.parse_with(|body, _| serde_json::from_slice(body))
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use ql_ledger::IntervalUnit;
    use ql_ledger::LimitDescriptor;
    use ql_ledger::LimitKind;
    use ql_ledger::ResetInterval;
    use ql_ledger::dimension_id;
    use ql_ledger::limit_id;
    use serde::Deserialize;

    use super::*;
    use crate::handshake;
    use crate::transport::TransportError;

    #[derive(Debug, Deserialize, PartialEq)]
    struct ServerTime {
        #[serde(rename = "serverTime")]
        server_time: u64,
    }

    /// Transport double returning a canned reply and counting calls
    struct MockTransport {
        reply: std::sync::Mutex<Option<TransportReply>>,
        calls: AtomicUsize,
        cancel_after_send: Option<CancelToken>,
    }

    impl MockTransport {
        fn replying(reply: TransportReply) -> Self {
            Self { reply: std::sync::Mutex::new(Some(reply)), calls: AtomicUsize::new(0), cancel_after_send: None }
        }

        fn ok(body: &[u8], headers: Vec<(String, String)>) -> Self {
            Self::replying(TransportReply { success: true, body: body.to_vec(), headers })
        }

        fn failing(body: &[u8]) -> Self {
            Self::replying(TransportReply { success: false, body: body.to_vec(), headers: Vec::new() })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl Transport for MockTransport {
        fn send<'a>(
            &'a self,
            _request: &'a RequestDescriptor,
            _cancel: &'a CancelToken,
        ) -> Pin<Box<dyn Future<Output = std::result::Result<TransportReply, TransportError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::Relaxed);
                if let Some(token) = &self.cancel_after_send {
                    token.cancel();
                }
                Ok(self.reply.lock().unwrap().take().expect("mock reply already consumed"))
            })
        }
    }

    fn setup() -> (RateLimitRegistry, HeaderLimitMaps, i64, i64) {
        let registry = RateLimitRegistry::new();
        let maps = HeaderLimitMaps::new();
        let minute = ResetInterval::new(IntervalUnit::Minute, 1);
        handshake::register_limits(
            &registry,
            &maps,
            "/api",
            &[LimitDescriptor::new(LimitKind::RequestWeight, minute, 1200)],
        );

        let dimension = dimension_id("/api", LimitKind::RequestWeight);
        let id = limit_id(dimension, minute);
        (registry, maps, dimension, id)
    }

    fn time_query(maps: &HeaderLimitMaps, dimension: i64, amount: u32) -> DeferredQuery<ServerTime> {
        let descriptor = RequestDescriptor::get("https://api.binance.com", "/api", "/api/v3/time");
        DeferredQuery::builder(descriptor).weight(dimension, amount).limits_from(maps).parse_json().build()
    }

    #[tokio::test]
    async fn test_admitted_query_parses_result() {
        let (registry, maps, dimension, id) = setup();
        let transport =
            MockTransport::ok(br#"{"serverTime": 1700000000000}"#, vec![("x-mbx-used-weight-1m".to_string(), "1".to_string())]);

        let query = time_query(&maps, dimension, 1);
        let result = query.execute(&transport, &registry, &CancelToken::new()).await.unwrap();

        assert_eq!(result, ServerTime { server_time: 1_700_000_000_000 });
        assert_eq!(registry.entry(id).unwrap().usage, 1);
    }

    #[tokio::test]
    async fn test_refused_query_never_reaches_transport() {
        let (registry, maps, dimension, id) = setup();
        let transport = MockTransport::ok(b"{}", Vec::new());

        // Fill the window, then attempt one more
        registry.increment_usage(&[QueryWeight::new(dimension, 1200)], registry.timestamp());

        let query = time_query(&maps, dimension, 20);
        let result = query.execute(&transport, &registry, &CancelToken::new()).await;

        match result {
            Err(ClientError::RateLimitPrevention(refusal)) => {
                assert_eq!(refusal.limit_id, id);
                assert_eq!(refusal.usage, 1200);
                assert_eq!(refusal.attempted, 20);
            }
            other => panic!("expected prevention, got {other:?}"),
        }
        assert_eq!(transport.calls(), 0);
        assert_eq!(registry.entry(id).unwrap().usage, 1200);
    }

    // A usage header reporting less than the optimistic estimate must
    // overwrite the estimate, not add to it or take the max.
    #[tokio::test]
    async fn test_reconciliation_overwrites_estimate() {
        let (registry, maps, dimension, id) = setup();

        registry.increment_usage(&[QueryWeight::new(dimension, 960)], registry.timestamp());

        let transport = MockTransport::ok(
            br#"{"serverTime": 1700000000000}"#,
            vec![("X-MBX-USED-WEIGHT-1M".to_string(), "950".to_string())],
        );

        // 960 + 20 optimistic = 980; header says 950
        let query = time_query(&maps, dimension, 20);
        query.execute(&transport, &registry, &CancelToken::new()).await.unwrap();

        assert_eq!(registry.entry(id).unwrap().usage, 950);
    }

    // A response whose dispatch timestamp is older than an already-applied
    // reconciliation must not regress the entry.
    #[tokio::test]
    async fn test_out_of_order_reconciliation_discarded() {
        let (registry, maps, dimension, id) = setup();

        let stale_t0 = registry.timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        registry.update_usage(id, 700, registry.timestamp());

        // Simulate the slow response's reconciliation arriving afterwards
        assert!(!registry.update_usage(id, 100, stale_t0));
        assert_eq!(registry.entry(id).unwrap().usage, 700);

        // And the pipeline path with a fresh query still reconciles forward
        let transport = MockTransport::ok(
            br#"{"serverTime": 1700000000000}"#,
            vec![("x-mbx-used-weight-1m".to_string(), "705".to_string())],
        );
        time_query(&maps, dimension, 1).execute(&transport, &registry, &CancelToken::new()).await.unwrap();
        assert_eq!(registry.entry(id).unwrap().usage, 705);
    }

    #[tokio::test]
    async fn test_remote_violation_mapped() {
        let (registry, maps, dimension, _) = setup();
        let transport = MockTransport::failing(br#"{"code":-1003,"msg":"Too many requests."}"#);

        let result = time_query(&maps, dimension, 1).execute(&transport, &registry, &CancelToken::new()).await;

        assert!(matches!(result, Err(ClientError::RateLimitViolated { code: -1003, .. })));
    }

    #[tokio::test]
    async fn test_unknown_remote_code_preserved() {
        let (registry, maps, dimension, _) = setup();
        let transport = MockTransport::failing(br#"{"code":-32700,"msg":"weird"}"#);

        let result = time_query(&maps, dimension, 1).execute(&transport, &registry, &CancelToken::new()).await;

        match result {
            Err(ClientError::Other { code, message }) => {
                assert_eq!(code, -32700);
                assert_eq!(message, "weird");
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbled_success_body_is_format_error() {
        let (registry, maps, dimension, _) = setup();
        let transport = MockTransport::ok(b"not json at all", Vec::new());

        let result = time_query(&maps, dimension, 1).execute(&transport, &registry, &CancelToken::new()).await;

        assert!(matches!(result, Err(ClientError::UnknownResponseFormat(_))));
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch_reserves_nothing() {
        let (registry, maps, dimension, id) = setup();
        let transport = MockTransport::ok(b"{}", Vec::new());

        let cancel = CancelToken::new();
        cancel.cancel();

        let result = time_query(&maps, dimension, 20).execute(&transport, &registry, &cancel).await;

        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert_eq!(transport.calls(), 0);
        assert_eq!(registry.entry(id).unwrap().usage, 0);
    }

    #[tokio::test]
    async fn test_cancel_after_dispatch_keeps_reservation() {
        let (registry, maps, dimension, id) = setup();

        let cancel = CancelToken::new();
        let mut transport = MockTransport::ok(br#"{"serverTime": 1}"#, Vec::new());
        transport.cancel_after_send = Some(cancel.clone());

        let result = time_query(&maps, dimension, 20).execute(&transport, &registry, &cancel).await;

        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert_eq!(transport.calls(), 1);
        // Quota stays spent on the cancelled call until reconciliation or rollover
        assert_eq!(registry.entry(id).unwrap().usage, 20);
    }

    #[tokio::test]
    async fn test_success_without_usage_headers_is_non_fatal() {
        let (registry, maps, dimension, _) = setup();
        let transport = MockTransport::ok(br#"{"serverTime": 1}"#, vec![("content-type".to_string(), "application/json".to_string())]);

        let result = time_query(&maps, dimension, 1).execute(&transport, &registry, &CancelToken::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_parse_context_passed_through() {
        let (registry, maps, dimension, _) = setup();
        let transport = MockTransport::ok(br#"{"serverTime": 7}"#, Vec::new());

        let descriptor = RequestDescriptor::get("https://api.binance.com", "/api", "/api/v3/time");
        let query: DeferredQuery<String> = DeferredQuery::builder(descriptor)
            .weight(dimension, 1)
            .limits_from(&maps)
            .context(Value::String("BTCUSDT".to_string()))
            .parse_with(|body, context| {
                let time: ServerTime = serde_json::from_slice(body)?;
                let symbol = context.and_then(Value::as_str).unwrap_or("?");
                Ok(format!("{}@{}", symbol, time.server_time))
            })
            .build();

        let result = query.execute(&transport, &registry, &CancelToken::new()).await.unwrap();
        assert_eq!(result, "BTCUSDT@7");
    }
}
