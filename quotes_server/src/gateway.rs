//! Protocol gateway: maps logical operations onto the store, registry and sessions.
//!
//! Retrieval calls pass straight through to the `QuoteProvider`. Subscription calls go
//! to the `SubscriptionRegistry`, and a confirmed cancel additionally signals the bound
//! session. Disconnects, explicit or detected by the liveness monitor, are turned into
//! cancels so no ACTIVE subscription outlives its client.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use quotes_common::command::SearchQuery;
use quotes_common::{
    CancelOutcome, ClientId, CorrelationToken, Quote, QuoteId, QuoteProvider, Request, Response,
    Result, SubscriptionId,
};

use crate::model::liveness::ClientMonitor;
use crate::model::registry::SubscriptionRegistry;
use crate::session::{QuoteStream, StreamConfig, StreamingEngine};

/// Outcome of dispatching one request.
pub enum Reply {
    /// A single response line.
    Single(Response),
    /// A stream of quotes for the connection to pump.
    Stream(QuoteStream),
}

/// Entry point for every client operation.
pub struct ProtocolGateway {
    provider: Arc<dyn QuoteProvider>,
    registry: Arc<SubscriptionRegistry>,
    engine: Arc<StreamingEngine>,
    monitor: Mutex<ClientMonitor>,
}

impl ProtocolGateway {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        stream_config: StreamConfig,
        client_timeout: Duration,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let engine = StreamingEngine::new(
            Arc::clone(&provider),
            Arc::clone(&registry),
            stream_config,
        );
        Self {
            provider,
            registry,
            engine,
            monitor: Mutex::new(ClientMonitor::new(client_timeout)),
        }
    }

    /// Register `client_id` and hand out a correlation token.
    pub fn connect(&self, client_id: ClientId) -> CorrelationToken {
        let token = CorrelationToken::new(format!("{:016x}", rand::random::<u64>()));
        self.monitor.lock().touch(&client_id);
        info!("Client {} connected", client_id);
        token
    }

    pub fn subscribe(&self, client_id: ClientId) -> SubscriptionId {
        self.monitor.lock().touch(&client_id);
        let subscription = self.registry.create(client_id);
        info!(
            "Client {} subscribed as {}",
            subscription.client_id, subscription.id
        );
        subscription.id
    }

    /// Start the quote stream of an ACTIVE subscription.
    pub fn get_quote_subscribed(&self, id: SubscriptionId) -> Result<QuoteStream> {
        self.engine.begin_stream(id)
    }

    pub fn get_quote_unsubscribed(&self) -> Result<Quote> {
        self.provider.random_quote()
    }

    /// Cancel `id`; a confirmed cancel also tells its session to stop.
    ///
    /// Returns as soon as the registry transition is committed.
    pub fn cancel(&self, id: SubscriptionId) -> CancelOutcome {
        let outcome = self.registry.request_cancel(id);
        if outcome.is_confirmed() {
            self.engine.signal_stop(id);
        }
        info!("Cancel {}: {}", id, outcome);
        outcome
    }

    pub fn get_all_quotes(&self) -> Result<Vec<Quote>> {
        self.provider.all_quotes()
    }

    pub fn get_number_of_quotes(&self) -> Result<usize> {
        self.provider.number_of_quotes()
    }

    pub fn get_quotes(&self, ids: &[QuoteId]) -> Result<Vec<Quote>> {
        self.provider.quotes(ids)
    }

    pub fn search(&self, query: &str) -> Result<Vec<Quote>> {
        self.provider.search(query)
    }

    pub fn search_all(&self, queries: &[String]) -> Result<Vec<Quote>> {
        self.provider.search_all(queries)
    }

    /// Keep-alive from `client_id`.
    pub fn ping(&self, client_id: &ClientId) {
        let mut monitor = self.monitor.lock();
        if !monitor.is_client_active(client_id) {
            debug!("Ping from untracked client {}, tracking it again", client_id);
        }
        monitor.touch(client_id);
    }

    /// Treat `client_id` as gone: cancel every ACTIVE subscription it holds.
    ///
    /// Returns the number of confirmed cancels.
    pub fn disconnect(&self, client_id: &ClientId) -> usize {
        self.monitor.lock().forget(client_id);
        let cancelled = self
            .registry
            .active_for_client(client_id)
            .into_iter()
            .filter(|&id| self.cancel(id).is_confirmed())
            .count();
        info!(
            "Client {} disconnected, {} subscription(s) cancelled",
            client_id, cancelled
        );
        cancelled
    }

    /// Disconnect every client whose keep-alive timed out.
    ///
    /// Taking stream emissions counts as a sign of life, so a client with a running
    /// session is kept even without pings. Returns the clients that were disconnected.
    pub fn reap_idle_clients(&self) -> Vec<ClientId> {
        let timed_out = self.monitor.lock().check_timeouts();
        let mut reaped = Vec::new();
        for client_id in timed_out {
            if self.engine.is_streaming_to(&client_id) {
                debug!("Client {} is silent but still streaming", client_id);
                self.monitor.lock().touch(&client_id);
                continue;
            }
            warn!("Client {} timed out, reclaiming its subscriptions", client_id);
            self.disconnect(&client_id);
            reaped.push(client_id);
        }
        reaped
    }

    /// Forget cancelled subscriptions; see `SubscriptionRegistry::purge_cancelled`.
    pub fn purge_cancelled(&self) -> usize {
        self.registry.purge_cancelled()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &StreamingEngine {
        &self.engine
    }

    /// Dispatch a decoded wire request.
    ///
    /// Failures are rendered as `Response::Error`; they never affect other clients.
    pub fn handle(&self, request: Request) -> Reply {
        let operation = request.operation();
        debug!("Dispatching {}", operation);

        let result = match request {
            Request::Connect { client_id } => Ok(Reply::Single(Response::Connected {
                token: self.connect(client_id),
            })),
            Request::Subscribe { client_id } => Ok(Reply::Single(Response::Subscribed {
                subscription_id: self.subscribe(client_id),
            })),
            Request::Cancel { subscription_id } => Ok(Reply::Single(Response::cancel(
                subscription_id,
                self.cancel(subscription_id),
            ))),
            Request::GetAllQuotes => self
                .get_all_quotes()
                .map(|quotes| Reply::Single(Response::Quotes { quotes })),
            Request::GetNumberOfQuotes => self
                .get_number_of_quotes()
                .map(|count| Reply::Single(Response::NumberOfQuotes { count })),
            Request::GetQuotes { ids } => self
                .get_quotes(&ids)
                .map(|quotes| Reply::Single(Response::Quotes { quotes })),
            Request::GetQuoteSubscribed { subscription_id } => self
                .get_quote_subscribed(subscription_id)
                .map(Reply::Stream),
            Request::GetQuoteUnsubscribed => self
                .get_quote_unsubscribed()
                .map(|quote| Reply::Single(Response::Quote { quote })),
            Request::Search {
                query: SearchQuery::One(query),
            } => self
                .search(&query)
                .map(|quotes| Reply::Single(Response::Quotes { quotes })),
            Request::Search {
                query: SearchQuery::Many(queries),
            } => self
                .search_all(&queries)
                .map(|quotes| Reply::Single(Response::Quotes { quotes })),
            Request::Ping { client_id } => {
                self.ping(&client_id);
                Ok(Reply::Single(Response::Pong))
            }
        };

        result.unwrap_or_else(|e| {
            debug!("{} failed: {}", operation, e);
            Reply::Single(Response::error(&e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LocalProvider;
    use quotes_common::SubscriptionState;
    use quotes_common::command::WireError;
    use std::thread;
    use std::time::Instant;

    fn gateway(client_timeout: Duration) -> ProtocolGateway {
        let provider = LocalProvider::from_quotes(vec![
            Quote::new(1, "A man's got to believe in something"),
            Quote::new(2, "It ain't over till it's over"),
            Quote::new(3, "I never said most of the things I said"),
        ])
        .unwrap();
        ProtocolGateway::new(
            Arc::new(provider),
            StreamConfig {
                interval: Duration::from_millis(5),
                ack_timeout: Duration::from_secs(2),
            },
            client_timeout,
        )
    }

    fn single(reply: Reply) -> Response {
        match reply {
            Reply::Single(response) => response,
            Reply::Stream(stream) => panic!("unexpected stream for {}", stream.subscription_id()),
        }
    }

    #[test]
    fn connect_hands_out_distinct_tokens() {
        let gateway = gateway(Duration::from_secs(5));
        let a = gateway.connect("c1".into());
        let b = gateway.connect("c1".into());
        assert_eq!(a.as_str().len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn confirmed_cancel_stops_the_stream() {
        let gateway = gateway(Duration::from_secs(5));
        let id = gateway.subscribe("c1".into());
        let stream = gateway.get_quote_subscribed(id).unwrap();
        stream.recv_timeout(Duration::from_secs(2)).unwrap();

        assert_eq!(gateway.cancel(id), CancelOutcome::Confirmed);
        assert!(stream.count() <= 1);
        assert_eq!(gateway.cancel(id), CancelOutcome::Unconfirmed);
    }

    #[test]
    fn disconnect_cancels_only_that_clients_subscriptions() {
        let gateway = gateway(Duration::from_secs(5));
        let a1 = gateway.subscribe("alice".into());
        let a2 = gateway.subscribe("alice".into());
        let b = gateway.subscribe("bob".into());

        assert_eq!(gateway.disconnect(&"alice".into()), 2);
        assert_eq!(gateway.registry().state(a1), Some(SubscriptionState::Cancelled));
        assert_eq!(gateway.registry().state(a2), Some(SubscriptionState::Cancelled));
        assert!(gateway.registry().is_active(b));
        assert_eq!(gateway.disconnect(&"alice".into()), 0);
    }

    #[test]
    fn idle_clients_are_reaped() {
        let gateway = gateway(Duration::from_millis(20));
        gateway.connect("quiet".into());
        let id = gateway.subscribe("quiet".into());
        thread::sleep(Duration::from_millis(40));

        assert_eq!(gateway.reap_idle_clients(), vec![ClientId::new("quiet")]);
        assert!(!gateway.registry().is_active(id));
        assert_eq!(gateway.purge_cancelled(), 1);
    }

    #[test]
    fn pinging_client_is_kept() {
        let gateway = gateway(Duration::from_millis(200));
        gateway.connect("busy".into());
        let id = gateway.subscribe("busy".into());
        let deadline = Instant::now() + Duration::from_millis(400);
        while Instant::now() < deadline {
            gateway.ping(&"busy".into());
            assert!(gateway.reap_idle_clients().is_empty());
            thread::sleep(Duration::from_millis(20));
        }
        assert!(gateway.registry().is_active(id));
    }

    #[test]
    fn streaming_client_is_kept_without_pings() {
        let gateway = gateway(Duration::from_millis(100));
        gateway.connect("c1".into());
        let id = gateway.subscribe("c1".into());
        let stream = gateway.get_quote_subscribed(id).unwrap();

        let deadline = Instant::now() + Duration::from_millis(300);
        let mut taken = 0;
        while Instant::now() < deadline {
            stream.recv_timeout(Duration::from_secs(2)).unwrap();
            taken += 1;
        }
        assert!(taken > 0);
        assert!(gateway.reap_idle_clients().is_empty());
        assert!(gateway.registry().is_active(id));

        // Once the stream is gone the client has to ping again.
        assert_eq!(gateway.cancel(id), CancelOutcome::Confirmed);
        assert!(stream.count() <= 1);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(gateway.reap_idle_clients(), vec![ClientId::new("c1")]);
    }

    #[test]
    fn handle_renders_errors_as_replies() {
        let gateway = gateway(Duration::from_secs(5));
        let response = single(gateway.handle(Request::GetQuotes { ids: vec![2, 9] }));
        assert_eq!(
            response,
            Response::Error {
                error: WireError::QuoteNotFound { id: 9 }
            }
        );

        let response = single(gateway.handle(Request::GetQuoteSubscribed {
            subscription_id: SubscriptionId::new(42),
        }));
        assert!(matches!(
            response,
            Response::Error {
                error: WireError::InvalidSubscription { .. }
            }
        ));
    }

    #[test]
    fn handle_dispatches_search_variants() {
        let gateway = gateway(Duration::from_secs(5));
        let one = single(gateway.handle(Request::Search {
            query: SearchQuery::One("OVER".into()),
        }));
        let Response::Quotes { quotes } = one else {
            panic!("expected quotes, got {one:?}");
        };
        assert_eq!(quotes, vec![Quote::new(2, "It ain't over till it's over")]);

        let many = single(gateway.handle(Request::Search {
            query: SearchQuery::Many(vec!["said".into(), "man".into(), "said".into()]),
        }));
        let Response::Quotes { quotes } = many else {
            panic!("expected quotes, got {many:?}");
        };
        let ids: Vec<QuoteId> = quotes.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn handle_returns_a_stream_for_subscribed_quotes() {
        let gateway = gateway(Duration::from_secs(5));
        let subscription_id = gateway.subscribe("c1".into());
        match gateway.handle(Request::GetQuoteSubscribed { subscription_id }) {
            Reply::Stream(stream) => {
                assert_eq!(stream.subscription_id(), subscription_id);
                assert!(stream.recv_timeout(Duration::from_secs(2)).is_ok());
            }
            Reply::Single(response) => panic!("expected a stream, got {response:?}"),
        }
    }
}
