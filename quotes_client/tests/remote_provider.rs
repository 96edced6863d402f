//! `RemoteProvider` and `Connection` against an in-process server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quotes_client::connection::{Connection, Incoming};
use quotes_client::remote::RemoteProvider;
use quotes_common::{ClientId, Quote, QuoteError, QuoteProvider, Request, Response};
use quotes_server::gateway::ProtocolGateway;
use quotes_server::provider::LocalProvider;
use quotes_server::receiver::QuoteReceiver;
use quotes_server::session::StreamConfig;

fn start_server() -> SocketAddr {
    let provider = LocalProvider::from_quotes(vec![
        Quote::new(1, "A man's got to believe in something"),
        Quote::new(2, "It ain't over till it's over"),
        Quote::new(3, "I never said most of the things I said"),
    ])
    .unwrap();
    let gateway = Arc::new(ProtocolGateway::new(
        Arc::new(provider),
        StreamConfig {
            interval: Duration::from_millis(10),
            ack_timeout: Duration::from_secs(2),
        },
        Duration::from_secs(30),
    ));
    let receiver = QuoteReceiver::new("127.0.0.1:0", Duration::from_secs(2)).unwrap();
    let addr = receiver.local_addr().unwrap();
    thread::spawn(move || receiver.serve(gateway));
    addr
}

#[test]
fn retrieval_matches_the_server_corpus() {
    let provider = RemoteProvider::connect(&start_server().to_string()).unwrap();

    assert_eq!(provider.number_of_quotes().unwrap(), 3);
    assert_eq!(provider.all_quotes().unwrap().len(), 3);
    assert_eq!(
        provider.quotes(&[3, 1]).unwrap(),
        vec![
            Quote::new(3, "I never said most of the things I said"),
            Quote::new(1, "A man's got to believe in something"),
        ]
    );
    assert_eq!(
        provider
            .search("SAID")
            .unwrap()
            .iter()
            .map(|q| q.id)
            .collect::<Vec<_>>(),
        vec![3]
    );
    assert_eq!(
        provider
            .search_all(&["said".to_string(), "over".to_string()])
            .unwrap()
            .iter()
            .map(|q| q.id)
            .collect::<Vec<_>>(),
        vec![3, 2]
    );
    assert!((1..=3).contains(&provider.random_quote().unwrap().id));
}

#[test]
fn server_errors_become_quote_errors() {
    let provider = RemoteProvider::connect(&start_server().to_string()).unwrap();
    assert!(matches!(
        provider.quotes(&[1, 42]),
        Err(QuoteError::QuoteNotFound(42))
    ));
    // The connection is still usable afterwards.
    assert_eq!(provider.number_of_quotes().unwrap(), 3);
}

#[test]
fn connect_to_a_closed_port_fails() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    assert!(RemoteProvider::connect(&addr.to_string()).is_err());
}

#[test]
fn stream_then_cancel_over_connections() {
    let addr = start_server().to_string();
    let client_id = ClientId::new("yogi");
    let mut control = Connection::open(&addr).unwrap();
    assert!(matches!(
        control
            .call(&Request::Connect {
                client_id: client_id.clone()
            })
            .unwrap(),
        Response::Connected { .. }
    ));
    let Response::Subscribed { subscription_id } =
        control.call(&Request::Subscribe { client_id }).unwrap()
    else {
        panic!("expected subscribed");
    };

    let mut stream = Connection::open(&addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(50)))
        .unwrap();
    stream
        .send(&Request::GetQuoteSubscribed { subscription_id })
        .unwrap();

    let mut quotes = 0;
    let mut polls = 0;
    while quotes < 3 && polls < 200 {
        polls += 1;
        match stream.receive().unwrap() {
            Incoming::Message(Response::StreamStarted { .. }) | Incoming::Idle => {}
            Incoming::Message(Response::Quote { .. }) => quotes += 1,
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(quotes, 3);

    assert_eq!(
        control.call(&Request::Cancel { subscription_id }).unwrap(),
        Response::CancelConfirmed { subscription_id }
    );

    let mut polls = 0;
    loop {
        polls += 1;
        assert!(polls < 200, "stream never ended");
        match stream.receive().unwrap() {
            Incoming::Message(Response::StreamEnded { .. }) | Incoming::Closed => break,
            Incoming::Message(Response::Quote { .. }) | Incoming::Idle => {}
            other => panic!("unexpected {other:?}"),
        }
    }
}
