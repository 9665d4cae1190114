use exchange_desk::application::pricing::PriceAggregator;
use exchange_desk::application::registry::Resolution;
use exchange_desk::application::workflow::Workflow;
use exchange_desk::config::Config;
use exchange_desk::domain::event::UserInput;
use exchange_desk::domain::order::Decision;
use exchange_desk::domain::reply::Reply;
use exchange_desk::infrastructure::in_memory::{InMemoryOrderSink, RecordingTransport};
use std::sync::Arc;
use std::time::Duration;

const WALLET: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decisions_notify_once() {
    let config = Config::default();
    let prices = PriceAggregator::new(
        vec![],
        config.fallback_prices(),
        Duration::from_secs(1),
        Duration::from_secs(30),
    );
    let transport = RecordingTransport::new();
    let sink = InMemoryOrderSink::new();
    let workflow = Arc::new(Workflow::new(
        config.desk_settings(),
        Arc::new(prices),
        Box::new(transport.clone()),
        Box::new(sink.clone()),
    ));

    for input in ["English", "Buy", "ETH", "1", WALLET] {
        workflow
            .handle_message(5, None, UserInput::Text(input.to_string()))
            .await;
    }
    workflow
        .handle_message(5, None, UserInput::Image(Vec::new()))
        .await;
    assert_eq!(workflow.registry().len().await, 1);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let workflow = Arc::clone(&workflow);
            let decision = if i % 2 == 0 {
                Decision::Approve
            } else {
                Decision::Reject
            };
            tokio::spawn(async move { workflow.handle_decision(1, decision).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if let Resolution::Resolved(_) = handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let notices = transport
        .replies_for(5)
        .await
        .into_iter()
        .filter(|r| matches!(r, Reply::Approved { .. } | Reply::Rejected))
        .count();
    assert_eq!(notices, 1);
    assert_eq!(transport.closed().await.len(), 1);
    // one pending record plus one resolution
    assert_eq!(sink.records().await.len(), 2);
}
