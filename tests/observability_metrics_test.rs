use brokerlink::observability::observability;
use brokerlink::testing::MockBroker;
use brokerlink::{Broker, MetadataRequest, ProduceRequest, RequiredAcks};

// Counters are process-wide; this is the only test in this binary so the
// deltas below are exact.
#[tokio::test]
async fn request_counters_and_prometheus_rendering() {
    let obs = observability();
    let requests_before = obs.requests_total();
    let errors_before = obs.request_errors_total();
    let no_response_before = obs.no_response_requests_total();

    let mb = MockBroker::bind().await.unwrap();
    mb.returns(vec![0u8; 8]);
    mb.returns(Vec::<u8>::new());
    mb.returns(vec![0u8; 2]);

    let broker = Broker::new(mb.addr());
    broker.open(1).await.unwrap();
    broker
        .get_metadata("c", &MetadataRequest::default())
        .await
        .unwrap();
    broker
        .produce("c", &ProduceRequest::new(RequiredAcks::NoResponse, 0))
        .await
        .unwrap();
    broker
        .get_metadata("c", &MetadataRequest::default())
        .await
        .unwrap_err();
    broker.close().await.unwrap();

    assert_eq!(obs.requests_total() - requests_before, 3);
    assert_eq!(obs.request_errors_total() - errors_before, 1);
    assert_eq!(obs.no_response_requests_total() - no_response_before, 1);

    let body = obs.render_prometheus();
    assert!(body.contains("brokerlink_requests_total 3"));
    assert!(body.contains("brokerlink_bytes_sent_total"));
    assert!(body.contains("brokerlink_connections_opened_total 1"));
    assert!(body.contains("brokerlink_connections_closed_total 1"));
    assert!(body.contains("brokerlink_request_latency_p99_us"));
}
