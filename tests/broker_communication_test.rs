//! End-to-end round trips against the mock broker: one request of every kind,
//! with the mock answering from a queue of pre-encoded bodies.

use brokerlink::protocol::{
    BrokerMetadata, KafkaCode, MetadataResponse, PartitionMetadata, TopicMetadata, EARLIEST_TIME,
};
use brokerlink::testing::MockBroker;
use brokerlink::{
    Broker, FetchRequest, Message, MetadataRequest, OffsetCommitRequest, OffsetFetchRequest,
    OffsetRequest, ProduceRequest, RequiredAcks,
};

#[test]
fn broker_accessors() {
    let broker = Broker::new("abc:123");
    assert_eq!(broker.id(), -1, "new broker must not have an id");
    assert_eq!(broker.addr(), "abc:123");

    broker.set_id(34);
    assert_eq!(broker.id(), 34, "manually setting broker id did not take effect");
}

#[tokio::test]
async fn simple_broker_communication() {
    let mb = MockBroker::bind().await.unwrap();
    let broker = Broker::new(mb.addr());
    broker.open(4).await.unwrap();

    mb.returns(vec![0u8; 8]); // metadata: no brokers, no topics
    mb.returns(Vec::<u8>::new()); // produce with NoResponse: nothing sent back
    mb.returns(vec![0u8; 4]); // produce: no topics
    mb.returns(vec![0u8; 4]); // fetch: no topics
    mb.returns(vec![0u8; 6]); // offset fetch: empty client id, no topics
    mb.returns(vec![0u8; 6]); // offset commit: empty client id, no topics
    mb.returns(vec![0u8; 4]); // offsets: no topics

    let metadata = broker
        .get_metadata("clientID", &MetadataRequest::default())
        .await
        .unwrap();
    assert!(metadata.topics.is_empty());

    let no_ack = ProduceRequest::new(RequiredAcks::NoResponse, 0);
    let response = broker.produce("clientID", &no_ack).await.unwrap();
    assert!(response.is_none(), "produce with NoResponse got a response");

    let local = ProduceRequest::new(RequiredAcks::WaitForLocal, 1000);
    let response = broker.produce("clientID", &local).await.unwrap();
    assert!(response.is_some(), "produce without NoResponse got no response");

    let fetched = broker
        .fetch("clientID", &FetchRequest::default())
        .await
        .unwrap();
    assert!(fetched.topics.is_empty());

    let offsets = broker
        .fetch_offset("clientID", &OffsetFetchRequest::default())
        .await
        .unwrap();
    assert!(offsets.topics.is_empty());

    let committed = broker
        .commit_offset("clientID", &OffsetCommitRequest::default())
        .await
        .unwrap();
    assert!(committed.topics.is_empty());

    let available = broker
        .get_available_offsets("clientID", &OffsetRequest::default())
        .await
        .unwrap();
    assert!(available.topics.is_empty());

    broker.close().await.unwrap();

    let seen: Vec<(i16, i32)> = mb
        .requests()
        .iter()
        .map(|h| (h.api_key, h.correlation_id))
        .collect();
    assert_eq!(
        seen,
        vec![(3, 0), (0, 1), (0, 2), (1, 3), (9, 4), (8, 5), (2, 6)],
        "every request, fire-and-forget included, takes the next correlation id"
    );
    assert!(mb
        .requests()
        .iter()
        .all(|h| h.client_id.as_deref() == Some("clientID")));
}

#[tokio::test]
async fn decodes_populated_metadata() {
    let mb = MockBroker::bind().await.unwrap();
    mb.returns_encoded(&MetadataResponse {
        brokers: vec![BrokerMetadata {
            node_id: 7,
            host: "kafka-7".into(),
            port: 9092,
        }],
        topics: vec![TopicMetadata {
            error: KafkaCode::NoError,
            name: "myTopic".into(),
            partitions: vec![PartitionMetadata {
                error: KafkaCode::NoError,
                partition_id: 0,
                leader: 7,
                replicas: vec![7],
                isr: vec![7],
            }],
        }],
    })
    .unwrap();

    let broker = Broker::new(mb.addr());
    broker.open(1).await.unwrap();
    let response = broker
        .get_metadata("myClient", &MetadataRequest::new(vec!["myTopic".into()]))
        .await
        .unwrap();
    assert_eq!(response.topics.len(), 1);
    let leader = response.topic("myTopic").unwrap().partitions[0].leader;
    assert_eq!(response.broker(leader).unwrap().addr(), "kafka-7:9092");
    broker.close().await.unwrap();
}

#[tokio::test]
async fn produce_and_list_offsets_with_payloads() {
    let mb = MockBroker::bind().await.unwrap();
    // produce response: topic "t", partition 0, no error, base offset 41
    mb.returns(vec![
        0, 0, 0, 1, 0, 1, b't', 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 41,
    ]);
    // offsets response: topic "t", partition 0, unknown topic error, no offsets
    mb.returns(vec![
        0, 0, 0, 1, 0, 1, b't', 0, 0, 0, 1, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0,
    ]);

    let broker = Broker::new(mb.addr());
    broker.open(1).await.unwrap();

    let mut produce = ProduceRequest::new(RequiredAcks::WaitForAll, 500);
    produce.add_message("t", 0, Message::new("hello").with_key("k"));
    let response = broker.produce("c", &produce).await.unwrap().unwrap();
    let block = response.block("t", 0).unwrap();
    assert_eq!(block.offset, 41);
    assert!(block.error.is_ok());

    let mut offsets = OffsetRequest::new();
    offsets.add_block("t", 0, EARLIEST_TIME, 1);
    let response = broker.get_available_offsets("c", &offsets).await.unwrap();
    let block = response.block("t", 0).unwrap();
    assert_eq!(block.error, KafkaCode::UnknownTopicOrPartition);
    assert!(block.offsets.is_empty());

    broker.close().await.unwrap();
}
