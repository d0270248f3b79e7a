use brokerlink::protocol::{encode_request_frame, encode_to_bytes};
use brokerlink::testing::MockBroker;
use brokerlink::{Broker, Message, MessageSet, MetadataRequest, ProduceRequest, RequiredAcks};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn produce_request(size: usize, messages: usize) -> ProduceRequest {
    let mut req = ProduceRequest::new(RequiredAcks::WaitForLocal, 1000);
    let payload = vec![7u8; size];
    for _ in 0..messages {
        req.add_message("bench", 0, Message::new(payload.clone()));
    }
    req
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_produce");
    for size in [128usize, 1024usize, 4096usize] {
        group.throughput(Throughput::Bytes((size * 100) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let req = produce_request(size, 100);
            let mut id = 0i32;
            b.iter(|| {
                id = id.wrapping_add(1);
                encode_request_frame("bench", id, &req).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_message_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_set");
    for count in [10usize, 100usize, 500usize] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut set = MessageSet::new();
            for i in 0..count {
                set.add_message(Message::new(format!("event-{}", i)).with_key("k"));
            }
            b.iter(|| encode_to_bytes(&set).unwrap());
        });
    }
    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (mb, broker) = rt.block_on(async {
        let mb = MockBroker::bind().await.unwrap();
        let broker = Broker::new(mb.addr());
        broker.open(1).await.unwrap();
        (mb, broker)
    });
    let req = MetadataRequest::default();

    c.bench_function("metadata_round_trip", |b| {
        b.to_async(&rt).iter(|| async {
            mb.returns(vec![0u8; 8]);
            broker.get_metadata("bench", &req).await.unwrap()
        });
    });

    c.bench_function("produce_no_response", |b| {
        let req = ProduceRequest::new(RequiredAcks::NoResponse, 0);
        b.to_async(&rt).iter(|| async {
            mb.returns(Vec::<u8>::new());
            broker.produce("bench", &req).await.unwrap()
        });
    });

    rt.block_on(async { broker.close().await.unwrap() });
}

criterion_group!(benches, bench_encode, bench_message_set, bench_round_trip);
criterion_main!(benches);
