//! Brokerlink CLI: connect to one broker and print its metadata.
//!
//! BROKERLINK_ADDR (default localhost:9092) picks the broker and
//! BROKERLINK_CLIENT_ID (default "brokerlink") the client id. Topic names
//! given as arguments restrict the request; none asks for every topic.

use brokerlink::{Broker, BrokerConfig, MetadataRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brokerlink=info".parse()?))
        .init();

    let addr = std::env::var("BROKERLINK_ADDR").unwrap_or_else(|_| "localhost:9092".to_string());
    let client_id =
        std::env::var("BROKERLINK_CLIENT_ID").unwrap_or_else(|_| "brokerlink".to_string());
    let topics: Vec<String> = std::env::args().skip(1).collect();

    let broker = Broker::with_config(addr, BrokerConfig::from_env()?);
    broker.open(1).await?;

    let result = broker
        .get_metadata(&client_id, &MetadataRequest::new(topics))
        .await;
    broker.close().await?;
    let response = result?;

    println!(
        "There are {} topics active in the cluster.",
        response.topics.len()
    );
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
