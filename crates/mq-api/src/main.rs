#[tokio::main]
async fn main() {
    if let Err(err) = mq_api::run().await {
        tracing::error!(error = %err, "mq-api failed");
        std::process::exit(1);
    }
}
