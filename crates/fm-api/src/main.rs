#[tokio::main]
async fn main() {
    if let Err(err) = fm_api::run().await {
        tracing::error!(error = %err, "fm-api failed");
        std::process::exit(1);
    }
}
