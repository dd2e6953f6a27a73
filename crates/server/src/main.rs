use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    broker_proxyd::main_entry().await
}
