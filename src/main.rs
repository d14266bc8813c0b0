use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    chat_relay::run().await
}
