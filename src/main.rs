#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = marksheet_service::run().await {
        eprintln!("marksheet-service fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
