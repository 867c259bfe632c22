#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = imtihon_rust::run().await {
        eprintln!("imtihon-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
