#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = imtihon_rust::run_worker().await {
        eprintln!("imtihon-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
