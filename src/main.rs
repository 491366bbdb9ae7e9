#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = schoolhub_grading::run().await {
        eprintln!("schoolhub-grading fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
