#[tokio::main]
async fn main() {
    if let Err(e) = civic_lib::run().await {
        eprintln!("civic_backend failed: {}", e);
        std::process::exit(1);
    }
}
