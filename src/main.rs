#[tokio::main]
async fn main() {
    if let Err(e) = eventpro_backend::run().await {
        eprintln!("eventpro-backend failed to start: {}", e);
        std::process::exit(1);
    }
}
