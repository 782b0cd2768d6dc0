#[tokio::main]
async fn main() {
    if let Err(e) = launcher_mirror_lib::run().await {
        eprintln!("launcher-mirror: {e}");
        std::process::exit(1);
    }
}
