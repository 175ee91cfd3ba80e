#[tokio::main]
async fn main() {
    qrush_be::start_server().await;
}
