#[tokio::main]
async fn main() {
    gbm_engine::start(std::env::args()).await;
}
