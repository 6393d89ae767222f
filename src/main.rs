#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nudgefocus_lib::run().await
}
