use std::sync::Arc;

use mq_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), mq_core::Error> {
    mq_core::logging::init("mq")?;

    let cfg = Arc::new(Config::load()?);

    mq_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| mq_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
