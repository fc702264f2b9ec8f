use dotenvy::dotenv;
use tracing::info;

use mailadmin::infra::{
    app::create_app, mailbox_poller::run_mailbox_poll_loop, setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;

    let app = create_app(app_state.clone());

    // Spawn the mailbox reconciliation task (after tracing is initialized)
    let reconcile = app_state.reconcile_use_cases.clone();
    let poll_secs = app_state.config.mailbox_poll_secs;
    tokio::spawn(async move {
        run_mailbox_poll_loop(reconcile, poll_secs).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
