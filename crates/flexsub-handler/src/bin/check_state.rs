use flexsub_core::Envelope;
use flexsub_handler::bootstrap;
use lambda_runtime::{LambdaEvent, run, service_fn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let handler = bootstrap().await?;

    // Errors fail the state; the state machine retries them
    run(service_fn(|event: LambdaEvent<Envelope>| {
        let handler = &handler;
        async move {
            handler
                .check_state(event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
