use flexsub_core::CfnRequest;
use flexsub_handler::{Invocation, bootstrap};
use lambda_runtime::{LambdaEvent, run, service_fn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let handler = bootstrap().await?;

    run(service_fn(|event: LambdaEvent<CfnRequest>| {
        let handler = &handler;
        async move {
            let invocation = Invocation::from_context(&event.context);
            handler
                .handle_custom_resource(event.payload, &invocation)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
