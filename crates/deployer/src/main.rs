use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match deployer::run(std::env::args()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(?err, "deployment failed");
            ExitCode::FAILURE
        }
    }
}
