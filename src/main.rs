use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    sftpcron_lib::init_logging();

    match sftpcron_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
