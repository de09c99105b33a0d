use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match stepdriver_cli::cli::app::run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
