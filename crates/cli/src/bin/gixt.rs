use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    gixt_cli::main_entry().await
}
