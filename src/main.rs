use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    pong_responder::run().await
}
