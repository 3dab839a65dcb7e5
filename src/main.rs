#[tokio::main]
async fn main() -> std::process::ExitCode {
    jira_export_lib::run().await
}
