#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _guards = kbchat_cli::tracing_setup::init_tracing(
        &kbchat_cli::tracing_setup::default_log_dir(),
    )?;
    kbchat_cli::try_main().await
}
