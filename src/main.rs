use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use agent_core::StopSignal;
use codereview_agent::{
    Config,
    cli::Cli,
    core::{create_code_review_agent, run_review},
    render::Renderer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v; logs go to stderr, away from the review.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Config::load()?;
    cli.apply(&mut config);
    let api_key = config.agent.api_key()?;
    let request = cli.request_text();
    let root = std::env::current_dir()?;

    tracing::info!(
        version = codereview_agent::build_info::VERSION_STRING,
        model = %config.agent.model,
        max_steps = config.agent.max_steps,
        root = %root.display(),
        "starting review"
    );

    let stop = StopSignal::new();
    let agent = create_code_review_agent(&config, api_key, &root, stop.clone())?;

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            stop.stop();
        }
    });

    let mut renderer = Renderer::stdout();
    renderer.print_header(agent.model(), &request);
    let outcome = run_review(&agent, &request, &mut renderer).await;
    interrupt.abort();

    match outcome {
        Ok(_) => {
            renderer.print_footer();
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            renderer.print_failure(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}
