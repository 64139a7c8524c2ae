use anyhow::{anyhow, Context, Result};
use std::{env, process::ExitCode, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunesmith_core::impls::{HttpGenerationApi, SimulatedApi};
use tunesmith_core::ports::GenerationApi;
use tunesmith_core::{GenerationController, GenerationTask, TaskStatus};

mod args;
mod config;
mod render;

use args::{Command, Options};
use config::AppConfig;

/// Status queries the simulated service answers before completing.
const SIMULATED_POLLS: u32 = 6;

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunesmith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let options = match args::parse(env::args().skip(1))? {
        Command::Help => {
            print!("{}", args::USAGE);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Generate(options) => options,
    };
    let config = AppConfig::load().context("failed to load configuration")?;

    let api = build_api(&config, options.simulate)?;
    let controller = GenerationController::new(api, config.controller_config())
        .context("invalid controller configuration")?;

    let code = follow(&controller, &config, options).await;
    controller.dispose();
    code
}

fn build_api(config: &AppConfig, simulate: bool) -> Result<Arc<dyn GenerationApi>> {
    if simulate {
        info!(polls = SIMULATED_POLLS, "using simulated generation service");
        return Ok(Arc::new(SimulatedApi::new(SIMULATED_POLLS)));
    }
    let url = config.api_url().ok_or_else(|| {
        anyhow!("no API URL configured; set TUNESMITH_API_URL or pass --simulate")
    })?;
    let api = HttpGenerationApi::new(
        url,
        config.api_key().map(str::to_string),
        config.request_timeout(),
    )
    .context("failed to set up HTTP client")?;
    info!(base_url = %api.base_url(), "using remote generation service");
    Ok(Arc::new(api))
}

/// Submit the request and print every state change until a terminal state
/// or Ctrl-C.
async fn follow(
    controller: &GenerationController,
    config: &AppConfig,
    options: Options,
) -> Result<ExitCode> {
    let Options {
        mut request, json, ..
    } = options;
    if request.model_version.is_none() {
        request.model_version = config.model().map(str::to_string);
    }

    let print = |task: &GenerationTask| -> Result<()> {
        let line = if json {
            render::json_line(task)?
        } else {
            render::status_line(task)
        };
        println!("{line}");
        Ok(())
    };

    let mut rx = controller.watch();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = tokio::select! {
        started = controller.start(request) => started,
        _ = &mut ctrl_c => {
            warn!("interrupted while submitting");
            controller.reset();
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };
    if let Err(err) = started {
        let task = controller.snapshot();
        if task.status == TaskStatus::Error {
            print(&task)?;
        }
        return Err(err).context("generation could not be started");
    }

    let mut last = rx.borrow_and_update().clone();
    print(&last)?;
    while !last.status.is_terminal() {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                last = rx.borrow_and_update().clone();
                print(&last)?;
            }
            _ = &mut ctrl_c => {
                warn!("interrupted, cancelling generation");
                controller.reset();
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        }
    }

    Ok(match last.status {
        TaskStatus::Complete => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
