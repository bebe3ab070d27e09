//! Upkeep CLI entry point
//!
//! Reassembles the process arguments into a single command line, loads the
//! configuration the selected mode needs, wires the console collaborators into
//! the orchestrator and exits with the status of the run.

use std::sync::Arc;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use upkeep::cli::{Mode, OperationRequest, join_args, parse_command_line};
use upkeep::config::UpdaterConfig;
use upkeep::core::{ErrorContext, ExitStatus, user_friendly_error};
use upkeep::host::{
    ConsoleProgress, ConsolePrompt, ProgressSink, SystemProcessController, UserPrompt,
};
use upkeep::orchestrator::UpdateOrchestrator;
use upkeep::session::{SessionContext, watch_interrupts};
use upkeep::transport::ReqwestTransport;

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let line = join_args(std::env::args().skip(1));
    let request = match parse_command_line(&line) {
        Ok(request) => request,
        Err(e) => fail(user_friendly_error(e.into())),
    };

    let code = run(&line, &request).await;
    std::process::exit(code);
}

async fn run(line: &str, request: &OperationRequest) -> i32 {
    let dir = UpdaterConfig::default_dir();
    let config = match request.mode {
        Mode::CheckAndUpdateApp | Mode::ShowOptions => match UpdaterConfig::load(&dir).await {
            Ok(config) => config,
            // Configuration problems are reported even in silent mode.
            Err(e) => fail(user_friendly_error(e.into())),
        },
        _ => UpdaterConfig::load_lenient(&dir).await,
    };

    let silent = config.app.silent_mode && !request.verbose;
    init_logging(request.verbose, silent);
    debug!("Command line: {}", line);
    debug!("Configuration directory: {}", dir.display());

    let transport = match ReqwestTransport::new(&config.proxy) {
        Ok(transport) => transport,
        Err(e) => fail(user_friendly_error(e)),
    };

    let prompt: Arc<dyn UserPrompt> =
        Arc::new(ConsolePrompt::new(config.app.message_box_title.clone()));
    let progress: Arc<dyn ProgressSink> = Arc::new(if silent {
        ConsoleProgress::hidden()
    } else {
        ConsoleProgress::new()
    });
    let session = Arc::new(SessionContext::new());
    let interrupts = watch_interrupts(
        Arc::clone(&session),
        Arc::clone(&prompt),
        Arc::clone(&progress),
        config.messages.clone(),
        silent,
    );

    let orchestrator = UpdateOrchestrator::new(config, transport)
        .with_prompt(prompt)
        .with_process(Arc::new(SystemProcessController::new()))
        .with_progress(progress)
        .with_session(session);

    let result = tokio::select! {
        result = orchestrator.run(request) => result,
        () = interrupts => {
            warn!("Stopped by Ctrl-C");
            return ExitStatus::Interrupted.code();
        }
    };

    match result {
        Ok(status) => status.code(),
        Err(e) => {
            let context = user_friendly_error(e);
            if !silent {
                context.display();
            }
            context.exit_status().code()
        }
    }
}

fn init_logging(verbose: bool, silent: bool) {
    let default_level = if verbose {
        "upkeep=debug"
    } else if silent {
        "upkeep=warn"
    } else {
        "upkeep=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fail(context: ErrorContext) -> ! {
    context.display();
    std::process::exit(context.exit_status().code());
}
