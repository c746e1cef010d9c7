use anyhow::Result;
use tokio_util::sync::CancellationToken;

use podpulse::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    // Held for the whole run so the dev log file is flushed on exit
    let _log_guard = logging::init_tracing(args.verbosity, args.dev)?;

    let cancel = CancellationToken::new();
    logging::setup_signal_handler(cancel.clone())?;

    cli::run(args, cancel).await
}
