use clap::Parser;
use simdex_cli::{CliArgs, SimdexApp, init_logging};

#[tokio::main]
async fn main() -> simdex_core::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.quiet);

    let app = SimdexApp::from_args(&args)?;
    if let Err(e) = app.run(args.command).await {
        tracing::error!("{e}");
        return Err(e);
    }
    Ok(())
}
