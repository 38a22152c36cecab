use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use wallet_netconf::{
    config::Config,
    console::{self, ConfirmationSlot, ConsolePresenter},
    fetch::HttpFetcher,
    pipeline::ApplyPipeline,
    session::{Session, SessionEvent, SessionExit},
    store::FileStore,
    validator::GlobalConfigValidator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env();
    let store = Arc::new(FileStore::from_config(&config));
    let persisted = store.load();

    let pending = ConfirmationSlot::shared();
    let fetcher = HttpFetcher::new(&config).context("failed to set up HTTP client")?;
    let pipeline = Arc::new(ApplyPipeline::new(
        Arc::new(fetcher),
        Arc::new(GlobalConfigValidator),
        store.clone(),
        Arc::new(ConsolePresenter::new(pending.clone())),
    ));

    let session = Session::new(persisted, pipeline);
    println!("{}\n", console::render(&session.view()));
    println!("{}", console::HELP);

    let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(32);
    tokio::spawn(console::drive(
        console::spawn_stdin_reader(),
        pending,
        events_tx,
        session.subscribe(),
    ));

    match session.run(events_rx).await {
        SessionExit::Applied(configuration) => {
            let network = configuration.active_network();
            println!(
                "Now using {} ({})",
                network.label(),
                configuration.effective_chain_name(network)
            );
        }
        SessionExit::Closed => println!("Nothing changed."),
        SessionExit::Dismissed => println!("Closed without applying."),
    }

    Ok(())
}
