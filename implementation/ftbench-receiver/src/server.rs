use ftbench::{Error, ReceiverConfig};
use log::info;
use tokio::runtime::current_thread::Runtime;

/// Accepts a single sender and receives files until it says `EXIT`, then
/// prints the statistics of every completed run.
pub fn serve(config: &ReceiverConfig) -> Result<(), Error> {
    let listener = ftbench::listen(&config.bind_addr(), &config.congestion)?;

    info!(
        "⛓  Starting receiver on {} using {}.",
        listener.local_addr()?,
        config.congestion,
    );

    let mut runtime = Runtime::new()?;
    let ledger = runtime.block_on(ftbench::receive_on(listener, config))?;

    println!("{}", ledger.report());
    info!("🏁  Receiver done after {} runs.", ledger.count());

    Ok(())
}
