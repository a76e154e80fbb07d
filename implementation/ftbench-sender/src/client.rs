use ftbench::{Error, Sender, SenderConfig};
use futures::{
    future::{self, Either, Loop},
    prelude::*,
};
use log::info;
use std::{fs::File, io::BufReader, path::Path};
use tokio::runtime::current_thread::Runtime;

/// Opens the input file anew for every run.
fn open(path: &Path) -> Result<BufReader<File>, Error> {
    File::open(path).map(BufReader::new).map_err(Error::Storage)
}

/// Connects to the receiver, sends the input file `runs` times and says
/// goodbye.
pub fn run(config: &SenderConfig) -> Result<(), Error> {
    // Fail before connecting if there is nothing to send
    open(&config.input)?;

    let sender = Sender::connect(config)?;
    info!(
        "⚡️  Connected to {} using {}.",
        config.addr, config.congestion,
    );

    let input = config.input.clone();
    let runs = config.runs;

    let session = future::loop_fn((sender, 1), move |(sender, run)| {
        future::result(open(&input))
            .and_then(|file| sender.send_file(file))
            .and_then(move |(sender, _)| {
                if run < runs {
                    Either::A(
                        sender
                            .signal_repeat()
                            .map(move |sender| Loop::Continue((sender, run + 1))),
                    )
                } else {
                    Either::B(future::ok(Loop::Break(sender)))
                }
            })
    })
    .and_then(Sender::signal_done)
    .and_then(|sender| {
        let files = sender.files_sent();
        let mut conn = sender.into_inner();

        future::poll_fn(move || conn.close()).map(move |_| files)
    });

    let mut runtime = Runtime::new()?;
    let files = runtime.block_on(session)?;

    info!("🏁  Sent {} files.", files);
    Ok(())
}
