#![allow(dead_code)]

use ftbench::{Error, Frame, Output};
use futures::prelude::*;
use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
    process,
    sync::{mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

/// Runs `func` on its own thread and fails the test if it doesn't finish in
/// time or panics.
pub fn run_timed<T: 'static + Send, F: 'static + Send + FnOnce() -> T>(
    duration: Duration,
    func: F,
) -> T {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let _ = tx.send(func());
    });

    match rx.recv_timeout(duration) {
        Ok(val) => val,
        Err(mpsc::RecvTimeoutError::Timeout) => panic!("timed out"),
        Err(mpsc::RecvTimeoutError::Disconnected) => panic!("test body panicked"),
    }
}

/// Creates a fresh, empty scratch directory for a test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("ftbench-{}-{}", name, process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Deterministic, non-repeating-looking test content.
pub fn content(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Keeps every received file in memory.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    files: Arc<Mutex<Vec<Arc<Mutex<Vec<u8>>>>>>,
}

/// A single in-memory file.
#[derive(Debug)]
pub struct MemoryFile(Arc<Mutex<Vec<u8>>>);

impl Memory {
    /// Snapshots the contents of all files opened so far.
    pub fn files(&self) -> Vec<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.lock().unwrap().clone())
            .collect()
    }
}

impl Output for Memory {
    type Target = MemoryFile;

    fn open(&mut self, seq: u32) -> io::Result<MemoryFile> {
        let mut files = self.files.lock().unwrap();
        assert_eq!(seq as usize, files.len(), "files must be opened in sequence");

        let file = Arc::new(Mutex::new(Vec::new()));
        files.push(file.clone());
        Ok(MemoryFile(file))
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A frame sink that records everything and is always ready.
#[derive(Debug, Default)]
pub struct Recorder(pub Vec<Frame>);

impl Sink for Recorder {
    type SinkItem = Frame;
    type SinkError = Error;

    fn start_send(&mut self, item: Frame) -> StartSend<Frame, Error> {
        self.0.push(item);
        Ok(AsyncSink::Ready)
    }

    fn poll_complete(&mut self) -> Poll<(), Error> {
        Ok(Async::Ready(()))
    }
}
