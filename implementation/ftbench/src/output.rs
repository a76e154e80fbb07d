use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

/// A factory for the targets received files are written to.
pub trait Output {
    type Target: Write;

    /// Opens the target for the file with the given sequence number.
    fn open(&mut self, seq: u32) -> io::Result<Self::Target>;
}

/// Writes received files as sequentially numbered files into a directory.
///
/// The first file is called `receive_file.txt`, the following ones
/// `receive_file1.txt`, `receive_file2.txt` and so on.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Directory {
    dir: PathBuf,
}

impl Directory {
    /// Writes into the given directory, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Directory { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// The path of the file with the given sequence number.
    pub fn file_path(&self, seq: u32) -> PathBuf {
        let name = match seq {
            0 => "receive_file.txt".to_owned(),
            n => format!("receive_file{}.txt", n),
        };

        self.dir.join(name)
    }
}

impl Output for Directory {
    type Target = BufWriter<File>;

    fn open(&mut self, seq: u32) -> io::Result<Self::Target> {
        File::create(self.file_path(seq)).map(BufWriter::new)
    }
}
