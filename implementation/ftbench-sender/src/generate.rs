use rand::{distributions::Uniform, Rng};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

const LINES: usize = 2000;
const LINE_LEN: usize = 3001;

/// Fills `path` with lines of random uppercase letters.
///
/// Returns the number of bytes written.
pub fn random_file(path: &Path) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut rng = rand::thread_rng();
    let letters = Uniform::new_inclusive(b'A', b'Z');
    let mut line = vec![b'\n'; LINE_LEN + 1];

    for _ in 0..LINES {
        for b in &mut line[..LINE_LEN] {
            *b = rng.sample(letters);
        }
        out.write_all(&line)?;
    }

    out.flush()?;
    Ok((LINES * (LINE_LEN + 1)) as u64)
}
