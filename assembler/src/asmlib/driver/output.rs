use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{event, Level};

use super::super::types::AssemblerFailure;

fn write_display<W: Write, T: Display>(writer: &mut W, content: &T) -> Result<(), io::Error> {
    write!(writer, "{content}")?;
    writer.flush()
}

/// Write `content` (which is the `what` output) to the file at `path`.
pub(super) fn write_to_file<T: Display>(
    path: &Path,
    what: &str,
    content: &T,
) -> Result<(), AssemblerFailure> {
    let io_failure = |error| AssemblerFailure::IoErrorOnOutput {
        filename: path.to_path_buf(),
        error,
    };
    let file = File::create(path).map_err(io_failure)?;
    write_display(&mut BufWriter::new(file), content).map_err(io_failure)?;
    event!(Level::DEBUG, "wrote {what} to {}", path.display());
    Ok(())
}

pub(super) fn write_to_stdout<T: Display>(what: &str, content: &T) -> Result<(), AssemblerFailure> {
    let stdout = io::stdout();
    write_display(&mut stdout.lock(), content)
        .map_err(|error| AssemblerFailure::IoErrorOnStdout { error })?;
    event!(Level::DEBUG, "wrote {what} to stdout");
    Ok(())
}
