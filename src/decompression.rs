use anyhow::{anyhow, Context, Result};
use flate2::read::MultiGzDecoder;
use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Programs tried, in order, when no decompressor was configured
pub const DECOMPRESSOR_CANDIDATES: [&str; 3] = ["gzcat", "unpigz", "zcat"];

/// Suffix marking a gzip-compressed log
pub const GZIP_SUFFIX: &str = ".gz";

pub fn is_compressed(path: &str) -> bool {
    path.ends_with(GZIP_SUFFIX)
}

/// How `.gz` input gets decompressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decompressor {
    /// Run `<program> -c <path>` and read its stdout
    External(PathBuf),
    /// Decode in-process with flate2
    Builtin,
}

impl Decompressor {
    pub fn describe(&self) -> String {
        match self {
            Decompressor::External(program) => program.display().to_string(),
            Decompressor::Builtin => "built-in gzip decoder".to_string(),
        }
    }
}

/// Search `PATH` for the first available decompression program
pub fn find_decompressor() -> Result<PathBuf> {
    let path = env::var_os("PATH").unwrap_or_default();
    find_decompressor_in(&path)
}

fn find_decompressor_in(search_path: &std::ffi::OsStr) -> Result<PathBuf> {
    for candidate in DECOMPRESSOR_CANDIDATES {
        for dir in env::split_paths(search_path) {
            let program = dir.join(candidate);
            if is_executable(&program) {
                return Ok(program);
            }
        }
    }
    Err(anyhow!(
        "could not find a program for gz decompression (tried {}); \
         set --unzipper or use --builtin-gzip",
        DECOMPRESSOR_CANDIDATES.join(", ")
    ))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Decompressor subprocess whose stdout is read as the log stream.
///
/// The child is reaped at end of stream and a failing exit status becomes a
/// read error. Dropping the reader early kills the child.
#[derive(Debug)]
pub struct ProcessReader {
    program: String,
    child: Child,
    stdout: ChildStdout,
    finished: bool,
}

impl ProcessReader {
    pub fn spawn(program: &Path, path: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .arg("-c")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start decompressor {}", program.display()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("decompressor {} has no stdout", program.display()))?;

        Ok(Self {
            program: program.display().to_string(),
            child,
            stdout,
            finished: false,
        })
    }

    fn reap(&mut self) -> io::Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("decompressor {} exited with {}", self.program, status),
            ))
        }
    }
}

impl Read for ProcessReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let read = self.stdout.read(buf)?;
        if read == 0 && !buf.is_empty() {
            self.reap()?;
        }
        Ok(read)
    }
}

impl Drop for ProcessReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// A readable log stream, decompressed if needed
pub enum LogSource {
    Plain(File),
    Gzip(MultiGzDecoder<File>),
    Process(ProcessReader),
}

impl std::fmt::Debug for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSource::Plain(_) => write!(f, "LogSource::Plain"),
            LogSource::Gzip(_) => write!(f, "LogSource::Gzip"),
            LogSource::Process(reader) => write!(f, "LogSource::Process({})", reader.program),
        }
    }
}

impl LogSource {
    /// Open `path`. Compressed files need a decompressor; plain files ignore it.
    pub fn open(path: &str, decompressor: Option<&Decompressor>) -> Result<Self> {
        let path_ref = Path::new(path);
        if !is_compressed(path) {
            let file = File::open(path_ref).with_context(|| format!("cannot open {}", path))?;
            return Ok(LogSource::Plain(file));
        }

        match decompressor {
            Some(Decompressor::Builtin) => {
                let file =
                    File::open(path_ref).with_context(|| format!("cannot open {}", path))?;
                Ok(LogSource::Gzip(MultiGzDecoder::new(file)))
            }
            Some(Decompressor::External(program)) => {
                // The child would only report a missing file on stderr
                if !path_ref.is_file() {
                    return Err(anyhow!("cannot open {}: no such file", path));
                }
                Ok(LogSource::Process(ProcessReader::spawn(program, path_ref)?))
            }
            None => Err(anyhow!("no decompressor configured for {}", path)),
        }
    }
}

impl Read for LogSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            LogSource::Plain(reader) => reader.read(buf),
            LogSource::Gzip(reader) => reader.read(buf),
            LogSource::Process(reader) => reader.read(buf),
        }
    }
}
