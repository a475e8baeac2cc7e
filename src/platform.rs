use anyhow::Result;
use std::io::{self, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGPIPE, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, flag};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalPipe = 141, // 128 + SIGPIPE (13)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Global termination flag checked by the reader between chunks
pub static SHOULD_TERMINATE: AtomicBool = AtomicBool::new(false);
pub static TERMINATED_BY_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Signal handler for graceful shutdown.
///
/// The first SIGINT or SIGTERM asks the pipeline to stop reading; a second one
/// exits immediately. SIGPIPE exits quietly.
pub struct SignalHandler {
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGPIPE, SIGTERM])?;

            let handle = thread::spawn(move || {
                let mut shutdown_count = 0;
                for sig in signals.forever() {
                    match sig {
                        SIGPIPE => {
                            SHOULD_TERMINATE.store(true, Ordering::Relaxed);
                            TERMINATED_BY_SIGNAL.store(true, Ordering::Relaxed);
                            ExitCode::SignalPipe.exit();
                        }
                        SIGINT | SIGTERM => {
                            SHOULD_TERMINATE.store(true, Ordering::Relaxed);
                            TERMINATED_BY_SIGNAL.store(true, Ordering::Relaxed);
                            shutdown_count += 1;
                            if shutdown_count > 1 {
                                if sig == SIGTERM {
                                    ExitCode::SignalTerm.exit();
                                }
                                ExitCode::SignalInt.exit();
                            }
                        }
                        _ => {}
                    }
                }
            });

            Ok(SignalHandler { _handle: handle })
        }

        #[cfg(windows)]
        {
            let term_flag = std::sync::Arc::new(AtomicBool::new(false));
            flag::register(SIGINT, std::sync::Arc::clone(&term_flag))?;

            let handle = thread::spawn(move || loop {
                thread::sleep(std::time::Duration::from_millis(100));
                if term_flag.swap(false, Ordering::Relaxed) {
                    if SHOULD_TERMINATE.swap(true, Ordering::Relaxed) {
                        ExitCode::SignalInt.exit();
                    }
                    TERMINATED_BY_SIGNAL.store(true, Ordering::Relaxed);
                }
            });

            Ok(SignalHandler { _handle: handle })
        }
    }

    /// Check if we should terminate processing
    pub fn should_terminate() -> bool {
        SHOULD_TERMINATE.load(Ordering::Relaxed)
    }
}

/// Cross-platform broken pipe detection
fn is_broken_pipe(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
    #[cfg(windows)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
            || e.raw_os_error() == Some(232) // ERROR_NO_DATA "The pipe is being closed"
            || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE "The pipe has been ended"
    }
}

/// Stdout writer that exits quietly when the reading end of a pipe goes away
pub struct SafeStdout {
    stdout: io::Stdout,
}

impl SafeStdout {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Default for SafeStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for SafeStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stdout.write(buf) {
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            result => result,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stdout.flush() {
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            result => result,
        }
    }
}

/// Safe wrapper for writing to stderr
pub struct SafeStderr {
    stderr: io::Stderr,
}

impl SafeStderr {
    pub fn new() -> Self {
        Self {
            stderr: io::stderr(),
        }
    }

    /// Write a line to stderr. If even that fails there is nothing left to
    /// report to, so exit with a general error.
    pub fn writeln(&mut self, data: &str) -> Result<()> {
        match writeln!(self.stderr, "{}", data) {
            Ok(()) => Ok(()),
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            Err(_) => ExitCode::GeneralError.exit(),
        }
    }
}

impl Default for SafeStderr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::GeneralError as i32, 1);
        assert_eq!(ExitCode::InvalidUsage as i32, 2);
        assert_eq!(ExitCode::SignalInt as i32, 130);
        assert_eq!(ExitCode::SignalPipe as i32, 141);
        assert_eq!(ExitCode::SignalTerm as i32, 143);
    }

    #[test]
    fn test_should_terminate_initial_state() {
        assert!(!SignalHandler::should_terminate());
    }

    #[test]
    fn test_broken_pipe_detection() {
        assert!(is_broken_pipe(&io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(!is_broken_pipe(&io::Error::from(io::ErrorKind::NotFound)));
    }
}
