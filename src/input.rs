//! Byte-at-a-time input loop
//!
//! Reads one byte per attempt from a raw-mode terminal, reports it, and stops
//! after the quit byte has been reported.

use std::io::Write;
use std::os::fd::{AsFd, AsRawFd};

use nix::errno::Errno;
use nix::unistd;
use tracing::{debug, error, trace};

use crate::error::{Result, TerminalError};
use crate::render;
use crate::types::{ClassifiedByte, ReadResult};

/// Decides whether a read errno means "no byte yet" on this platform
pub type TimeoutPredicate = fn(Errno) -> bool;

/// Some platforms (Cygwin) report a VTIME expiry as `EAGAIN` instead of a
/// zero-length read.
pub fn eagain_is_timeout(errno: Errno) -> bool {
    errno == Errno::EAGAIN
}

/// Source of single bytes with a bounded wait
pub trait ByteSource {
    fn read_byte(&mut self) -> ReadResult;
}

/// Reads one byte per call straight from a file descriptor
pub struct FdByteSource<F: AsFd> {
    fd: F,
    is_timeout: TimeoutPredicate,
}

impl<F: AsFd> FdByteSource<F> {
    pub fn new(fd: F) -> Self {
        Self {
            fd,
            is_timeout: eagain_is_timeout,
        }
    }

    /// Replace the timeout-equivalent errno check
    pub fn with_timeout_predicate(mut self, is_timeout: TimeoutPredicate) -> Self {
        self.is_timeout = is_timeout;
        self
    }
}

impl<F: AsFd> ByteSource for FdByteSource<F> {
    fn read_byte(&mut self) -> ReadResult {
        let mut buf = [0u8; 1];
        match unistd::read(self.fd.as_fd().as_raw_fd(), &mut buf) {
            Ok(0) => ReadResult::Timeout,
            Ok(_) => ReadResult::Byte(buf[0]),
            Err(e) if (self.is_timeout)(e) => ReadResult::Timeout,
            Err(e) => ReadResult::Error(e),
        }
    }
}

/// Where the loop is between two reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    WaitByte,
    Classify(u8),
    Emit(ClassifiedByte),
    Terminate,
}

/// Drives a [`ByteSource`] and writes one report line per byte
pub struct InputLoop<S, W> {
    source: S,
    out: W,
    quit_byte: u8,
    state: LoopState,
}

impl<S: ByteSource, W: Write> InputLoop<S, W> {
    pub fn new(source: S, out: W) -> Self {
        Self {
            source,
            out,
            quit_byte: b'q',
            state: LoopState::WaitByte,
        }
    }

    pub fn with_quit_byte(mut self, quit_byte: u8) -> Self {
        self.quit_byte = quit_byte;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Perform one transition and return the new state.
    ///
    /// `Terminate` is absorbing: stepping it again does nothing.
    pub fn step(&mut self) -> Result<LoopState> {
        self.state = match self.state {
            LoopState::WaitByte => match self.source.read_byte() {
                ReadResult::Byte(code) => LoopState::Classify(code),
                ReadResult::Timeout => {
                    trace!("read timed out");
                    LoopState::WaitByte
                }
                ReadResult::Error(e) => {
                    error!(error = %e, "read failed");
                    return Err(TerminalError::Read(e));
                }
            },
            LoopState::Classify(code) => LoopState::Emit(ClassifiedByte::new(code)),
            LoopState::Emit(byte) => {
                render::emit(&mut self.out, byte).map_err(TerminalError::Output)?;
                debug!(code = byte.code, control = byte.is_control, "reported byte");
                if byte.code == self.quit_byte {
                    LoopState::Terminate
                } else {
                    LoopState::WaitByte
                }
            }
            LoopState::Terminate => LoopState::Terminate,
        };
        Ok(self.state)
    }

    /// Step until the quit byte has been reported or an error occurs
    pub fn run(&mut self) -> Result<()> {
        while self.step()? != LoopState::Terminate {}
        Ok(())
    }

    /// Give back the output sink
    pub fn into_output(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::fs::File;
    use std::io;

    /// Plays back a fixed script, then reports timeouts forever
    struct Script(VecDeque<ReadResult>);

    impl Script {
        fn new(results: impl IntoIterator<Item = ReadResult>) -> Self {
            Self(results.into_iter().collect())
        }
    }

    impl ByteSource for Script {
        fn read_byte(&mut self) -> ReadResult {
            self.0.pop_front().unwrap_or(ReadResult::Timeout)
        }
    }

    fn run_script(results: Vec<ReadResult>) -> (Result<()>, String, usize) {
        let mut input = InputLoop::new(Script::new(results), Vec::new());
        let result = input.run();
        let left = input.source.0.len();
        let out = String::from_utf8(input.into_output()).unwrap();
        (result, out, left)
    }

    #[test]
    fn printable_then_quit() {
        let (result, out, _) = run_script(vec![ReadResult::Byte(b'A'), ReadResult::Byte(b'q')]);
        assert!(result.is_ok());
        insta::assert_debug_snapshot!(out, @r#""65 ('A')\r\n113 ('q')\r\n""#);
    }

    #[test]
    fn ctrl_c_is_reported_and_loop_continues() {
        let (result, out, _) = run_script(vec![ReadResult::Byte(3), ReadResult::Byte(b'q')]);
        assert!(result.is_ok());
        assert_eq!(out, "3\r\n113 ('q')\r\n");
    }

    #[test]
    fn quit_stops_reading() {
        let (result, out, left) = run_script(vec![
            ReadResult::Byte(b'q'),
            ReadResult::Byte(b'x'),
            ReadResult::Byte(b'y'),
        ]);
        assert!(result.is_ok());
        assert_eq!(out, "113 ('q')\r\n");
        assert_eq!(left, 2);
    }

    #[test]
    fn uppercase_q_does_not_quit() {
        let (result, out, _) = run_script(vec![ReadResult::Byte(b'Q'), ReadResult::Byte(b'q')]);
        assert!(result.is_ok());
        assert_eq!(out, "81 ('Q')\r\n113 ('q')\r\n");
    }

    #[test]
    fn timeouts_produce_no_output() {
        let mut input = InputLoop::new(Script::new(vec![]), Vec::new());
        for _ in 0..3 {
            assert_eq!(input.step().unwrap(), LoopState::WaitByte);
        }
        assert!(input.into_output().is_empty());
    }

    #[test]
    fn timeouts_between_bytes_are_silent() {
        let (result, out, _) = run_script(vec![
            ReadResult::Timeout,
            ReadResult::Byte(b'A'),
            ReadResult::Timeout,
            ReadResult::Timeout,
            ReadResult::Byte(b'q'),
        ]);
        assert!(result.is_ok());
        assert_eq!(out, "65 ('A')\r\n113 ('q')\r\n");
    }

    #[test]
    fn read_error_is_fatal() {
        let (result, out, left) = run_script(vec![
            ReadResult::Byte(b'A'),
            ReadResult::Error(Errno::EIO),
            ReadResult::Byte(b'q'),
        ]);
        assert!(matches!(result, Err(TerminalError::Read(Errno::EIO))));
        assert_eq!(out, "65 ('A')\r\n");
        assert_eq!(left, 1);
    }

    #[test]
    fn state_machine_walks_each_stage() {
        let mut input = InputLoop::new(Script::new(vec![ReadResult::Byte(b'q')]), Vec::new());
        assert_eq!(input.state(), LoopState::WaitByte);
        assert_eq!(input.step().unwrap(), LoopState::Classify(b'q'));
        assert_eq!(
            input.step().unwrap(),
            LoopState::Emit(ClassifiedByte::new(b'q'))
        );
        assert_eq!(input.step().unwrap(), LoopState::Terminate);
        assert_eq!(input.step().unwrap(), LoopState::Terminate);
    }

    #[test]
    fn custom_quit_byte() {
        let mut input = InputLoop::new(
            Script::new(vec![ReadResult::Byte(b'q'), ReadResult::Byte(0x1b)]),
            Vec::new(),
        )
        .with_quit_byte(0x1b);
        input.run().unwrap();
        assert_eq!(input.into_output(), b"113 ('q')\r\n27\r\n".to_vec());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_output_error() {
        let mut input = InputLoop::new(Script::new(vec![ReadResult::Byte(b'A')]), BrokenPipe);
        let err = input.run().unwrap_err();
        assert!(matches!(err, TerminalError::Output(_)));
    }

    #[test]
    fn fd_source_reads_bytes_then_eof_as_timeout() {
        let (rx, tx) = unistd::pipe().unwrap();
        let mut tx = File::from(tx);
        tx.write_all(b"A\x03").unwrap();
        drop(tx);

        let mut source = FdByteSource::new(rx);
        assert_eq!(source.read_byte(), ReadResult::Byte(b'A'));
        assert_eq!(source.read_byte(), ReadResult::Byte(3));
        assert_eq!(source.read_byte(), ReadResult::Timeout);
    }

    #[test]
    fn eagain_maps_to_timeout_by_default() {
        use nix::fcntl::{fcntl, FcntlArg, OFlag};

        let (rx, _tx) = unistd::pipe().unwrap();
        fcntl(rx.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();

        let mut source = FdByteSource::new(&rx);
        assert_eq!(source.read_byte(), ReadResult::Timeout);

        let mut strict = FdByteSource::new(&rx).with_timeout_predicate(|_| false);
        assert_eq!(strict.read_byte(), ReadResult::Error(Errno::EAGAIN));
    }

    #[test]
    fn write_only_fd_is_read_error() {
        let write_only = File::options().write(true).open("/dev/null").unwrap();
        let mut source = FdByteSource::new(&write_only);
        assert_eq!(source.read_byte(), ReadResult::Error(Errno::EBADF));
    }

    mod pty {
        use super::*;
        use crate::terminal::{ReadTiming, TerminalModeController, Tty};
        use nix::pty::openpty;
        use std::time::{Duration, Instant};

        fn next_byte<S: ByteSource>(source: &mut S) -> ReadResult {
            for _ in 0..50 {
                match source.read_byte() {
                    ReadResult::Timeout => continue,
                    other => return other,
                }
            }
            ReadResult::Timeout
        }

        #[test]
        fn raw_pty_delivers_control_bytes_unprocessed() {
            let pty = openpty(None, None).unwrap();
            let mut controller = TerminalModeController::capture(Tty::new(&pty.slave)).unwrap();
            controller.enter_raw_mode(ReadTiming::default()).unwrap();

            let mut master = File::from(pty.master.try_clone().unwrap());
            // Ctrl-C, CR, 'A': no signal, no CR->NL mapping
            master.write_all(b"\x03\rA").unwrap();

            let mut source = FdByteSource::new(&pty.slave);
            assert_eq!(next_byte(&mut source), ReadResult::Byte(3));
            assert_eq!(next_byte(&mut source), ReadResult::Byte(b'\r'));
            assert_eq!(next_byte(&mut source), ReadResult::Byte(b'A'));

            controller.restore().unwrap();
        }

        #[test]
        fn idle_raw_pty_times_out() {
            let pty = openpty(None, None).unwrap();
            let mut controller = TerminalModeController::capture(Tty::new(&pty.slave)).unwrap();
            controller.enter_raw_mode(ReadTiming::default()).unwrap();

            let mut input = InputLoop::new(FdByteSource::new(&pty.slave), Vec::new());
            let started = Instant::now();
            assert_eq!(input.step().unwrap(), LoopState::WaitByte);
            assert_eq!(input.step().unwrap(), LoopState::WaitByte);
            assert!(started.elapsed() < Duration::from_secs(5));
            assert!(input.into_output().is_empty());

            controller.restore().unwrap();
        }
    }
}
