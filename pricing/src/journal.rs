//! Asynchronous operator log.
//!
//! Any number of threads enqueue lines with [`LogSink::log`]; a single
//! background writer drains the queue, appending and flushing each line. The
//! writer exits only after it has observed "stopped AND queue empty", so every
//! line accepted before [`LogSink::stop`] reaches the destination.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, warn};

type Destination = Box<dyn Write + Send>;

#[derive(Default)]
struct SinkQueue {
    lines: VecDeque<String>,
    stopped: bool,
}

#[derive(Default)]
struct SinkShared {
    queue: Mutex<SinkQueue>,
    ready: Condvar,
    written: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
}

pub struct LogSink {
    shared: Arc<SinkShared>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl LogSink {
    /// Append to the file at `path`, creating it (and its parent directory)
    /// if needed.
    ///
    /// Never fails: if the file cannot be opened the sink still drains its
    /// queue but discards every line.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let opened = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(path));

        match opened {
            Ok(file) => {
                info!(path = %path.display(), "log sink opened");
                Self::spawn(Some(Box::new(file)))
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot open log destination; lines will be discarded"
                );
                Self::spawn(None)
            }
        }
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::spawn(Some(Box::new(writer)))
    }

    /// Sink that drains and discards everything.
    pub fn disabled() -> Self {
        Self::spawn(None)
    }

    fn spawn(destination: Option<Destination>) -> Self {
        let shared = Arc::new(SinkShared::default());

        let worker_shared = shared.clone();
        let writer = thread::Builder::new()
            .name("log-sink".into())
            .spawn(move || drain(worker_shared, destination));

        let writer = match writer {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without a writer nothing would ever drain; refuse lines instead.
                warn!(error = %e, "failed to spawn log sink writer; sink disabled");
                shared.queue.lock().stopped = true;
                None
            }
        };

        Self {
            shared,
            writer: Mutex::new(writer),
        }
    }

    /// Enqueue one line and wake the writer. Never blocks on I/O.
    pub fn log(&self, line: impl Into<String>) {
        {
            let mut q = self.shared.queue.lock();
            if q.stopped {
                drop(q);
                self.shared.rejected.fetch_add(1, Ordering::Relaxed);
                debug!("log sink stopped; line rejected");
                return;
            }
            q.lines.push_back(line.into());
        }
        self.shared.ready.notify_one();
    }

    /// Ask the writer to exit once the queue is drained. Does not wait.
    pub fn stop(&self) {
        self.shared.queue.lock().stopped = true;
        self.shared.ready.notify_all();
    }

    /// Stop, then wait until every accepted line has been handled.
    pub fn shutdown(&self) {
        self.stop();
        let handle = self.writer.lock().take();
        if let Some(h) = handle {
            if h.join().is_err() {
                warn!("log sink writer panicked");
            }
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.shared.written.load(Ordering::Acquire)
    }

    pub fn lines_discarded(&self) -> u64 {
        self.shared.discarded.load(Ordering::Acquire)
    }

    pub fn lines_rejected(&self) -> u64 {
        self.shared.rejected.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.lock().lines.len()
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drain(shared: Arc<SinkShared>, mut destination: Option<Destination>) {
    let mut q = shared.queue.lock();
    loop {
        while let Some(line) = q.lines.pop_front() {
            // The queue stays available to producers while we do I/O.
            MutexGuard::unlocked(&mut q, || write_line(&shared, destination.as_mut(), &line));
        }
        if q.stopped {
            break;
        }
        shared.ready.wait(&mut q);
    }
    drop(q);

    if let Some(d) = destination.as_mut() {
        let _ = d.flush();
    }
    debug!(
        written = shared.written.load(Ordering::Relaxed),
        discarded = shared.discarded.load(Ordering::Relaxed),
        "log sink writer exiting"
    );
}

fn write_line(shared: &SinkShared, destination: Option<&mut Destination>, line: &str) {
    let Some(d) = destination else {
        shared.discarded.fetch_add(1, Ordering::Release);
        return;
    };

    match writeln!(d, "{line}").and_then(|_| d.flush()) {
        Ok(()) => {
            shared.written.fetch_add(1, Ordering::Release);
        }
        Err(e) => {
            shared.discarded.fetch_add(1, Ordering::Release);
            warn!(error = %e, "log sink write failed; line discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_test::traced_test;

    /// Writer that appends into a shared buffer the test can inspect.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lines_are_written_in_fifo_order() {
        let buf = SharedBuf::default();
        let sink = LogSink::with_writer(buf.clone());

        for i in 0..10 {
            sink.log(format!("line {i}"));
        }
        sink.shutdown();

        let expected: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        assert_eq!(buf.lines(), expected);
        assert_eq!(sink.lines_written(), 10);
    }

    /// Writer whose every write waits for `gate` to be free.
    struct GatedWriter {
        gate: Arc<Mutex<()>>,
        out: SharedBuf,
    }

    impl Write for GatedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let _open = self.gate.lock();
            self.out.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stop_drains_every_queued_line() {
        let out = SharedBuf::default();
        let gate = Arc::new(Mutex::new(()));
        let closed = gate.lock();

        let sink = LogSink::with_writer(GatedWriter {
            gate: gate.clone(),
            out: out.clone(),
        });

        const K: usize = 500;
        for i in 0..K {
            sink.log(format!("{i}"));
        }

        // The writer holds at most one line while blocked on the gate.
        assert_eq!(sink.lines_written(), 0);
        assert!(sink.pending() >= K - 1, "pending {}", sink.pending());
        sink.stop();

        drop(closed);
        sink.shutdown();

        let expected: Vec<String> = (0..K).map(|i| i.to_string()).collect();
        assert_eq!(out.lines(), expected);
        assert_eq!(sink.lines_written(), K as u64);
        assert_eq!(sink.pending(), 0);
        assert!(sink.writer.lock().is_none());
    }

    #[test]
    fn lines_after_stop_are_rejected() {
        let buf = SharedBuf::default();
        let sink = LogSink::with_writer(buf.clone());

        sink.log("before");
        sink.shutdown();
        sink.log("after");

        assert_eq!(buf.lines(), vec!["before".to_string()]);
        assert_eq!(sink.lines_rejected(), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let sink = LogSink::with_writer(SharedBuf::default());
        sink.shutdown();
        sink.shutdown();
    }

    #[test]
    fn write_errors_are_counted_and_do_not_stop_the_writer() {
        let sink = LogSink::with_writer(FailingWriter);
        sink.log("a");
        sink.log("b");
        sink.shutdown();

        assert_eq!(sink.lines_written(), 0);
        assert_eq!(sink.lines_discarded(), 2);
    }

    #[test]
    fn many_producers_lose_nothing() {
        let buf = SharedBuf::default();
        let sink = Arc::new(LogSink::with_writer(buf.clone()));

        let producers: Vec<_> = (0..8)
            .map(|p| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        sink.log(format!("p{p}-{i}"));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        sink.shutdown();

        assert_eq!(buf.lines().len(), 800);
    }

    #[traced_test]
    #[test]
    fn unopenable_destination_degrades_to_noop() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let sink = LogSink::open(dir.path());

        assert!(logs_contain("cannot open log destination"));

        sink.log("dropped 1");
        sink.log("dropped 2");
        sink.shutdown();

        assert_eq!(sink.lines_written(), 0);
        assert_eq!(sink.lines_discarded(), 2);
    }

    #[test]
    fn file_destination_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pricing.log");

        {
            let sink = LogSink::open(&path);
            sink.log("first run");
        }
        {
            let sink = LogSink::open(&path);
            sink.log("second run");
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }
}
