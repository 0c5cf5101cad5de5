//! End-to-end scenarios driven purely through the public API, the way a
//! host embedding this crate would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use coloop::{file_close, file_open, file_write, AsyncTask, Await, EventLoop, FileHandle, Task};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scenario 1: an empty loop's `run_until` returns immediately rather than
/// blocking.
#[test]
fn empty_loop_tick() {
    init_logging();
    let loop_ = EventLoop::new().unwrap();
    let start = Instant::now();
    loop_.run_until(|| true).unwrap();
    assert!(start.elapsed() < Duration::from_millis(10));
}

/// Scenario 2: a single-shot task that returns `Await::Done` on its first
/// resume is run exactly once and never rescheduled.
#[test]
fn single_shot_task() {
    init_logging();

    struct OneShot(Arc<AtomicUsize>);
    impl Task for OneShot {
        fn resume(&mut self, _loop_: &EventLoop) -> Await {
            self.0.fetch_add(1, Ordering::SeqCst);
            Await::Done
        }
    }

    let loop_ = EventLoop::new().unwrap();
    let resumes = Arc::new(AtomicUsize::new(0));
    loop_
        .submit(Box::new(OneShot(Arc::clone(&resumes))))
        .unwrap();
    loop_.run_until(|| true).unwrap();

    assert_eq!(resumes.load(Ordering::SeqCst), 1);
    assert_eq!(loop_.queued_len(), 0);
}

/// Scenario 3: open a file, write 13 bytes, close it, observed through
/// `park`+`run_until` polling from the host side.
#[test]
fn file_write_then_close() {
    init_logging();

    struct Start(Option<(Box<dyn AsyncTask>, Box<dyn Task>)>);
    impl Task for Start {
        fn resume(&mut self, _loop_: &EventLoop) -> Await {
            let (async_task, continuation) = self.0.take().unwrap();
            Await::start(async_task, continuation)
        }
    }

    struct WriteState {
        handle_cell: Arc<Mutex<Option<Arc<FileHandle>>>>,
        write_ok: Arc<AtomicBool>,
        flag: Arc<AtomicBool>,
    }
    impl Task for WriteState {
        fn resume(&mut self, _loop_: &EventLoop) -> Await {
            let handle = self.handle_cell.lock().unwrap().clone().unwrap();
            Await::start(
                file_write(handle, b"Hello world!\n".to_vec(), Arc::clone(&self.write_ok)),
                Box::new(CloseAfterWrite {
                    handle_cell: Arc::clone(&self.handle_cell),
                    write_ok: Arc::clone(&self.write_ok),
                    flag: Arc::clone(&self.flag),
                }),
            )
        }
    }

    struct CloseAfterWrite {
        handle_cell: Arc<Mutex<Option<Arc<FileHandle>>>>,
        write_ok: Arc<AtomicBool>,
        flag: Arc<AtomicBool>,
    }
    impl Task for CloseAfterWrite {
        fn resume(&mut self, _loop_: &EventLoop) -> Await {
            assert!(self.write_ok.load(Ordering::SeqCst));
            let handle = self.handle_cell.lock().unwrap().clone().unwrap();
            struct SetFlag(Arc<AtomicBool>);
            impl Task for SetFlag {
                fn resume(&mut self, _loop_: &EventLoop) -> Await {
                    self.0.store(true, Ordering::SeqCst);
                    Await::Done
                }
            }
            Await::start(file_close(handle), Box::new(SetFlag(Arc::clone(&self.flag))))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.txt");

    let loop_ = EventLoop::new().unwrap();
    let handle_cell = Arc::new(Mutex::new(None));
    let write_ok = Arc::new(AtomicBool::new(false));
    let flag = Arc::new(AtomicBool::new(false));

    loop_
        .submit(Box::new(Start(Some((
            file_open(true, path.clone(), Arc::clone(&handle_cell)),
            Box::new(WriteState {
                handle_cell: Arc::clone(&handle_cell),
                write_ok: Arc::clone(&write_ok),
                flag: Arc::clone(&flag),
            }),
        )))))
        .unwrap();

    let start = Instant::now();
    while !flag.load(Ordering::SeqCst) {
        loop_.park(Duration::from_millis(500));
        loop_.run_until(|| true).unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    assert_eq!(std::fs::read(&path).unwrap(), b"Hello world!\n");
}

/// Scenario 4: a parked thread wakes on a concurrent submit well before its
/// timeout expires.
#[test]
fn park_wakeup() {
    init_logging();

    struct Sentinel;
    impl Task for Sentinel {
        fn resume(&mut self, _loop_: &EventLoop) -> Await {
            Await::Done
        }
    }

    let loop_ = EventLoop::new().unwrap();
    let loop_clone = loop_.clone();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        loop_clone.submit(Box::new(Sentinel)).unwrap();
    });

    let start = Instant::now();
    let timed_out = loop_.park(Duration::from_millis(1000));
    let elapsed = start.elapsed();

    handle.join().unwrap();
    assert!(!timed_out);
    assert!(elapsed >= Duration::from_millis(90));
    assert!(elapsed < Duration::from_millis(500));
}

/// Scenario 5: parking with no submitter times out no earlier than the
/// requested timeout.
#[test]
fn park_timeout() {
    init_logging();
    let loop_ = EventLoop::new().unwrap();

    let start = Instant::now();
    let timed_out = loop_.park(Duration::from_millis(200));
    let elapsed = start.elapsed();

    assert!(timed_out);
    assert!(elapsed >= Duration::from_millis(200));
}

/// Scenario 6: submitting one more task than a segment holds allocates a
/// second segment; draining the queue reclaims both.
#[test]
fn queue_segment_rollover() {
    init_logging();

    struct Counted(Arc<AtomicUsize>);
    impl Task for Counted {
        fn resume(&mut self, _loop_: &EventLoop) -> Await {
            self.0.fetch_add(1, Ordering::SeqCst);
            Await::Done
        }
    }

    let capacity = coloop::Builder::DEFAULT_SEGMENT_CAPACITY;
    let loop_ = EventLoop::builder().build().unwrap();
    let resumed = Arc::new(AtomicUsize::new(0));

    for _ in 0..=capacity {
        loop_
            .submit(Box::new(Counted(Arc::clone(&resumed))))
            .unwrap();
    }
    assert_eq!(loop_.queued_len(), capacity + 1);

    let mut iterations = 0;
    loop_
        .run_until(|| {
            iterations += 1;
            iterations <= capacity + 10
        })
        .unwrap();

    assert_eq!(resumed.load(Ordering::SeqCst), capacity + 1);
    assert_eq!(loop_.queued_len(), 0);
}
