use std::sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}};

/// Background thread running coarse periodic jobs (options autosave and
/// the like). Not used for motion: the control loop has its own thread
/// with a much finer cadence.
pub struct Timer {
    thread:    Option<std::thread::JoinHandle<()>>,
    jobs:      Arc<Mutex<Vec<TimerJob>>>,
    exit_flag: Arc<AtomicBool>,
}

struct TimerJob {
    fun:       Box<dyn Fn() + Sync + Send + 'static>,
    last_run:  std::time::Instant,
    period_ms: u32,
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("Stopping timer thread...");
        self.exit_flag.store(true, Ordering::Relaxed);
        let thread = self.thread.take().unwrap();
        _ = thread.join();
        log::info!("Done!");
    }
}

impl Timer {
    pub fn new() -> Self {
        let jobs = Arc::new(Mutex::new(Vec::new()));
        let exit_flag = Arc::new(AtomicBool::new(false));

        let thread = {
            let jobs = Arc::clone(&jobs);
            let exit_flag = Arc::clone(&exit_flag);
            std::thread::spawn(move || {
                Self::thread_fun(&jobs, &exit_flag);
            })
        };
        Self {
            thread: Some(thread),
            jobs,
            exit_flag,
        }
    }

    pub fn exec_periodic(
        &self,
        period_ms: u32,
        fun:       impl Fn() + Sync + Send + 'static
    ) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(TimerJob {
            fun:      Box::new(fun),
            last_run: std::time::Instant::now(),
            period_ms,
        });
    }

    fn thread_fun(
        jobs:      &Mutex<Vec<TimerJob>>,
        exit_flag: &AtomicBool
    ) {
        while !exit_flag.load(Ordering::Relaxed) {
            let mut jobs = jobs.lock().unwrap();
            for job in &mut *jobs {
                if job.last_run.elapsed().as_millis() as u32 >= job.period_ms {
                    (job.fun)();
                    job.last_run = std::time::Instant::now();
                }
            }
            drop(jobs);
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }
}

#[test]
fn test_periodic_job_runs() {
    use std::sync::atomic::AtomicUsize;

    let timer = Timer::new();
    let counter = Arc::new(AtomicUsize::new(0));
    timer.exec_periodic(50, {
        let counter = Arc::clone(&counter);
        move || { counter.fetch_add(1, Ordering::Relaxed); }
    });
    std::thread::sleep(std::time::Duration::from_millis(400));
    drop(timer);
    assert!(counter.load(Ordering::Relaxed) >= 1);
}
