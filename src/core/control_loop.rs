use std::sync::{Arc, RwLock, atomic::{AtomicBool, Ordering}};

use chrono::Utc;

use super::{consts::TICK_INTERVAL_MS, mount::Mount};

/// Owns the thread that calls `Mount::tick` at the fixed cadence. The
/// write lock is held only for the duration of one tick, so request
/// handlers never observe a torn coordinate pair.
pub struct ControlLoop {
    thread:    Option<std::thread::JoinHandle<()>>,
    exit_flag: Arc<AtomicBool>,
}

impl ControlLoop {
    pub fn start(mount: &Arc<RwLock<Mount>>) -> Self {
        let exit_flag = Arc::new(AtomicBool::new(false));
        let thread = {
            let mount = Arc::clone(mount);
            let exit_flag = Arc::clone(&exit_flag);
            std::thread::spawn(move || {
                Self::thread_fun(&mount, &exit_flag);
            })
        };
        Self {
            thread: Some(thread),
            exit_flag,
        }
    }

    fn thread_fun(mount: &Arc<RwLock<Mount>>, exit_flag: &AtomicBool) {
        log::info!("Control loop started");
        while !exit_flag.load(Ordering::Relaxed) {
            let now = Utc::now().naive_utc();
            mount.write().unwrap().tick(&now);
            std::thread::sleep(std::time::Duration::from_millis(TICK_INTERVAL_MS));
        }
        log::info!("Control loop finished");
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        log::info!("Stopping control loop thread...");
        self.exit_flag.store(true, Ordering::Relaxed);
        let thread = self.thread.take().unwrap();
        _ = thread.join();
        log::info!("Done!");
    }
}

#[test]
fn test_control_loop_ticks_and_stops() {
    use crate::{options::*, stepper::SimStepDriver};

    let site = SiteOptions { latitude: 45.0, longitude: 0.0 };
    let mount = Mount::new(
        &MountOptions::default(),
        &site,
        Box::new(SimStepDriver::new())
    ).unwrap();
    let mount = Arc::new(RwLock::new(mount));

    mount.write().unwrap().slew_to_alt_az(0.0, 45.0).unwrap();

    let control_loop = ControlLoop::start(&mount);
    std::thread::sleep(std::time::Duration::from_millis(200));
    drop(control_loop);

    // The loop advanced the planner while it was alive
    let pos = mount.read().unwrap().current_alt_az();
    assert!(pos.az > 0.0);
}
