#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

mod astro;
mod core;
mod log_utils;
mod options;
mod stepper;
mod utils;

use std::sync::{Arc, RwLock};

use chrono::{NaiveDateTime, Utc};

use crate::{
    core::{consts::*, control_loop::ControlLoop, error::Result as MountResult, mount::Mount},
    options::Options,
    stepper::{LogStepDriver, SimStepDriver, StepperAxis},
    utils::{io_utils::*, sexagesimal::*, timer::Timer},
};

fn panic_handler(
    panic_info:        &std::panic::PanicHookInfo,
    def_panic_handler: &(dyn Fn(&std::panic::PanicHookInfo<'_>) + 'static + Sync + Send),
) {
    let payload_str =
        if let Some(msg) = panic_info.payload().downcast_ref::<&'static str>() {
            Some(*msg)
        } else if let Some(msg) = panic_info.payload().downcast_ref::<String>() {
            Some(msg.as_str())
        } else {
            None
        };

    log::error!("PANIC OCCURRED");

    if let Some(payload) = &payload_str {
        log::error!("Panic payload: {}", payload);
    }

    if let Some(loc) = panic_info.location() {
        log::error!("Panic location: {}", loc);
    }

    log::error!(
        "Panic stacktrace: {}",
        std::backtrace::Backtrace::force_capture()
    );

    def_panic_handler(panic_info);
}

fn main() -> anyhow::Result<()> {
    let mut logs_dir = get_app_dir()?;
    logs_dir.push("logs");
    log_utils::cleanup_old_logs(&logs_dir, KEEP_LOGS_DAYS);
    log_utils::start_logger(&logs_dir)?;
    log::set_max_level(log::LevelFilter::Info);

    log::info!(
        "{} {} ver. {} is started",
        env!("CARGO_PKG_NAME"),
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION")
    );

    std::panic::set_hook({
        let default_panic_handler = std::panic::take_hook();
        Box::new(move |panic_info| {
            panic_handler(panic_info, default_panic_handler.as_ref())
        })
    });

    let mut options = Options::default();
    load_json_from_config_file(&mut options, "options")?;

    let driver = Box::new(LogStepDriver::new(SimStepDriver::new()));
    let mount = Mount::new(&options.mount, &options.site, driver)?;
    let mount = Arc::new(RwLock::new(mount));
    let options = Arc::new(RwLock::new(options));

    let _control_loop = ControlLoop::start(&mount);

    let timer = Timer::new();
    timer.exec_periodic(OPTIONS_AUTOSAVE_MS, {
        let mount = Arc::clone(&mount);
        let options = Arc::clone(&options);
        move || {
            let mut options = options.write().unwrap();
            let mount = mount.read().unwrap();
            options.site.latitude = mount.site_latitude();
            options.site.longitude = mount.site_longitude();
            drop(mount);
            if let Err(err) = save_json_to_config(&*options, "options") {
                log::error!("Can't save options: {}", err);
            }
        }
    });

    run_console(&mount, &options)?;

    let mut opts = options.write().unwrap();
    let mount = mount.read().unwrap();
    opts.site.latitude = mount.site_latitude();
    opts.site.longitude = mount.site_longitude();
    drop(mount);
    save_json_to_config(&*opts, "options")?;
    drop(opts);
    log::info!("Options saved");

    Ok(())
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn parse_angle(text: &str) -> Option<f64> {
    text.parse().ok().or_else(|| sexagesimal_to_value(text))
}

fn report(result: MountResult<()>) {
    match result {
        Ok(()) => println!("ok"),
        Err(err) => println!("error: {}", err),
    }
}

fn print_status(mount: &Mount) {
    let utc = now();
    let pos = mount.current_alt_az();
    let eq = mount.current_eq_coord(&utc);
    println!(
        "alt {}  az {}",
        value_to_sexagesimal(pos.alt, false, 6),
        value_to_sexagesimal(pos.az, false, 6),
    );
    println!(
        "ra {}  dec {}  lst {}",
        value_to_sexagesimal(eq.ra, false, 8),
        value_to_sexagesimal(eq.dec, false, 6),
        value_to_sexagesimal(mount.sidereal_time(&utc), false, 8),
    );
    println!(
        "site {:.6} {:.6}",
        mount.site_latitude(),
        mount.site_longitude(),
    );
    println!(
        "moving={} tracking={} parked={} at_park={} at_home={} connected={}",
        mount.is_moving(),
        mount.is_tracking(),
        mount.is_parked(),
        mount.is_at_park(),
        mount.is_at_home(),
        mount.is_connected(),
    );
}

fn print_help() {
    println!("commands:");
    println!("  status                  show position and state");
    println!("  slew <ra> <dec>         slew to equatorial target (hours, degrees)");
    println!("  altaz <alt> <az>        slew to horizontal direction (degrees)");
    println!("  target ra <v>           stage target right ascension");
    println!("  target dec <v>          stage target declination");
    println!("  goto                    slew to the staged target");
    println!("  stop                    halt motion");
    println!("  track on|off            enable/disable tracking");
    println!("  park | unpark           park / unpark");
    println!("  setpark <alt> <az>      set the park position");
    println!("  site <lat> <lon>        set the observing site");
    println!("  connect on|off          set the connected flag");
    println!("  sweep az|alt            run the axis calibration sweep");
    println!("  quit");
    println!("angles accept decimal degrees/hours or HH:MM:SS form");
}

fn run_console(
    mount:   &Arc<RwLock<Mount>>,
    options: &Arc<RwLock<Options>>,
) -> anyhow::Result<()> {
    print_help();
    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] =>
                continue,

            ["quit" | "exit"] =>
                break,

            ["help"] =>
                print_help(),

            ["status"] =>
                print_status(&mount.read().unwrap()),

            ["slew", ra, dec] => {
                let (Some(ra), Some(dec)) = (parse_angle(ra), parse_angle(dec)) else {
                    println!("error: can't parse coordinate");
                    continue;
                };
                report(mount.write().unwrap().slew_to_eq_coord(&now(), ra, dec));
            }

            ["altaz", alt, az] => {
                let (Some(alt), Some(az)) = (parse_angle(alt), parse_angle(az)) else {
                    println!("error: can't parse coordinate");
                    continue;
                };
                report(mount.write().unwrap().slew_to_alt_az(alt, az));
            }

            ["target", "ra", value] => {
                match parse_angle(value) {
                    Some(ra) => report(mount.write().unwrap().set_target_ra(ra)),
                    None => println!("error: can't parse value"),
                }
            }

            ["target", "dec", value] => {
                match parse_angle(value) {
                    Some(dec) => report(mount.write().unwrap().set_target_dec(dec)),
                    None => println!("error: can't parse value"),
                }
            }

            ["goto"] =>
                report(mount.write().unwrap().slew_to_target(&now())),

            ["stop"] => {
                mount.write().unwrap().halt();
                println!("ok");
            }

            ["track", state @ ("on" | "off")] => {
                mount.write().unwrap().set_tracking_enabled(*state == "on");
                println!("ok");
            }

            ["park"] =>
                report(mount.write().unwrap().park()),

            ["unpark"] => {
                mount.write().unwrap().unpark();
                println!("ok");
            }

            ["setpark", alt, az] => {
                let (Some(alt), Some(az)) = (parse_angle(alt), parse_angle(az)) else {
                    println!("error: can't parse coordinate");
                    continue;
                };
                report(mount.write().unwrap().set_park_position(alt, az));
            }

            ["site", lat, lon] => {
                let (Some(lat), Some(lon)) = (parse_angle(lat), parse_angle(lon)) else {
                    println!("error: can't parse coordinate");
                    continue;
                };
                let mut mount = mount.write().unwrap();
                let result = mount.set_site_latitude(lat)
                    .and_then(|_| mount.set_site_longitude(lon));
                drop(mount);
                if result.is_ok() {
                    let mut options = options.write().unwrap();
                    options.site.latitude = lat;
                    options.site.longitude = lon;
                }
                report(result);
            }

            ["connect", state @ ("on" | "off")] => {
                mount.write().unwrap().set_connected(*state == "on");
                println!("ok");
            }

            ["sweep", axis @ ("az" | "alt")] => {
                let axis = if *axis == "az" { StepperAxis::Azimuth } else { StepperAxis::Altitude };
                println!("sweeping, this blocks the control loop...");
                mount.write().unwrap().sweep_axis(
                    axis,
                    std::time::Duration::from_secs(3)
                );
                println!("ok");
            }

            _ =>
                println!("unknown command, try 'help'"),
        }
    }
    Ok(())
}
