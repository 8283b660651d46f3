// Evseat CLI
// Runs a seat over the kernel input devices and logs the normalized events

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "pure-rust")]
use anyhow::{bail, Context};
#[cfg(feature = "pure-rust")]
use clap::Parser;

#[cfg(feature = "pure-rust")]
use evseat_core::settings::parse_stage_size;
#[cfg(feature = "pure-rust")]
use evseat_core::{
    EvdevBackend, EvdevOptions, Event, EventKind, EventSource, MonotonicClock, Seat, Settings,
    StageQueue, StageSize,
};

/// Longest single wait, so shutdown requests are noticed
#[cfg(feature = "pure-rust")]
const MAX_POLL_TIMEOUT_MS: i32 = 100;

/// Stage used when neither the settings nor --stage give one
#[cfg(feature = "pure-rust")]
const DEFAULT_STAGE: StageSize = StageSize {
    width: 1920.0,
    height: 1080.0,
};

/// Native input seat for Wayland compositors
#[cfg(feature = "pure-rust")]
#[derive(Parser, Debug)]
#[command(name = "evseat")]
#[command(author = "evseat contributors")]
#[command(version)]
#[command(about = "Native input seat: kernel devices in, compositor events out", long_about = None)]
struct Args {
    /// TOML settings file (default: ~/.config/evseat/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Only use these devices, by name or node path (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Stage size as WIDTHxHEIGHT, overriding the settings
    #[arg(long, value_name = "WxH")]
    stage: Option<String>,

    /// Take exclusive access to the devices
    #[arg(short, long)]
    grab: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,

    /// List available input devices
    #[arg(long)]
    list_devices: bool,
}

/// Main application state
#[cfg(feature = "pure-rust")]
struct Application {
    settings: Settings,
    args: Args,
    /// Flag to signal the event loop to stop
    running: Arc<AtomicBool>,
}

#[cfg(feature = "pure-rust")]
impl Application {
    fn new(args: Args) -> anyhow::Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::load_default().context("loading default settings")?,
        };

        if let Some(stage) = &args.stage {
            settings.set_stage(parse_stage_size(stage)?);
        } else if settings.stage().is_none() {
            log::info!(
                "no stage configured, using {}x{}",
                DEFAULT_STAGE.width,
                DEFAULT_STAGE.height
            );
            settings.set_stage(DEFAULT_STAGE);
        }

        Ok(Self {
            settings,
            args,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Print the effective settings
    fn validate(&self) -> anyhow::Result<()> {
        let repeat = self.settings.repeat();
        let kbd = self.settings.kbd_a11y();
        let ptr = self.settings.pointer_a11y();

        println!("Settings OK");
        if let Some(path) = self.settings.source_path() {
            println!("  file: {}", path.display());
        }
        println!("  seat: {}", self.settings.seat_name());
        if let Some(stage) = self.settings.stage() {
            println!("  stage: {}x{}", stage.width, stage.height);
        }
        println!(
            "  repeat: {} (delay {}ms, interval {}ms)",
            repeat.enabled, repeat.delay_ms, repeat.interval_ms
        );
        println!(
            "  keyboard a11y: {} (slow keys {}ms, bounce keys {}ms)",
            kbd.controls, kbd.slowkeys_delay, kbd.debounce_delay
        );
        println!(
            "  pointer a11y: secondary click {}, dwell {} ({} / {})",
            ptr.secondary_click_enabled, ptr.dwell_enabled, ptr.dwell_mode, ptr.dwell_click_type
        );
        Ok(())
    }

    /// List available input devices
    fn list_devices() -> anyhow::Result<()> {
        let devices = EvdevBackend::list_devices().context("enumerating input devices")?;
        println!("Found {} input device(s):", devices.len());
        for device in &devices {
            match &device.path {
                Some(path) => println!(
                    "  {}: {} [{}] ({})",
                    device.index, device.name, device.device_type, path
                ),
                None => println!("  {}: {} [{}]", device.index, device.name, device.device_type),
            }
        }
        Ok(())
    }

    fn install_signal_handler(&self) {
        use signal_hook::iterator::Signals;
        let running = self.running.clone();

        std::thread::spawn(move || {
            if let Ok(mut signals) =
                Signals::new([signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM])
            {
                if let Some(signal) = signals.forever().next() {
                    log::info!("received signal {}, shutting down", signal);
                    running.store(false, Ordering::SeqCst);
                }
            }
        });
    }

    /// Run the main event loop
    fn run(&self) -> anyhow::Result<()> {
        self.install_signal_handler();

        let clock = MonotonicClock::new();
        let options = EvdevOptions {
            filter: self.args.devices.clone(),
            grab: self.args.grab,
            hotplug: true,
        };
        let backend =
            EvdevBackend::new(options, clock.clone()).context("opening input devices")?;
        if backend.device_count() == 0 && !self.args.devices.is_empty() {
            bail!("no device matched {:?}", self.args.devices);
        }
        log::info!("reading {} device(s)", backend.device_count());

        let queue = StageQueue::new();
        let seat = Seat::new(self.settings.seat_config());
        let mut source = EventSource::new(seat, backend, queue.clone(), clock);

        while self.running.load(Ordering::SeqCst) {
            let prepare = source.prepare();
            let timeout = if prepare.ready {
                0
            } else {
                prepare
                    .timeout_ms
                    .map_or(MAX_POLL_TIMEOUT_MS, |ms| ms.min(MAX_POLL_TIMEOUT_MS))
            };

            let readable = source.wait(timeout).context("waiting for input")?;
            if source.check(readable) {
                while source.dispatch().context("dispatching input")? {}
            }

            for event in queue.drain() {
                log_event(&event);
            }
            for notification in source.seat_mut().take_notifications() {
                log::debug!("notification {}: {:?}", notification.name(), notification);
            }
        }

        log::info!("stopped");
        Ok(())
    }
}

#[cfg(feature = "pure-rust")]
fn log_event(event: &Event) {
    match event.kind {
        EventKind::Motion { .. } | EventKind::Touch { .. } => log::debug!(
            "{:>12} {:<18} dev {} src {} mods {} {:?}",
            event.time_us,
            event.name(),
            event.device,
            event.source_device,
            event.modifiers,
            event.kind
        ),
        _ => log::info!(
            "{:>12} {:<18} dev {} src {} mods {} {:?}",
            event.time_us,
            event.name(),
            event.device,
            event.source_device,
            event.modifiers,
            event.kind
        ),
    }
}

#[cfg(feature = "pure-rust")]
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

#[cfg(feature = "pure-rust")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_devices {
        return Application::list_devices();
    }

    let app = Application::new(args)?;
    if app.args.check_config {
        return app.validate();
    }

    app.run()
}

// Stub for when pure-rust feature is not enabled
#[cfg(not(feature = "pure-rust"))]
fn main() {
    eprintln!("Error: evseat binary requires the 'pure-rust' feature to be enabled.");
    eprintln!("Please build with: cargo build --release --features pure-rust --bin evseat");
    std::process::exit(1);
}
