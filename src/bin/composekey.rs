// Composekey CLI
// Grabs the keyboards and runs the compose engine between them and a virtual keyboard

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;

use composekey_core::output::open_clipboard;
use composekey_core::window::{connect_first, default_sources};
use composekey_core::{
    Composer, ComposerSettings, DeviceFilter, EvdevIndicator, EventLoop, FocusSource,
    IndicatorSynchronizer, KeyboardLayout, SequenceTable, TableLayout, UsageStats,
    VirtualKeyboard, WindowTracker,
};

/// Compose key for Linux
#[derive(Parser, Debug)]
#[command(name = "composekey")]
#[command(version)]
#[command(about = "Compose key input method for Linux", long_about = None)]
struct Args {
    /// TOML settings file (default: ~/.config/composekey/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Only grab these devices, by path or name (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and sequence files, then exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,

    /// Print every known compose sequence
    #[arg(long)]
    list_sequences: bool,
}

/// Everything loaded before any device is touched
struct Application {
    args: Args,
    settings: ComposerSettings,
    table: SequenceTable,
    layout: TableLayout,
    running: Arc<AtomicBool>,
}

impl Application {
    fn load(args: Args) -> Result<Self> {
        let settings = match &args.config {
            Some(path) => ComposerSettings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => ComposerSettings::load_default().context("Failed to load settings")?,
        };
        match &settings.source_path {
            Some(path) => log::info!("Loaded settings from {}", path.display()),
            None => log::info!("No settings file, using defaults"),
        }

        let layout = settings.build_layout();
        settings.validate(&layout).context("Invalid settings")?;
        let table = settings
            .load_sequences()
            .context("Failed to load compose sequences")?;
        log::info!("{} compose sequences available", table.len());

        Ok(Self {
            args,
            settings,
            table,
            layout,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn check_config(&self) {
        let keys: Vec<String> = self
            .settings
            .compose_keys
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("Configuration is valid");
        println!("  Compose keys: {}", keys.join(", "));
        println!("  AltGr layout: {}", self.layout.has_altgr());
        println!("  Sequences: {}", self.table.len());
        match self.settings.reset_delay() {
            Some(delay) => println!("  Reset delay: {} ms", delay.as_millis()),
            None => println!("  Reset delay: disabled"),
        }
    }

    fn list_sequences(&self) {
        for (sequence, entry) in self.table.iter() {
            match &entry.description {
                Some(description) => {
                    println!("♦ {}\t{}\t{}", sequence, entry.result, description)
                }
                None => println!("♦ {}\t{}", sequence, entry.result),
            }
        }
    }

    fn list_devices() -> Result<()> {
        let devices = EventLoop::list_devices().context("Error finding keyboard devices")?;
        println!("Found {} keyboard device(s):", devices.len());
        for device in &devices {
            let leds = if device.has_leds { " [LEDs]" } else { "" };
            println!(
                "  {}: {} ({}){}",
                device.index,
                device.name,
                device.path.display(),
                leds
            );
        }
        Ok(())
    }

    fn spawn_signal_handler(&self) {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let running = self.running.clone();
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                log::warn!("Cannot install signal handler: {}", e);
                return;
            }
        };
        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::info!("Received signal {}, shutting down", signal);
                running.store(false, Ordering::SeqCst);
            }
        });
    }

    fn run(self) -> Result<()> {
        self.spawn_signal_handler();

        let filter = DeviceFilter::new(self.args.devices.iter().cloned());
        let mut event_loop =
            EventLoop::new_with_grab(&filter).context("Failed to grab keyboards")?;
        log::info!("Grabbed {} keyboard(s)", event_loop.device_count());

        let mut virtual_keyboard =
            VirtualKeyboard::new().context("Failed to create virtual keyboard")?;
        if self.settings.beep_on_invalid {
            let bells = virtual_keyboard.add_system_bells();
            log::info!("Found {} bell device(s)", bells);
        }
        let keyboard = Arc::new(Mutex::new(virtual_keyboard));

        let mut indicator = IndicatorSynchronizer::new();
        for path in event_loop.device_paths() {
            match EvdevIndicator::open(&path) {
                Ok(device) => indicator.add_device(device),
                Err(e) => log::debug!("No LEDs for {}: {}", path.display(), e),
            }
        }
        let indicator = Arc::new(Mutex::new(indicator));

        let stats = Arc::new(Mutex::new(UsageStats::new()));
        let tracker = WindowTracker::new(self.settings.build_classifier()?);
        // Runs in the background for the lifetime of the display connection
        let focus = connect_first(default_sources(&tracker));
        let clipboard = open_clipboard(self.settings.output.clipboard);

        let composer = Composer::new(self.settings, self.table, keyboard.clone())
            .with_layout(self.layout)
            .with_window(tracker)
            .with_clipboard_boxed(clipboard)
            .with_stats(stats.clone());

        let observed = indicator.clone();
        composer.on_state_changed(move |change| {
            observed.lock().sync(change);
        });
        let initial = composer.snapshot();
        indicator.lock().force_sync(&initial);

        log::info!("composekey is running. Press Ctrl+C to exit.");
        let result = Self::main_loop(
            &self.running,
            &mut event_loop,
            &composer,
            &keyboard,
            &indicator,
        );

        if let Some(source) = &focus {
            log::debug!("{} focus source connected: {}", source.name(), source.is_connected());
        }
        event_loop.ungrab_all();
        if let Err(e) = keyboard.lock().release_all() {
            log::warn!("Failed to release keys: {}", e);
        }

        let stats = stats.lock();
        for (sequence, count) in stats.top_sequences(5) {
            log::info!("Used ♦ {} {} time(s)", sequence, count);
        }
        result
    }

    fn main_loop(
        running: &AtomicBool,
        event_loop: &mut EventLoop,
        composer: &Composer,
        keyboard: &Mutex<VirtualKeyboard>,
        indicator: &Mutex<IndicatorSynchronizer>,
    ) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            let events = event_loop
                .poll_for_events(100)
                .context("Failed to read keyboard events")?;

            for polled in events {
                let event = polled.event;
                // The composer locks the keyboard itself; never hold it across this call
                let swallowed = composer.process_event(event);
                if !swallowed {
                    if let Err(e) = keyboard.lock().forward(event.code, event.action) {
                        log::warn!("Failed to forward {}: {}", event.code, e);
                    }
                }

                if event.code.is_lock() && event.is_down() {
                    let change = composer.snapshot();
                    indicator.lock().sync(&change);
                }
            }
        }
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_devices {
        return Application::list_devices();
    }

    let app = Application::load(args)?;

    if app.args.check_config {
        app.check_config();
        return Ok(());
    }
    if app.args.list_sequences {
        app.list_sequences();
        return Ok(());
    }

    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["composekey", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.devices.is_empty());
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.list_devices);
        assert!(!args.list_sequences);
    }

    #[test]
    fn test_args_with_devices() {
        let args = Args::parse_from([
            "composekey",
            "--verbose",
            "--devices",
            "/dev/input/event0",
            "-d",
            "AT Translated Set 2 keyboard",
        ]);

        assert!(args.verbose);
        assert_eq!(
            args.devices,
            vec!["/dev/input/event0", "AT Translated Set 2 keyboard"]
        );
    }

    #[test]
    fn test_args_info_flags() {
        let args = Args::parse_from(["composekey", "--check-config", "--list-sequences"]);
        assert!(args.check_config);
        assert!(args.list_sequences);
        assert!(Args::parse_from(["composekey", "--list-devices"]).list_devices);
    }
}
