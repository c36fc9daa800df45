use std::io::Write;
use std::path::PathBuf;
use std::thread;

use clap::Parser;
use stageshow_core::{
    enumerate_audio_devices, ConfigManager, CueConsole, CueScheduler, HeadlessRenderer,
    RodioEngine, SchedulerSettings, ShellLauncher, ShowManager,
};
use tokio::sync::mpsc;

mod terminal;

/// Cue player for live events with pre-waits, post-waits and auto-follow.
#[derive(Parser, Debug)]
#[command(name = "stageshow")]
#[command(about = "Stageshow cue player")]
struct Args {
    /// Show file to open
    show: Option<PathBuf>,

    /// Configuration file (default: config.json in the working directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image shown whenever no visual cue is on screen
    #[arg(long)]
    fallback_image: Option<PathBuf>,

    /// Audio output device name
    #[arg(long)]
    audio_device: Option<String>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Save the show after every edit
    #[arg(long)]
    autosave: bool,
}

fn main() -> Result<(), anyhow::Error> {
    // Raw mode needs explicit carriage returns.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            write!(
                buf,
                "[{} {}] {}\r\n",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    if args.list_devices {
        let devices = enumerate_audio_devices().map_err(anyhow::Error::msg)?;
        for device in devices {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{}", device.name, marker);
        }
        return Ok(());
    }

    let mut config = ConfigManager::new(args.config.clone());
    let mut settings = config.load()?;
    log::info!("Loaded configuration from {}", config.config_path().display());

    if let Some(image) = args.fallback_image {
        settings.fallback_image = Some(image);
    }
    if let Some(device) = args.audio_device {
        settings.audio_device = device;
    }
    if args.autosave {
        settings.enable_autosave = true;
    }

    let engine = RodioEngine::new(&settings.audio_device)?;
    let scheduler = CueScheduler::new(
        engine,
        HeadlessRenderer::new(),
        ShellLauncher::new(settings.shell.clone()),
        SchedulerSettings::from(&settings),
    );
    let shows = ShowManager::new(settings.shows_directory.clone())?;
    let mut console = CueConsole::new(scheduler, settings, shows);

    if let Some(path) = &args.show {
        console.load_show(path)?;
    }

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    terminal::enable()?;
    terminal::spawn_keyboard(command_tx);
    let printer = thread::spawn(move || terminal::print_events(event_rx));

    // The audio output stream is not Send, so the console runs on this thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(console.run(command_rx, event_tx));

    if printer.join().is_err() {
        log::warn!("Event printer panicked");
    }
    terminal::disable();
    result
}
