//! mdread main entry point
//!
//! The main loop monitors three sources:
//! 1. stdin (user keyboard input) - mapped to reader commands
//! 2. the speech backend - completion events pumped into the controller
//! 3. Signals (SIGWINCH for resize) - updates the layout
//!
//! The poll timeout is bounded by the controller's settle delay so the next
//! paragraph starts on time even with no input.

use anyhow::{bail, Context};
use log::{debug, error, info, warn};
use mdread::document::store::{DocumentStore, DEFAULT_CONTENT};
use mdread::input::{create_default_keymap, split_keys, DefaultKeyHandler, HandlerAction, KeyHandler};
use mdread::platform::is_wsl;
use mdread::playback::PlaybackController;
use mdread::speech::create_resource;
use mdread::state::config::Config;
use mdread::state::Reader;
use mdread::terminal::{get_terminal_size, RawModeGuard};
use mdread::view;
use mio::{Events, Interest, Poll, Token};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use std::io::{self, IsTerminal, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Token for stdin in mio poll
const STDIN: Token = Token(0);

/// Upper bound on the poll timeout; backend events are polled this often
const TICK: Duration = Duration::from_millis(100);

/// Global flag set by SIGWINCH handler
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

/// SIGWINCH handler - sets flag when terminal is resized
extern "C" fn handle_sigwinch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::Relaxed);
}

const USAGE: &str = "Usage: mdread [--debug] [--list-voices] [--play] [FILE]";

#[derive(Debug, Default)]
struct Options {
    debug: bool,
    list_voices: bool,
    play: bool,
    path: Option<PathBuf>,
}

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<Options> {
    let mut options = Options::default();
    for arg in args {
        match arg.as_str() {
            "--debug" | "-d" => options.debug = true,
            "--list-voices" => options.list_voices = true,
            "--play" => options.play = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", mdread::APP_NAME, mdread::VERSION);
                process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown option {}\n{}", flag, USAGE),
            path => {
                if options.path.is_some() {
                    bail!("only one file can be read at a time\n{}", USAGE);
                }
                options.path = Some(PathBuf::from(path));
            }
        }
    }
    Ok(options)
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to mdread.log, stdout belongs to the UI
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("mdread.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open mdread.log for debug logging: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "mdread version {} starting (debug mode, logging to mdread.log)",
            mdread::VERSION
        );
    } else {
        // Normal mode: minimal logging to stderr, only errors
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("mdread: {}", e);
            process::exit(2);
        }
    };

    init_logging(options.debug);

    if let Err(e) = run(options) {
        error!("Fatal error: {:#}", e);
        eprintln!("mdread: {:#}", e);
        process::exit(1);
    }
}

fn run(options: Options) -> anyhow::Result<()> {
    debug!("Initializing mdread");

    let config = Config::load().context("Failed to load configuration")?;
    info!("Configuration loaded from {:?}", config.path());

    // A missing backend is not fatal: the reader still shows the document
    let resource = match create_resource(config.backend()) {
        Ok(resource) => Some(resource),
        Err(e) => {
            warn!("{}", e);
            None
        }
    };
    let controller = PlaybackController::new(resource, config.speech_settings());

    if options.list_voices {
        return list_voices(controller);
    }

    let store = match DocumentStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Document will not be persisted: {}", e);
            None
        }
    };
    let restore_last = config.restore_last();
    let mut reader = Reader::new(config, controller, store);

    match &options.path {
        Some(path) => reader
            .open_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None if restore_last => reader.restore().context("Failed to restore document")?,
        None => reader
            .load_text(DEFAULT_CONTENT, None)
            .context("Failed to load document")?,
    }

    if options.play {
        return play_through(&mut reader);
    }

    // Verify stdin is a TTY; keys are read one at a time in raw mode
    if !io::stdin().is_terminal() {
        bail!("mdread requires an interactive terminal (stdin is not a TTY); use --play without one");
    }

    interactive(&mut reader)
}

/// Print the voice catalog, waiting briefly for late voice lists
fn list_voices(mut controller: PlaybackController) -> anyhow::Result<()> {
    if !controller.is_available() {
        bail!("no speech backend available");
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    while controller.catalog().is_empty() && Instant::now() < deadline {
        controller.pump(Instant::now())?;
        thread::sleep(Duration::from_millis(50));
    }

    println!(
        "{} voices ({} backend)",
        controller.catalog().voices().len(),
        controller.backend_name().unwrap_or("?")
    );
    let selected = controller.catalog().selected().cloned();
    for voice in controller.catalog().voices() {
        let marker = if Some(voice) == selected.as_ref() { '*' } else { ' ' };
        println!("{} {}  [{}]", marker, view::voice_label(voice), voice.id);
    }
    Ok(())
}

/// Read the whole document once and exit
fn play_through(reader: &mut Reader) -> anyhow::Result<()> {
    if !reader.controller.is_available() {
        bail!("no speech backend available");
    }

    reader.controller.play_all(Some(0))?;
    let mut announced = None;

    while !reader.controller.state().is_idle() {
        let now = Instant::now();
        reader.controller.pump(now)?;

        let speaking = reader.controller.speaking_index();
        if speaking.is_some() && speaking != announced {
            if let Some(paragraph) = speaking.and_then(|i| reader.controller.paragraphs().get(i)) {
                println!("[{}] {}", paragraph.index + 1, paragraph.text);
            }
            announced = speaking;
        }

        let wait = reader
            .controller
            .time_until_next(now)
            .map_or(Duration::from_millis(50), |d| d.min(Duration::from_millis(50)));
        thread::sleep(wait);
    }
    Ok(())
}

fn interactive(reader: &mut Reader) -> anyhow::Result<()> {
    let stdin_fd = io::stdin().as_raw_fd();

    // Raw mode lets single keystrokes through, including Ctrl+C
    let _guard = RawModeGuard::enable().context("Failed to enter raw mode")?;

    let mut size = get_terminal_size(stdin_fd);
    info!("Terminal size: {}x{}", size.0, size.1);

    // Set up signal handler for window resize
    unsafe {
        signal::signal(Signal::SIGWINCH, SigHandler::Handler(handle_sigwinch))
            .context("Failed to set SIGWINCH handler")?;
    }

    let keymap = create_default_keymap();
    info!("Key handler initialized with {} bindings", keymap.len());
    let mut handler = DefaultKeyHandler::new(keymap);

    // WSL doesn't support epoll on TTY file descriptors, so use select() instead
    let use_select = is_wsl();
    let mut mio_poll = if !use_select {
        debug!("Using mio::Poll for event loop");
        let poll = Poll::new()?;
        let mut stdin_source = mio::unix::SourceFd(&stdin_fd);
        poll.registry()
            .register(&mut stdin_source, STDIN, Interest::READABLE)?;
        Some((poll, Events::with_capacity(16)))
    } else {
        debug!("Using select() for event loop (WSL mode)");
        None
    };

    let title = match reader.source() {
        Some(path) => format!("{}: {}", mdread::APP_NAME, path.display()),
        None => mdread::APP_NAME.to_string(),
    };
    let mut message: Option<String> = reader
        .controller
        .take_notice()
        .map(|e| format!("{} (press ? for keys)", e))
        .or_else(|| Some("press ? for keys".to_string()));
    let mut top = 0;
    let mut last_frame = String::new();
    let mut last_speaking = None;
    let mut stdout = io::stdout();

    info!("mdread ready - entering event loop");

    loop {
        if RESIZE_PENDING.swap(false, Ordering::Relaxed) {
            size = get_terminal_size(stdin_fd);
            info!("Terminal resized to {}x{}", size.0, size.1);
        }

        let now = Instant::now();
        if let Err(e) = reader.controller.pump(now) {
            warn!("Playback error: {}", e);
            message = Some(e.to_string());
        }

        match reader.reload_if_changed() {
            Ok(true) => message = Some("file changed, reloaded".to_string()),
            Ok(false) => {}
            Err(e) => {
                warn!("Reload failed: {}", e);
                message = Some(e.to_string());
            }
        }

        // Focus follows the voice when it moves on
        let speaking = reader.controller.speaking_index();
        if speaking != last_speaking {
            reader.follow_playback();
            last_speaking = speaking;
        }

        let height = (size.1 as usize).saturating_sub(5);
        top = view::scroll_top(reader.cursor(), top, height);
        let frame = view::frame(
            &reader.controller,
            &title,
            reader.cursor(),
            top,
            size,
            message.as_deref(),
        );
        if frame != last_frame {
            stdout.write_all(frame.as_bytes())?;
            stdout.flush()?;
            last_frame = frame;
        }

        let timeout = reader
            .controller
            .time_until_next(Instant::now())
            .map_or(TICK, |d| d.min(TICK));

        let readable = if let Some((ref mut poll, ref mut events)) = mio_poll {
            match poll.poll(events, Some(timeout)) {
                Ok(()) => events.iter().any(|event| event.token() == STDIN),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => false,
                Err(e) => return Err(e.into()),
            }
        } else {
            select_stdin(stdin_fd, timeout)?
        };

        if !readable {
            continue;
        }

        let mut buf = [0u8; 1024];
        let n = io::stdin().read(&mut buf)?;
        if n == 0 {
            info!("stdin closed");
            break;
        }

        for key in split_keys(&buf[..n]) {
            match handler.process(key, reader) {
                Ok(HandlerAction::Quit) => break,
                Ok(HandlerAction::Handled) => {
                    if let Some(text) = reader.take_message() {
                        message = Some(text);
                    }
                }
                Ok(HandlerAction::Ignored) => {}
                Err(e) => {
                    warn!("Command failed: {}", e);
                    message = Some(e.to_string());
                }
            }
        }

        if reader.quit {
            break;
        }
    }

    reader.controller.shutdown();
    stdout.write_all(b"\x1b[H\x1b[2J")?;
    stdout.flush()?;
    info!("mdread exiting");
    Ok(())
}

/// Wait for stdin with select(); returns true when it is readable
fn select_stdin(stdin_fd: RawFd, timeout: Duration) -> anyhow::Result<bool> {
    use nix::sys::select::{select, FdSet};
    use nix::sys::time::{TimeVal, TimeValLike};
    use std::os::unix::io::BorrowedFd;

    let stdin_borrowed = unsafe { BorrowedFd::borrow_raw(stdin_fd) };
    let mut read_fds = FdSet::new();
    read_fds.insert(stdin_borrowed);
    let mut timeout = TimeVal::milliseconds(timeout.as_millis() as i64);

    match select(None, Some(&mut read_fds), None, None, Some(&mut timeout)) {
        Ok(_) => Ok(read_fds.contains(stdin_borrowed)),
        Err(nix::errno::Errno::EINTR) => {
            debug!("select() interrupted by signal");
            Ok(false)
        }
        Err(e) => Err(io::Error::from(e)).context("select() failed"),
    }
}
