use anyhow::{anyhow, bail, Context, Result};
use crabpreview::display::DisplayListener;
use crabpreview::negotiate::{clamp_to_preferred, select_optimal};
use crabpreview::testing::{SimulatedDriver, SimulatedSurface};
use crabpreview::{CommandWorker, DeviceId, Display, FlashMode, PreviewConfig, Size, UiEvent, UiMailbox};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    crabpreview::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabpreview-cli <negotiate|simulate|preview> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "negotiate" => cmd_negotiate(&args),
        "simulate" => cmd_simulate(&args),
        "preview" => cmd_preview(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn parse_size(text: &str) -> Result<Size> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {:?}", text))?;
    Ok(Size::new(
        w.parse().with_context(|| format!("bad width in {:?}", text))?,
        h.parse().with_context(|| format!("bad height in {:?}", text))?,
    ))
}

fn load_config(path: Option<PathBuf>) -> Result<PreviewConfig> {
    let config = match path {
        Some(path) => PreviewConfig::load_from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PreviewConfig::load_or_default(),
    };
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

fn cmd_negotiate(args: &[String]) -> Result<()> {
    // negotiate <target> <candidate>... [--preferred WxH] [--json]
    let mut target = None;
    let mut preferred = None;
    let mut candidates = Vec::new();
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--preferred" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--preferred needs a size"))?;
                preferred = Some(parse_size(value)?);
            }
            "--json" => json = true,
            other => {
                let size = parse_size(other)?;
                if target.is_none() {
                    target = Some(size);
                } else {
                    candidates.push(size);
                }
            }
        }
        i += 1;
    }

    let requested = target.ok_or_else(|| anyhow!("target size required"))?;
    if candidates.is_empty() {
        bail!("at least one candidate size required");
    }
    let target = match preferred {
        Some(preferred) => clamp_to_preferred(requested, preferred),
        None => requested,
    };
    let chosen = select_optimal(&candidates, target);

    if json {
        println!(
            "{}",
            serde_json::json!({ "requested": requested, "target": target, "chosen": chosen })
        );
    } else {
        println!("{} (target {})", chosen, target);
    }
    Ok(())
}

#[derive(Default)]
struct PrintListener {
    json: bool,
}

impl PrintListener {
    fn print(&self, event: UiEvent, text: String) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Failed to encode event: {}", e),
            }
        } else {
            println!("{}", text);
        }
    }
}

impl DisplayListener for PrintListener {
    fn on_preview_size_negotiated(&mut self, width: u32, height: u32) {
        let size = Size::new(width, height);
        self.print(UiEvent::PreviewSizeNegotiated(size), format!("preview size {}", size));
    }

    fn on_flash_state_changed(&mut self, mode: FlashMode) {
        self.print(
            UiEvent::FlashStateChanged(mode),
            format!("flash {:?} (icon {:?})", mode, mode.icon()),
        );
    }

    fn on_facing_changed(&mut self, id: DeviceId) {
        self.print(UiEvent::FacingChanged(id), format!("facing {}", id));
    }
}

struct RunOptions {
    size: Option<Size>,
    config: Option<PathBuf>,
    json: bool,
    steps: Vec<String>,
}

fn parse_run_options(args: &[String]) -> Result<RunOptions> {
    let mut options = RunOptions {
        size: None,
        config: None,
        json: false,
        steps: Vec::new(),
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--size needs a value"))?;
                options.size = Some(parse_size(value)?);
            }
            "--config" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--config needs a path"))?;
                options.config = Some(PathBuf::from(value));
            }
            "--json" => options.json = true,
            step => options.steps.push(step.to_string()),
        }
        i += 1;
    }
    Ok(options)
}

fn spawn_simulated(config: PreviewConfig) -> Result<(CommandWorker, Arc<UiMailbox>, crabpreview::UiReceiver)> {
    let (mailbox, receiver) = UiMailbox::new(Some(SimulatedSurface::new()));
    let display: Arc<dyn Display> = mailbox.clone();
    let worker = CommandWorker::builder(Box::new(SimulatedDriver::new()))
        .display(&display)
        .config(config)
        .spawn()?;
    Ok((worker, mailbox, receiver))
}

fn cmd_simulate(args: &[String]) -> Result<()> {
    // simulate [--size WxH] [--config path] [--json] [toggle-camera|toggle-flash|record|stop-record|stop|zoom=N]...
    let options = parse_run_options(args)?;
    let config = load_config(options.config)?;
    let size = options.size.unwrap_or_else(|| config.preview.default_size());
    let (worker, _mailbox, receiver) = spawn_simulated(config)?;
    let camera = worker.handle();
    let mut listener = PrintListener { json: options.json };

    camera.start_preview(size.width, size.height)?;
    for step in &options.steps {
        match step.as_str() {
            "toggle-camera" => camera.toggle_camera()?,
            "toggle-flash" => camera.toggle_flash()?,
            "record" => camera.recording_started()?,
            "stop-record" => camera.recording_stopped()?,
            "stop" => camera.stop_preview()?,
            "restart" => camera.restart()?,
            other => match other.strip_prefix("zoom=") {
                Some(level) => {
                    let level = level.parse().with_context(|| format!("bad zoom level {:?}", level))?;
                    let generation = camera.snapshot()?.generation;
                    camera.submit(crabpreview::Command::SetZoom { generation, level })?;
                }
                None => bail!("unknown step {:?}", other),
            },
        }
    }

    // a camera switch queues its restart behind the first query
    camera.snapshot()?;
    let snapshot = camera.snapshot()?;
    receiver.drain_into(&mut listener);
    if options.json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("state {:?} on {:?}, flash {:?}", snapshot.state, snapshot.open_device, snapshot.flash);
        if let Some(params) = &snapshot.parameters {
            println!(
                "preview {} picture {} rotation {} zoom {}",
                params.preview_size, params.picture_size, params.display_rotation, params.zoom
            );
        }
    }

    worker.shutdown()?;
    Ok(())
}

fn cmd_preview(args: &[String]) -> Result<()> {
    // preview [--size WxH] [--config path] [--json]
    let options = parse_run_options(args)?;
    let config = load_config(options.config)?;
    let size = options.size.unwrap_or_else(|| config.preview.default_size());
    let (worker, _mailbox, receiver) = spawn_simulated(config)?;
    let camera = worker.handle();
    let mut listener = PrintListener { json: options.json };

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    camera.start_preview(size.width, size.height)?;
    eprintln!("Previewing on the simulated camera, Ctrl-C to stop");
    while running.load(Ordering::SeqCst) {
        if let Some(event) = receiver.recv_timeout(Duration::from_millis(100)) {
            event.dispatch(&mut listener);
        }
    }

    eprintln!("Stopping preview");
    camera.stop_preview()?;
    worker.shutdown()?;
    receiver.drain_into(&mut listener);
    Ok(())
}
