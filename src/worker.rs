//! Command worker: the single thread that owns the capture session.
//!
//! Callers hold a cloneable [`CameraHandle`] and submit [`Command`]s; the
//! worker executes them one at a time in submission order. UI notifications
//! leave the worker only after the transition that produced them committed,
//! and only while the display is still alive.

use crate::config::PreviewConfig;
use crate::device::{CameraDriver, OrientationOracle, SensorOrientation};
use crate::display::{Display, DisplayLink, Outbox, UiEvent};
use crate::errors::{PreviewError, StreamError, WorkerError};
use crate::facing::FacingSelector;
use crate::flash::FlashState;
use crate::session::{CaptureSession, SessionState};
use crate::types::{CaptureParameters, DeviceId, FlashMode, Size};
use crate::zoom::{ZoomControl, ZoomTarget};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Work items accepted by the camera worker
#[derive(Debug)]
pub enum Command {
    StartPreview(Size),
    StopPreview,
    ToggleCamera,
    ToggleFlash,
    RecordingStarted,
    RecordingStopped,
    SetZoom { generation: u64, level: u32 },
    /// Stop, then start again with the last requested size
    Restart,
    Snapshot(Sender<SessionSnapshot>),
    Shutdown,
}

/// Point-in-time view of the worker state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Device the next start will open
    pub selected: DeviceId,
    /// Device currently held, if any
    pub open_device: Option<DeviceId>,
    pub flash: FlashMode,
    pub parameters: Option<CaptureParameters>,
    pub generation: u64,
}

/// Cloneable submission endpoint for the camera worker
#[derive(Debug, Clone)]
pub struct CameraHandle {
    sender: Sender<Command>,
    query_timeout: Duration,
}

impl CameraHandle {
    /// Enqueue a command. Fails only once the worker has exited.
    pub fn submit(&self, command: Command) -> Result<(), WorkerError> {
        self.sender.send(command).map_err(|_| WorkerError::Closed)
    }

    pub fn start_preview(&self, width: u32, height: u32) -> Result<(), WorkerError> {
        self.submit(Command::StartPreview(Size::new(width, height)))
    }

    pub fn stop_preview(&self) -> Result<(), WorkerError> {
        self.submit(Command::StopPreview)
    }

    pub fn toggle_camera(&self) -> Result<(), WorkerError> {
        self.submit(Command::ToggleCamera)
    }

    pub fn toggle_flash(&self) -> Result<(), WorkerError> {
        self.submit(Command::ToggleFlash)
    }

    pub fn recording_started(&self) -> Result<(), WorkerError> {
        self.submit(Command::RecordingStarted)
    }

    pub fn recording_stopped(&self) -> Result<(), WorkerError> {
        self.submit(Command::RecordingStopped)
    }

    /// Zoom the device described by `target`. Ignored if it was closed since.
    pub fn set_zoom(&self, target: &ZoomTarget, level: u32) -> Result<(), WorkerError> {
        self.submit(Command::SetZoom {
            generation: target.generation,
            level,
        })
    }

    pub fn restart(&self) -> Result<(), WorkerError> {
        self.submit(Command::Restart)
    }

    /// Query the worker state. Answered after every earlier command ran.
    pub fn snapshot(&self) -> Result<SessionSnapshot, WorkerError> {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.submit(Command::Snapshot(reply))?;
        match response.recv_timeout(self.query_timeout) {
            Ok(snapshot) => Ok(snapshot),
            Err(RecvTimeoutError::Timeout) => Err(WorkerError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Closed),
        }
    }
}

/// Collaborators and settings for a worker about to be spawned
pub struct WorkerBuilder {
    driver: Box<dyn CameraDriver>,
    display: DisplayLink,
    oracle: Box<dyn OrientationOracle>,
    zoom: Option<Box<dyn ZoomControl>>,
    config: PreviewConfig,
}

impl WorkerBuilder {
    pub fn display(mut self, display: &Arc<dyn Display>) -> Self {
        self.display = DisplayLink::new(display);
        self
    }

    pub fn orientation(mut self, oracle: Box<dyn OrientationOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn zoom(mut self, zoom: Box<dyn ZoomControl>) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn config(mut self, config: PreviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the worker thread and wait until it accepts commands.
    pub fn spawn(self) -> Result<CommandWorker, WorkerError> {
        let WorkerBuilder {
            driver,
            display,
            oracle,
            zoom,
            config,
        } = self;
        let startup_timeout = config.worker.startup_timeout();
        let shutdown_timeout = config.worker.shutdown_timeout();
        let query_timeout = config.worker.query_timeout();

        let (ready_tx, ready_rx) = ready_channel::<Sender<Command>>();
        let thread = std::thread::Builder::new()
            .name(config.worker.thread_name.clone())
            .spawn(move || {
                let (sender, receiver) = crossbeam_channel::unbounded();
                let mut session = CaptureSession::new(driver, config.preview.preferred());
                if let Some(zoom) = zoom {
                    session = session.with_zoom(zoom);
                }
                let worker = Worker {
                    session,
                    flash: FlashState::new(),
                    facing: FacingSelector::new(config.device.default_device),
                    display,
                    oracle,
                    outbox: Outbox::new(),
                    last_requested: None,
                    default_size: config.preview.default_size(),
                    requeue: sender.clone(),
                };

                if ready_tx.send(sender).is_err() {
                    log::warn!("Camera worker abandoned before it became ready");
                    return;
                }
                worker.run(receiver);
            })
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        let sender = await_ready(&ready_rx, startup_timeout)?;
        log::info!("Camera worker ready");
        Ok(CommandWorker {
            handle: CameraHandle {
                sender,
                query_timeout,
            },
            thread: Some(thread),
            shutdown_timeout,
        })
    }
}

/// Zero-capacity handshake: a send completes only while `spawn` is still
/// waiting for it.
fn ready_channel<T>() -> (Sender<T>, Receiver<T>) {
    crossbeam_channel::bounded(0)
}

/// Wait for the worker to publish its queue.
fn await_ready<T>(ready: &Receiver<T>, timeout: Duration) -> Result<T, WorkerError> {
    match ready.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(RecvTimeoutError::Timeout) => {
            log::error!("Camera worker not ready after {:?}", timeout);
            Err(WorkerError::StartupTimeout(timeout.as_millis() as u64))
        }
        Err(RecvTimeoutError::Disconnected) => Err(WorkerError::StartupFailed),
    }
}

/// Owner of the camera worker thread
pub struct CommandWorker {
    handle: CameraHandle,
    thread: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl CommandWorker {
    /// Builder with a detached display, sensor orientation and default config
    pub fn builder(driver: Box<dyn CameraDriver>) -> WorkerBuilder {
        WorkerBuilder {
            driver,
            display: DisplayLink::detached(),
            oracle: Box::new(SensorOrientation::new()),
            zoom: None,
            config: PreviewConfig::default(),
        }
    }

    pub fn handle(&self) -> CameraHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    /// Ask the worker to release the camera and exit, waiting up to the
    /// configured shutdown timeout.
    pub fn shutdown(mut self) -> Result<(), WorkerError> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), WorkerError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        if self.handle.submit(Command::Shutdown).is_err() {
            log::debug!("Camera worker already gone");
        }

        let start = Instant::now();
        loop {
            if thread.is_finished() {
                if thread.join().is_err() {
                    log::error!("Camera worker panicked");
                }
                return Ok(());
            }
            if start.elapsed() >= self.shutdown_timeout {
                log::warn!(
                    "Camera worker did not exit within {:?}, detaching",
                    self.shutdown_timeout
                );
                return Err(WorkerError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_and_join() {
            log::warn!("Camera worker shutdown on drop failed: {}", e);
        }
    }
}

struct Worker {
    session: CaptureSession,
    flash: FlashState,
    facing: FacingSelector,
    display: DisplayLink,
    oracle: Box<dyn OrientationOracle>,
    outbox: Outbox,
    last_requested: Option<Size>,
    default_size: Size,
    requeue: Sender<Command>,
}

impl Worker {
    fn run(mut self, commands: Receiver<Command>) {
        log::debug!("Camera worker loop started");
        while let Ok(command) = commands.recv() {
            log::debug!("Camera command: {:?}", command);
            if let Command::Shutdown = command {
                break;
            }
            self.handle(command);
            self.outbox.flush(&self.display);
        }
        self.session.stop();
        log::info!("Camera worker finished");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::StartPreview(size) => self.start_preview(size),
            Command::StopPreview => self.session.stop(),
            Command::ToggleCamera => self.toggle_camera(),
            Command::ToggleFlash => {
                if self.flash.toggle(self.session.capabilities(), &mut self.outbox) {
                    self.apply_flash();
                }
            }
            Command::RecordingStarted => {
                self.flash
                    .on_recording_start(self.session.capabilities(), &mut self.outbox);
                self.apply_flash();
            }
            Command::RecordingStopped => {
                self.flash.on_recording_stop(&mut self.outbox);
                self.apply_flash();
            }
            Command::SetZoom { generation, level } => {
                match self.session.set_zoom(generation, level) {
                    Ok(Some(applied)) => log::debug!("Zoom set to {}", applied),
                    Ok(None) => {}
                    Err(e) => log::warn!("Failed to set zoom: {}", e),
                }
            }
            Command::Restart => self.restart(),
            Command::Snapshot(reply) => {
                if reply.send(self.snapshot()).is_err() {
                    log::debug!("Snapshot requester went away");
                }
            }
            Command::Shutdown => {}
        }
    }

    fn start_preview(&mut self, size: Size) {
        if self.session.state() != SessionState::Closed {
            log::warn!("Preview already running on {:?}, ignoring start", self.session.device_id());
            return;
        }
        self.last_requested = Some(size);
        let Some(display) = self.display.upgrade() else {
            log::warn!("No display attached, not starting preview");
            return;
        };

        if let Err(e) = self.open_and_stream(size, display.as_ref()) {
            log::error!("Preview start failed: {}", e);
            self.session.stop();
        }
    }

    fn open_and_stream(&mut self, size: Size, display: &dyn Display) -> Result<(), PreviewError> {
        let id = self.facing.selected();
        self.session.open(id)?;
        let params = self.session.configure(size, self.oracle.as_ref())?;

        let surface = display.preview_surface().ok_or_else(|| {
            StreamError::Unavailable("display has no preview surface".to_string())
        })?;
        self.session.bind_surface_and_start(surface)?;

        self.outbox.push(UiEvent::PreviewSizeNegotiated(params.preview_size));
        if let Some(caps) = self.session.capabilities() {
            self.flash.refresh_availability(caps, &mut self.outbox);
        }
        self.apply_flash();
        self.outbox.push(UiEvent::FacingChanged(id));
        Ok(())
    }

    fn toggle_camera(&mut self) {
        if !self.facing.toggle(&mut self.outbox) {
            return;
        }
        if self.outbox.flush(&self.display) == 0 {
            log::debug!("Display gone, not restarting after camera switch");
            return;
        }
        if self.requeue.send(Command::Restart).is_err() {
            log::warn!("Could not schedule restart after camera switch");
        }
    }

    fn restart(&mut self) {
        self.session.stop();
        let size = self.last_requested.unwrap_or(self.default_size);
        log::info!("Restarting preview at {}", size);
        self.start_preview(size);
    }

    fn apply_flash(&mut self) {
        if let Err(e) = self.flash.apply_to_device(self.session.device_mut()) {
            log::warn!("Failed to apply flash {:?}: {}", self.flash.mode(), e);
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.session.state(),
            selected: self.facing.selected(),
            open_device: self.session.device_id(),
            flash: self.flash.mode(),
            parameters: self.session.parameters().cloned(),
            generation: self.session.generation(),
        }
    }
}
