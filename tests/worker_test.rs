//! Command worker scenarios: ordering, facing switches, torch and teardown
//!
//! Each test drives a real worker thread over the simulated driver and uses
//! `snapshot()` as a barrier: it is answered only after every command queued
//! before it has run.

use crabpreview::testing::{RecordingDisplay, RecordingZoom, SimulatedDriver};
use crabpreview::types::{FlashParam, Size};
use crabpreview::{
    CameraDevice, CameraDriver, CommandWorker, DeviceId, Display, FlashMode, PreviewConfig,
    SessionState, UiEvent,
};
use std::sync::Arc;

fn spawn(display: &Arc<RecordingDisplay>, driver: &SimulatedDriver) -> CommandWorker {
    let display: Arc<dyn Display> = display.clone();
    CommandWorker::builder(Box::new(driver.clone()))
        .display(&display)
        .spawn()
        .unwrap()
}

#[test]
fn test_start_posts_size_flash_and_facing() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1920, 1080).unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.state, SessionState::Streaming);
    assert_eq!(snapshot.open_device, Some(DeviceId::BACK));
    assert_eq!(snapshot.flash, FlashMode::Off);
    assert_eq!(
        snapshot.parameters.map(|p| p.preview_size),
        Some(Size::new(1280, 720))
    );
    assert_eq!(
        display.events(),
        vec![
            UiEvent::PreviewSizeNegotiated(Size::new(1280, 720)),
            UiEvent::FlashStateChanged(FlashMode::Off),
            UiEvent::FacingChanged(DeviceId::BACK),
        ]
    );
    assert_eq!(
        display.surface().and_then(|s| s.buffer_size()),
        Some(Size::new(1280, 720))
    );
    worker.shutdown().unwrap();
}

#[test]
fn test_commands_run_in_submission_order() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    camera.toggle_flash().unwrap();
    camera.toggle_flash().unwrap();
    camera.toggle_flash().unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.flash, FlashMode::Torch);
    let flash_events: Vec<FlashMode> = display
        .events()
        .into_iter()
        .filter_map(|event| match event {
            UiEvent::FlashStateChanged(mode) => Some(mode),
            _ => None,
        })
        .collect();
    assert_eq!(
        flash_events,
        vec![FlashMode::Off, FlashMode::Torch, FlashMode::Off, FlashMode::Torch]
    );
    assert_eq!(
        driver.log().flash_writes(),
        vec![
            Some(FlashParam::Off),
            Some(FlashParam::Torch),
            Some(FlashParam::Off),
            Some(FlashParam::Torch),
        ]
    );
    worker.shutdown().unwrap();
}

#[test]
fn test_flash_toggle_without_device_is_ignored() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.toggle_flash().unwrap();
    assert_eq!(camera.snapshot().unwrap().flash, FlashMode::Unavailable);
    assert!(display.events().is_empty());
    assert!(driver.log().applied.is_empty());
    worker.shutdown().unwrap();
}

#[test]
fn test_toggle_camera_restarts_on_other_device() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1920, 1080).unwrap();
    camera.toggle_camera().unwrap();
    // the restart is queued behind this first query
    camera.snapshot().unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.state, SessionState::Streaming);
    assert_eq!(snapshot.selected, DeviceId::FRONT);
    assert_eq!(snapshot.open_device, Some(DeviceId::FRONT));
    assert_eq!(snapshot.flash, FlashMode::Unavailable);
    assert_eq!(snapshot.generation, 2);

    let log = driver.log();
    assert_eq!(log.opens, vec![DeviceId::BACK, DeviceId::FRONT]);
    assert_eq!(log.releases, 1);
    assert_eq!(log.peak_open, 1);

    let events = display.events();
    assert_eq!(events[3], UiEvent::FacingChanged(DeviceId::FRONT));
    assert_eq!(
        &events[4..],
        &[
            UiEvent::PreviewSizeNegotiated(Size::new(1280, 720)),
            UiEvent::FlashStateChanged(FlashMode::Unavailable),
            UiEvent::FacingChanged(DeviceId::FRONT),
        ]
    );
    worker.shutdown().unwrap();
}

#[test]
fn test_ignored_start_keeps_restart_size() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    camera.snapshot().unwrap();
    // already streaming, so this request is dropped entirely
    camera.start_preview(640, 480).unwrap();
    camera.toggle_camera().unwrap();
    camera.snapshot().unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.open_device, Some(DeviceId::FRONT));
    assert_eq!(
        snapshot.parameters.map(|p| p.preview_size),
        Some(Size::new(1280, 720))
    );
    worker.shutdown().unwrap();
}

#[test]
fn test_toggle_camera_after_display_dropped_does_not_restart() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    camera.snapshot().unwrap();
    drop(display);

    camera.toggle_camera().unwrap();
    camera.snapshot().unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.selected, DeviceId::FRONT);
    assert_eq!(snapshot.open_device, Some(DeviceId::BACK));
    assert_eq!(driver.log().opens, vec![DeviceId::BACK]);
    worker.shutdown().unwrap();
}

#[test]
fn test_start_without_display_is_skipped() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();
    drop(display);

    camera.start_preview(1280, 720).unwrap();
    assert_eq!(camera.snapshot().unwrap().state, SessionState::Closed);
    assert!(driver.log().opens.is_empty());
    worker.shutdown().unwrap();
}

#[test]
fn test_missing_surface_releases_device() {
    let display = RecordingDisplay::without_surface();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.state, SessionState::Closed);
    assert_eq!(driver.log().releases, 1);
    assert!(display.events().is_empty());
    worker.shutdown().unwrap();
}

#[test]
fn test_busy_device_leaves_session_closed() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    let held = driver.clone().open(DeviceId::BACK).unwrap();
    camera.start_preview(1280, 720).unwrap();
    assert_eq!(camera.snapshot().unwrap().state, SessionState::Closed);
    assert!(display.events().is_empty());

    held.release();
    camera.restart().unwrap();
    let snapshot = camera.snapshot().unwrap();
    assert_eq!(snapshot.state, SessionState::Streaming);
    worker.shutdown().unwrap();
}

#[test]
fn test_restart_before_any_start_uses_default_size() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.restart().unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.state, SessionState::Streaming);
    // 1920x1080 clamped to the preferred 1280x720
    assert_eq!(
        snapshot.parameters.map(|p| p.preview_size),
        Some(Size::new(1280, 720))
    );
    worker.shutdown().unwrap();
}

#[test]
fn test_recording_drives_torch() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let worker = spawn(&display, &driver);
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    camera.recording_started().unwrap();
    assert_eq!(camera.snapshot().unwrap().flash, FlashMode::Torch);
    camera.recording_stopped().unwrap();
    assert_eq!(camera.snapshot().unwrap().flash, FlashMode::Off);

    assert_eq!(
        driver.log().flash_writes(),
        vec![
            Some(FlashParam::Off),
            Some(FlashParam::Torch),
            Some(FlashParam::Off),
        ]
    );
    worker.shutdown().unwrap();
}

#[test]
fn test_recording_while_unavailable_writes_no_flash() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let mut config = PreviewConfig::default();
    config.device.default_device = DeviceId::FRONT;
    let display_dyn: Arc<dyn Display> = display.clone();
    let worker = CommandWorker::builder(Box::new(driver.clone()))
        .display(&display_dyn)
        .config(config)
        .spawn()
        .unwrap();
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    camera.recording_started().unwrap();
    camera.recording_stopped().unwrap();
    let snapshot = camera.snapshot().unwrap();

    assert_eq!(snapshot.open_device, Some(DeviceId::FRONT));
    assert_eq!(snapshot.flash, FlashMode::Unavailable);
    assert!(driver.log().flash_writes().is_empty());
    worker.shutdown().unwrap();
}

#[test]
fn test_zoom_targets_current_device_only() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    let zoom = RecordingZoom::observing(&driver);
    let display_dyn: Arc<dyn Display> = display.clone();
    let worker = CommandWorker::builder(Box::new(driver.clone()))
        .display(&display_dyn)
        .zoom(Box::new(zoom.clone()))
        .spawn()
        .unwrap();
    let camera = worker.handle();

    camera.start_preview(1280, 720).unwrap();
    camera.snapshot().unwrap();
    let target = zoom.current().unwrap();
    camera.set_zoom(&target, 12).unwrap();
    assert_eq!(camera.snapshot().unwrap().parameters.map(|p| p.zoom), Some(12));

    camera.stop_preview().unwrap();
    camera.start_preview(1280, 720).unwrap();
    camera.set_zoom(&target, 40).unwrap();
    let snapshot = camera.snapshot().unwrap();
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.parameters.map(|p| p.zoom), Some(0));
    worker.shutdown().unwrap();

    // every unbind happened while a device was still held
    let unbinds: Vec<_> = zoom
        .history()
        .into_iter()
        .filter(|binding| binding.target.is_none())
        .collect();
    assert_eq!(unbinds.len(), 2);
    assert_eq!((unbinds[0].open_now, unbinds[0].releases), (1, 0));
    assert_eq!((unbinds[1].open_now, unbinds[1].releases), (1, 1));
}

#[test]
fn test_dropping_worker_releases_device() {
    let display = RecordingDisplay::new();
    let driver = SimulatedDriver::new();
    {
        let worker = spawn(&display, &driver);
        worker.handle().start_preview(1280, 720).unwrap();
        worker.handle().snapshot().unwrap();
    }
    let log = driver.log();
    assert_eq!(log.releases, 1);
    assert_eq!(log.open_now, 0);
}
