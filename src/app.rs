// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Front-end wiring shared by both binaries: settings → session → window or headless loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use macroquad::window::Conf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::annotate::Annotator;
use crate::config::{Args, CameraChoice};
use crate::detection::Detector;
use crate::display::LogSink;
use crate::error::{report, FireError};
use crate::input::{get_camera_devices, CameraConfig, CameraSource, FrameSource, SyntheticSource};
use crate::models::YOLOv8;
use crate::renderer::{Renderer, UiActions};
use crate::session::{run_blocking, Cycle, Session};
use crate::settings::Settings;

/// Which front end is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Display + overlays.
    Detect,
    /// Adds the alert pane, "Save Detection" and the xlsx export.
    DetectAndLog,
}

impl Variant {
    pub fn with_log(self) -> bool {
        self == Variant::DetectAndLog
    }

    fn title(self) -> &'static str {
        match self {
            Variant::Detect => "Fire Detection App",
            Variant::DetectAndLog => "Fire Detection App - Event Log",
        }
    }
}

pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Loads settings and the model, then runs the chosen front end. A model that cannot
/// be loaded is fatal.
pub fn run(args: Args, variant: Variant) -> anyhow::Result<()> {
    if args.list_devices {
        let devices = get_camera_devices();
        if devices.is_empty() {
            println!("no capture devices found");
        }
        for (index, name) in devices {
            println!("{index}: {name}");
        }
        return Ok(());
    }

    let settings = args.apply_overrides(Settings::load(&args.settings));
    settings.print_summary();

    let model_config = args.model_config(&settings);
    let model = YOLOv8::new(model_config).map_err(|e| {
        error!("❌ {}", report(&e));
        e
    })?;

    let mut annotator = Annotator::new()
        .with_margin(settings.label_margin)
        .with_thickness(settings.box_thickness);
    match &settings.font_path {
        Some(path) => annotator = annotator.with_font(path),
        None => warn!("⚠️ no label font configured, labels drawn as tags"),
    }

    match args.camera {
        CameraChoice::Stub => {
            launch(&args, variant, settings, SyntheticSource::default(), model, annotator)
        }
        CameraChoice::Device(device_index) => {
            let source = CameraSource::new(CameraConfig {
                device_index,
                video_size: args.video_size.clone(),
                ..CameraConfig::default()
            });
            launch(&args, variant, settings, source, model, annotator)
        }
    }
}

fn launch<S, D>(
    args: &Args,
    variant: Variant,
    settings: Settings,
    source: S,
    detector: D,
    annotator: Annotator,
) -> anyhow::Result<()>
where
    S: FrameSource + 'static,
    D: Detector + 'static,
{
    let mut session = Session::new(source, detector)
        .with_annotator(annotator)
        .with_tick(settings.tick());
    if variant.with_log() {
        session = session.with_event_log();
    }
    let export_path = settings.export_file.clone();

    if args.headless {
        run_headless(session, variant, export_path)
    } else {
        let conf = Conf {
            window_title: variant.title().to_string(),
            window_width: 800,
            window_height: 600,
            ..Default::default()
        };
        macroquad::Window::from_config(conf, run_window(session, variant, export_path));
        Ok(())
    }
}

fn run_headless<S: FrameSource, D: Detector>(
    mut session: Session<S, D>,
    variant: Variant,
    export_path: PathBuf,
) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("failed to install Ctrl-C handler")?;

    info!("🚀 headless on {} (Ctrl-C to stop)", session.describe_source());
    let mut sink = LogSink::new();
    let result = run_blocking(&mut session, &mut sink, &stop);

    // teardown export happens whether or not the loop failed
    if variant.with_log() {
        session.export_or_report(&export_path);
    }
    result.map_err(|e| {
        error!("❌ {}", report(&e));
        anyhow::Error::new(e)
    })
}

async fn run_window<S: FrameSource, D: Detector>(
    mut session: Session<S, D>,
    variant: Variant,
    export_path: PathBuf,
) {
    macroquad::input::prevent_quit();
    let mut renderer = Renderer::new(variant.with_log());
    // buttons are read while drawing, acted on at the top of the next frame
    let mut pending = UiActions::default();

    loop {
        if macroquad::input::is_quit_requested() {
            break;
        }

        if pending.detect {
            match session.start(Instant::now()) {
                Ok(()) => {
                    renderer.set_status(format!("Detecting on {}", session.describe_source()))
                }
                Err(e) => surface(&mut renderer, &e),
            }
        }
        if pending.stop {
            session.stop();
            renderer.set_status("Idle - press Detect");
        }
        if pending.save {
            match session.export(&export_path) {
                Ok(()) => {
                    let n = session.event_log().map_or(0, |log| log.len());
                    renderer.set_status(format!("Saved {} events to {}", n, export_path.display()));
                }
                Err(e) => surface(&mut renderer, &e),
            }
        }

        match session.poll(Instant::now(), &mut renderer) {
            Ok(Cycle::Rendered(cycle)) => {
                if let Some(alert) = cycle.alert {
                    renderer.push_alert(alert.to_string());
                }
            }
            Ok(Cycle::Idle | Cycle::Skipped) => {}
            Err(e) => surface(&mut renderer, &e),
        }

        renderer.draw();
        pending = renderer.draw_ui(session.state(), session.stats());
        macroquad::window::next_frame().await;
    }

    session.stop();
    if variant.with_log() {
        session.export_or_report(&export_path);
    }
    info!("👋 window closed");
}

/// Device and export failures go to the status line (and alert pane) instead of
/// ending the program.
fn surface(renderer: &mut Renderer, e: &FireError) {
    let text = report(e);
    warn!("⚠️ {}", text);
    renderer.set_status(text.clone());
    renderer.push_alert(text);
}
