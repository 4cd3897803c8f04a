// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Fire detection with an alert pane and spreadsheet export
//!
//! "Save Detection" (or `S`) writes fire_detection_log.xlsx; the log is also
//! exported when the window closes or Ctrl-C stops a headless run.
//!
//! cargo run --bin fire_detect_log --release -- --camera 0

use clap::Parser;
use fire_detect_rs::app::{self, Variant};
use fire_detect_rs::Args;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    app::init_tracing(&args.log_level);
    app::run(args, Variant::DetectAndLog)
}
