// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Fire detection: camera → YOLOv8 → boxes → window
//!
//! cargo run --bin fire_detect --release -- --camera 0

use clap::Parser;
use fire_detect_rs::app::{self, Variant};
use fire_detect_rs::Args;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    app::init_tracing(&args.log_level);
    app::run(args, Variant::Detect)
}
