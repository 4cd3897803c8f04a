// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Fakes for driving a session without a camera, a model or a window.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fire_detect_rs::display::DisplaySink;
use fire_detect_rs::input::{Capture, FrameSource};
use fire_detect_rs::session::Clock;
use fire_detect_rs::{Detection, DetectionBatch, Detector, FireError, Frame, Result};

pub const W: u32 = 64;
pub const H: u32 = 48;

pub fn black() -> Frame {
    Frame::filled(W, H, [0, 0, 0])
}

/// Opens and releases, counted.
#[derive(Clone, Default)]
pub struct DeviceCounters {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl DeviceCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Frame source that replays a script of reads. `None` entries are failed reads; once
/// the script runs out every read yields `endless` (a black frame by default).
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Option<Frame>>>>,
    endless: bool,
    fail_open: bool,
    pub counters: DeviceCounters,
}

impl ScriptedSource {
    pub fn new(script: Vec<Option<Frame>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            endless: false,
            fail_open: false,
            counters: DeviceCounters::default(),
        }
    }

    /// Black frames forever.
    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new(vec![])
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(vec![])
        }
    }
}

impl FrameSource for ScriptedSource {
    type Capture = ScriptedCapture;

    fn open(&mut self) -> Result<ScriptedCapture> {
        if self.fail_open {
            return Err(FireError::DeviceUnavailable {
                device: self.describe(),
                reason: "device busy".into(),
            });
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedCapture {
            script: self.script.clone(),
            endless: self.endless,
            closes: self.counters.closes.clone(),
            closed: false,
        })
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

pub struct ScriptedCapture {
    script: Arc<Mutex<VecDeque<Option<Frame>>>>,
    endless: bool,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl Capture for ScriptedCapture {
    fn read(&mut self) -> Option<Frame> {
        if self.closed {
            return None;
        }
        match self.script.lock().unwrap().pop_front() {
            Some(step) => step,
            None if self.endless => Some(black()),
            None => None,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Reports this many boxes.
    Boxes(usize),
    Fail,
    Panic,
}

/// Detector that follows a script; after the script it reports no boxes. Optionally
/// raises a stop flag after a number of calls.
pub struct ScriptedDetector {
    steps: VecDeque<Step>,
    pub calls: usize,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl ScriptedDetector {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            calls: 0,
            stop_after: None,
        }
    }

    pub fn stopping_after(mut self, calls: usize, flag: Arc<AtomicBool>) -> Self {
        self.stop_after = Some((calls, flag));
        self
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<DetectionBatch> {
        self.calls += 1;
        if let Some((n, flag)) = &self.stop_after {
            if self.calls >= *n {
                flag.store(true, Ordering::SeqCst);
            }
        }
        match self.steps.pop_front().unwrap_or(Step::Boxes(0)) {
            Step::Boxes(n) => Ok((0..n)
                .map(|i| {
                    let x = 4.0 + i as f32 * 12.0;
                    Detection::new(x, 20.0, x + 10.0, 40.0, 0.8, 0)
                })
                .collect()),
            Step::Fail => Err(FireError::inference("model exploded")),
            Step::Panic => panic!("detector panicked"),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<Frame>,
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}

/// Advances one second every time it is read.
pub struct SteppingClock {
    next: Cell<NaiveDateTime>,
}

impl SteppingClock {
    pub fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    pub fn new() -> Self {
        Self {
            next: Cell::new(Self::start()),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let t = self.next.get();
        self.next.set(t + Duration::seconds(1));
        t
    }
}

fn zip_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> String {
    let mut xml = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

/// Text between each `open` and the following `close`, in document order.
fn between<'a>(xml: &'a str, open: &str, close: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(open) {
        let tail = &rest[start + open.len()..];
        let Some(end) = tail.find(close) else { break };
        out.push(&tail[..end]);
        rest = &tail[end + close.len()..];
    }
    out
}

/// Cell text of the first worksheet of an exported workbook, row by row.
pub fn read_sheet(path: &Path) -> Vec<Vec<String>> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let strings: Vec<String> = between(&zip_entry(&mut archive, "xl/sharedStrings.xml"), "<si>", "</si>")
        .into_iter()
        .map(|si| {
            let t = &si[si.find('>').unwrap() + 1..];
            t[..t.find("</t>").unwrap()].to_string()
        })
        .collect();
    let sheet = zip_entry(&mut archive, "xl/worksheets/sheet1.xml");

    let mut rows: BTreeMap<u32, BTreeMap<u32, String>> = BTreeMap::new();
    for cell in between(&sheet, "<c ", "</c>") {
        let reference = between(cell, "r=\"", "\"")[0];
        let digits = reference.find(|c: char| c.is_ascii_digit()).unwrap();
        let col = reference[..digits]
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1));
        let row: u32 = reference[digits..].parse().unwrap();
        let value = between(cell, "<v>", "</v>")[0];
        let text = if cell.contains("t=\"s\"") {
            strings[value.parse::<usize>().unwrap()].clone()
        } else {
            value.to_string()
        };
        rows.entry(row).or_default().insert(col, text);
    }
    rows.into_values().map(|cols| cols.into_values().collect()).collect()
}
