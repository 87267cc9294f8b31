#![allow(dead_code)]

use simdrive_core::host::memory::{MemoryHost, MemoryModel, MemoryTable, Rule};
use simdrive_core::SimConfig;

pub const MODEL: &str = "line.spp";

pub fn init_log() {
    let _ = simplelog::TestLogger::init(simplelog::LevelFilter::Debug, simplelog::Config::default());
}

/// Production line model responding to an inspection switch.
pub fn line_model() -> MemoryModel {
    MemoryModel::new()
        .frame(".Models.Frame")
        .event_controller(".Models.Frame.EventController")
        .variable(".Models.Frame.inspection", false)
        .variable(".Models.Frame.simulation", 0)
        .variable(".Models.Frame.x", false)
        .variable(".Models.Frame.x_seen", false)
        .variable(".Models.Frame.delay", 0)
        .variable(".Models.Frame.id", 0)
        .variable(".Models.Frame.echo", 0)
        .table(".Models.Frame.Data", MemoryTable::empty())
        .rule(Rule::select("simulation", "inspection", 42, 17))
        .rule(Rule::copy("x_seen", "x"))
        .rule(Rule::copy("echo", "id"))
        .duration_from("delay")
        .run_duration(1, 0)
}

pub fn host(seats: usize) -> MemoryHost {
    MemoryHost::new(seats).with_model(MODEL, line_model())
}

pub fn config() -> SimConfig {
    SimConfig::new(MODEL)
        .with_path_context(".Models.Frame")
        .with_event_controller("EventController")
}
