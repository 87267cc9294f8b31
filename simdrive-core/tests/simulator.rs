mod common;

use std::path::Path;

use simdrive_core::host::memory::{MemoryHost, MemoryModel, MemoryTable};
use simdrive_core::{Batch, Error, ErrorKind, ExperimentSpec, SimConfig, Simulator, Table, Value, ValueType};

use common::{config, host, init_log, MODEL};

fn data_table() -> Table {
    Table::with_columns(
        &["Column1", "Column2"],
        vec![
            vec![Value::Int(1), Value::Int(3)],
            vec![Value::Int(2), Value::Int(4)],
        ],
    )
    .unwrap()
}

#[test]
fn table_round_trip() {
    init_log();
    let mut sim = Simulator::new(host(1), config()).unwrap();
    sim.set_table("Data", &data_table()).unwrap();
    assert_eq!(sim.get_table("Data").unwrap(), data_table());
}

#[test]
fn table_round_trip_normalizes_typed_columns() {
    let model = MemoryModel::new()
        .frame(".Models.Frame")
        .event_controller(".Models.Frame.EventController")
        .table(
            ".Models.Frame.Data",
            MemoryTable::empty().typed(&[ValueType::Float, ValueType::Int]),
        );
    let host = MemoryHost::new(1).with_model(MODEL, model);
    let mut sim = Simulator::new(host, config()).unwrap();
    sim.set_table("Data", &data_table()).unwrap();

    let back = sim.get_table("Data").unwrap();
    assert_eq!(back.columns(), data_table().columns());
    assert_eq!(
        back.rows(),
        &[
            vec![Value::Float(1.0), Value::Int(3)],
            vec![Value::Float(2.0), Value::Int(4)],
        ]
    );
}

#[test]
fn refused_resize_is_dimension_mismatch() {
    let model = MemoryModel::new()
        .frame(".Models.Frame")
        .event_controller(".Models.Frame.EventController")
        .table(".Models.Frame.Data", MemoryTable::empty().max_rows(1));
    let host = MemoryHost::new(1).with_model(MODEL, model);
    let mut sim = Simulator::new(host, config()).unwrap();
    match sim.set_table("Data", &data_table()) {
        Err(Error::DimensionMismatch(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match sim.get_table("Missing") {
        Err(Error::TableNotFound(name)) => assert_eq!(name, ".Models.Frame.Missing"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn null_header_becomes_empty_column_name() {
    let table = MemoryTable {
        columns: vec!["".to_string(), "b".to_string()],
        rows: vec![vec![Value::Null, Value::Int(1)]],
        ..MemoryTable::default()
    };
    let model = MemoryModel::new()
        .frame(".Models.Frame")
        .event_controller(".Models.Frame.EventController")
        .table(".Models.Frame.Data", table);
    let host = MemoryHost::new(1).with_model(MODEL, model);
    let mut sim = Simulator::new(host, config()).unwrap();
    let read = sim.get_table("Data").unwrap();
    assert_eq!(read.columns(), &["".to_string(), "b".to_string()]);
    assert_eq!(read.get(0, ""), Some(&Value::Null));
}

#[test]
fn manual_run_cycle() {
    let mut sim = Simulator::new(host(1), config()).unwrap();
    assert!(!sim.is_initialized());
    sim.set_value("inspection", true).unwrap();
    assert!(sim.is_initialized());
    sim.start_simulation().unwrap();
    sim.wait_for_simulation().unwrap();
    assert!(!sim.is_simulation_running().unwrap());
    assert_eq!(sim.get_value("simulation").unwrap(), Value::Int(42));
    sim.reset_simulation().unwrap();
    assert_eq!(sim.get_value("simulation").unwrap(), Value::Int(0));

    assert_eq!(
        sim.execute_script("init", Some(&Value::Int(3)), true).unwrap(),
        Some(Value::Int(3))
    );
    sim.quit().unwrap();
    assert_eq!(sim.factory().open_seats(), 0);
}

#[test]
fn run_simulation_reports_errors() {
    let mut sim = Simulator::new(host(1), config()).unwrap();
    let result = sim.run_simulation(&ExperimentSpec::single("inspection", 1.5, "simulation"));
    assert_eq!(result.error_kind(), Some(ErrorKind::TypeMismatch));
    assert!(result.outputs.is_empty());

    // partial writes of a failed experiment don't leak into the next one
    let failing = ExperimentSpec::new(
        vec!["inspection".to_string(), "missing".to_string()],
        vec![Value::Bool(true), Value::Int(1)],
        vec!["simulation".to_string()],
    )
    .unwrap();
    let result = sim.run_simulation(&failing);
    assert_eq!(result.error_kind(), Some(ErrorKind::VariableNotFound));
    let untouched = ExperimentSpec::new(vec![], vec![], vec!["simulation".to_string()]).unwrap();
    let result = sim.run_simulation(&untouched);
    assert_eq!(result.get("simulation"), Some(&Value::Int(17)));
    assert_eq!(sim.factory().opened_total(), 1);
}

#[test]
fn batch_after_cancelled_batch_runs() {
    let mut sim = Simulator::new(host(2), config()).unwrap();
    let specs = vec![
        ExperimentSpec::single("inspection", true, "simulation"),
        ExperimentSpec::single("inspection", false, "simulation"),
    ];
    sim.cancel_token().cancel();
    let results = sim.run_simulations_in_parallel(&specs, 2).unwrap();
    assert!(results
        .iter()
        .all(|r| r.error_kind() == Some(ErrorKind::Cancelled)));
    assert!(!sim.cancel_token().is_cancelled());

    let results = sim.run_simulations_in_parallel(&specs, 2).unwrap();
    assert_eq!(results[0].get("simulation"), Some(&Value::Int(42)));
    assert_eq!(results[1].get("simulation"), Some(&Value::Int(17)));

    sim.cancel_token().cancel();
    let results = sim.run_simulations_sequentially(&specs).unwrap();
    assert_eq!(results[0].error_kind(), Some(ErrorKind::Cancelled));
    let results = sim.run_simulations_sequentially(&specs).unwrap();
    assert!(results.iter().all(|r| r.is_success()));
}

#[test]
fn sequential_batch_reuses_simulator_session() {
    let mut sim = Simulator::new(host(1), config()).unwrap();
    sim.initialize().unwrap();
    let specs = vec![
        ExperimentSpec::single("inspection", true, "simulation"),
        ExperimentSpec::single("inspection", false, "no_such_output"),
        ExperimentSpec::single("inspection", false, "simulation"),
    ];
    let results = sim.run_simulations_sequentially(&specs).unwrap();
    assert_eq!(results[0].get("simulation"), Some(&Value::Int(42)));
    assert_eq!(results[1].error_kind(), Some(ErrorKind::VariableNotFound));
    assert_eq!(results[2].get("simulation"), Some(&Value::Int(17)));
    assert_eq!(sim.factory().opened_total(), 1);
    assert!(sim.is_initialized());
}

#[test]
fn parallel_batch_through_simulator() {
    let sim = Simulator::new(host(3), config()).unwrap();
    let specs: Vec<_> = [true, false, true, false]
        .iter()
        .map(|b| ExperimentSpec::single("inspection", *b, "simulation"))
        .collect();
    let results = sim.run_simulations_in_parallel(&specs, 3).unwrap();
    let values: Vec<_> = results.iter().map(|r| r.get("simulation").cloned()).collect();
    assert_eq!(
        values,
        vec![
            Some(Value::Int(42)),
            Some(Value::Int(17)),
            Some(Value::Int(42)),
            Some(Value::Int(17))
        ]
    );
    assert_eq!(sim.factory().open_seats(), 0);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = SimConfig::new(MODEL).with_event_controller("EventController");
    match Simulator::new(host(1), config) {
        Err(Error::CommandOrder { .. }) => (),
        Err(e) => panic!("unexpected: {}", e),
        Ok(_) => panic!("accepted config without path context"),
    }
}

#[test]
fn batch_file_runs_against_model_file() {
    init_log();
    let batch = Batch::from_path(Path::new("tests/data/batch.toml")).unwrap();
    assert!(batch.config.model_path.ends_with("tests/data/line.toml"));
    let sim = Simulator::new(MemoryHost::new(2), batch.config.clone()).unwrap();
    let results = sim
        .run_simulations_in_parallel(&batch.experiments, batch.config.max_concurrency)
        .unwrap();
    assert_eq!(results[0].get("simulation"), Some(&Value::Int(17)));
    assert_eq!(results[1].get("simulation"), Some(&Value::Int(42)));
    assert_eq!(results[2].get("throughput"), Some(&Value::Float(42.5)));

    let mut sim = Simulator::new(MemoryHost::new(1), batch.config).unwrap();
    let table = sim.get_table("Data").unwrap();
    assert_eq!(table.get(1, "Column1"), Some(&Value::Int(2)));
    assert_eq!(table.get(1, "Column2"), Some(&Value::Float(4.0)));
}

#[cfg(feature = "yaml")]
#[test]
fn batch_file_in_yaml() {
    let batch = Batch::from_path(Path::new("tests/data/batch.yaml")).unwrap();
    assert_eq!(batch.len(), 1);
    let sim = Simulator::new(MemoryHost::new(1), batch.config.clone()).unwrap();
    let results = sim.run_simulations_in_parallel(&batch.experiments, 1).unwrap();
    assert_eq!(results[0].get("throughput"), Some(&Value::Float(84.0)));
}
