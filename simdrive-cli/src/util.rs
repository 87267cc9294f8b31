use colored::*;

use simdrive::{Batch, ExperimentResult, ExperimentSpec, Status, Table, Value};

/// Prints one line per experiment, inputs followed by outputs or the error.
pub(crate) fn print_results(specs: &[ExperimentSpec], results: &[ExperimentResult]) {
    for (n, (spec, result)) in specs.iter().zip(results.iter()).enumerate() {
        let inputs = spec
            .inputs()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        match &result.status {
            Status::Success => {
                let outputs = result
                    .outputs
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{:>4} {} [{}] -> {}", n, "ok".green(), inputs, outputs);
            }
            Status::Failed { kind, message } => {
                println!(
                    "{:>4} {} [{}] -> {}: {}",
                    n,
                    "failed".red(),
                    inputs,
                    kind.to_string().yellow(),
                    message
                );
            }
        }
    }
}

pub(crate) fn print_batch_summary(batch: &Batch) {
    let config = &batch.config;
    println!("model:            {}", config.model_path.to_string_lossy());
    println!("version:          {}", match config.version.as_str() {
        "" => "any",
        v => v,
    });
    println!("license:          {}", config.license_type);
    println!("path context:     {}", config.path_context.as_deref().unwrap_or("-"));
    println!(
        "event controller: {}",
        config.event_controller_path().unwrap_or_else(|| "-".to_string())
    );
    println!("max concurrency:  {}", config.max_concurrency);
    println!("experiments:      {}", batch.len());
    for (n, spec) in batch.experiments.iter().enumerate() {
        println!(
            "{:>4} {} inputs, outputs: {}",
            n,
            spec.input_variables().len(),
            spec.output_variables().join(", ")
        );
    }
    println!("{}", "batch is valid".green());
}

/// Prints the table with columns padded to their widest cell.
pub(crate) fn print_table(table: &Table) {
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(cell_string).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(n, c)| {
            cells
                .iter()
                .map(|r| r[n].len())
                .chain(std::iter::once(c.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header = table
        .columns()
        .iter()
        .zip(widths.iter())
        .map(|(c, w)| format!("{:<w$}", c, w = w))
        .collect::<Vec<_>>()
        .join(" | ");
    println!("{}", header.bold());
    for row in cells {
        let line = row
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| format!("{:<w$}", c, w = w))
            .collect::<Vec<_>>()
            .join(" | ");
        println!("{}", line);
    }
}

fn cell_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        v => v.to_string(),
    }
}
