//! In-memory simulation host.
//!
//! `MemoryHost` implements the automation boundary without any external
//! application. Models are plain data: frames, event controllers, typed
//! variables, tables and a list of rules evaluated when a run starts. A run
//! takes a configurable amount of wall-clock time, which makes the host
//! suitable for exercising pool scheduling, ordering and failure isolation.
//!
//! # Model files
//!
//! Models not registered programmatically are read from TOML files:
//!
//! ```toml
//! frames = [".Models.Frame"]
//! event_controllers = [".Models.Frame.EventController"]
//! run_duration_ms = 20
//!
//! [variables]
//! ".Models.Frame.inspection" = false
//! ".Models.Frame.simulation" = 0
//!
//! [[rules]]
//! op = "select"
//! target = "simulation"
//! condition = "inspection"
//! then = 42
//! otherwise = 17
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use id_pool::IdPool;
use rand::Rng;

use crate::error::{Error, Result};
use crate::host::{AutomationSession, LicenseType, SessionFactory};
use crate::value::{Value, ValueType};
use crate::{join_path, PATH_SEPARATOR};

/// Rule evaluated against model variables when a run starts.
///
/// Variable names resolve relative to the session's path context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Rule {
    /// Copies the source value into the target.
    Copy { target: String, source: String },
    /// Stores the negated truthiness of the source.
    Not { target: String, source: String },
    /// Stores the sum of the sources.
    Sum { target: String, sources: Vec<String> },
    /// Stores the product of the sources.
    Product { target: String, sources: Vec<String> },
    /// Stores a constant.
    Set { target: String, value: Value },
    /// Stores `then` if the condition is truthy, `otherwise` if not.
    Select {
        target: String,
        condition: String,
        then: Value,
        otherwise: Value,
    },
    /// Aborts the run with an execution error if the condition is truthy.
    Fail {
        condition: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl Rule {
    pub fn copy(target: &str, source: &str) -> Self {
        Rule::Copy {
            target: target.to_string(),
            source: source.to_string(),
        }
    }
    pub fn not(target: &str, source: &str) -> Self {
        Rule::Not {
            target: target.to_string(),
            source: source.to_string(),
        }
    }
    pub fn sum(target: &str, sources: &[&str]) -> Self {
        Rule::Sum {
            target: target.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
    pub fn product(target: &str, sources: &[&str]) -> Self {
        Rule::Product {
            target: target.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
    pub fn select(
        target: &str,
        condition: &str,
        then: impl Into<Value>,
        otherwise: impl Into<Value>,
    ) -> Self {
        Rule::Select {
            target: target.to_string(),
            condition: condition.to_string(),
            then: then.into(),
            otherwise: otherwise.into(),
        }
    }
    pub fn fail(condition: &str) -> Self {
        Rule::Fail {
            condition: condition.to_string(),
            message: None,
        }
    }
}

/// Table as stored by the in-memory host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    /// Native types of the leading columns; further columns are untyped
    pub column_types: Vec<ValueType>,
    pub rows: Vec<Vec<Value>>,
    /// Host-imposed limit on the number of rows
    pub max_rows: Option<usize>,
    /// Host-imposed limit on the number of columns
    pub max_columns: Option<usize>,
}

impl MemoryTable {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        MemoryTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..MemoryTable::default()
        }
    }

    pub fn empty() -> Self {
        MemoryTable::default()
    }

    pub fn typed(mut self, types: &[ValueType]) -> Self {
        self.column_types = types.to_vec();
        self
    }

    pub fn max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    fn column_type(&self, column: usize) -> Option<ValueType> {
        self.column_types.get(column).copied()
    }

    /// Copy of the table with the cells of typed columns converted to their
    /// column's type. Cells that can't be converted are kept as they are.
    fn normalized(&self) -> MemoryTable {
        let mut table = self.clone();
        for row in table.rows.iter_mut() {
            for (n, cell) in row.iter_mut().enumerate() {
                let ty = match (self.column_type(n), &*cell) {
                    (_, Value::Null) | (None, _) => continue,
                    (Some(ty), _) => ty,
                };
                let value = std::mem::replace(cell, Value::Null);
                *cell = match value.coerce_to(ty) {
                    Ok(v) => v,
                    Err(v) => {
                        warn!("memory host: cell {} doesn't fit column type {}", v, ty);
                        v
                    }
                };
            }
        }
        table
    }

    fn cell_mut(&mut self, column: usize, row: usize) -> Result<&mut Value> {
        let (cols, rows) = (self.columns.len(), self.rows.len());
        self.rows
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or_else(|| {
                Error::DimensionMismatch(format!(
                    "cell [{}, {}] outside of {}x{} table",
                    column + 1,
                    row + 1,
                    cols,
                    rows
                ))
            })
    }
}

/// Model definition understood by the in-memory host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryModel {
    /// Absolute paths usable as path contexts
    pub frames: Vec<String>,
    /// Absolute paths of event controllers
    pub event_controllers: Vec<String>,
    /// Variables by absolute path, typed by their initial value
    pub variables: FnvHashMap<String, Value>,
    pub tables: FnvHashMap<String, MemoryTable>,
    pub rules: Vec<Rule>,
    pub run_duration_ms: u64,
    pub run_jitter_ms: u64,
    /// Variable holding an additional run duration in milliseconds
    pub duration_from: Option<String>,
    /// Refuse loading the model a second time within the same session
    pub reject_reload: bool,
}

impl MemoryModel {
    pub fn new() -> Self {
        MemoryModel::default()
    }

    /// Reads a model definition from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(_) => return Err(Error::ModelNotFound(path.to_string_lossy().to_string())),
        };
        toml::from_slice(&bytes).map_err(|e| Error::ModelLoadFailed {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn frame(mut self, path: &str) -> Self {
        self.frames.push(path.to_string());
        self
    }
    pub fn event_controller(mut self, path: &str) -> Self {
        self.event_controllers.push(path.to_string());
        self
    }
    pub fn variable(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(path.to_string(), value.into());
        self
    }
    pub fn table(mut self, path: &str, table: MemoryTable) -> Self {
        self.tables.insert(path.to_string(), table);
        self
    }
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
    pub fn run_duration(mut self, millis: u64, jitter_millis: u64) -> Self {
        self.run_duration_ms = millis;
        self.run_jitter_ms = jitter_millis;
        self
    }
    pub fn duration_from(mut self, variable: &str) -> Self {
        self.duration_from = Some(variable.to_string());
        self
    }
    pub fn reject_reload(mut self) -> Self {
        self.reject_reload = true;
        self
    }

    /// Whether the given absolute path names a location within the model.
    fn has_location(&self, path: &str) -> bool {
        let prefix = format!("{}{}", path, PATH_SEPARATOR);
        self.frames.iter().any(|f| f == path)
            || self
                .frames
                .iter()
                .chain(self.event_controllers.iter())
                .chain(self.variables.keys())
                .chain(self.tables.keys())
                .any(|p| p.starts_with(&prefix))
    }
}

struct Seats {
    ids: IdPool,
    limit: usize,
    in_use: usize,
    opened_total: usize,
}

struct HostShared {
    seats: Mutex<Seats>,
    available: AtomicBool,
    launch_limit: Option<usize>,
}

impl HostShared {
    fn seats(&self) -> MutexGuard<Seats> {
        self.seats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Session factory backed by in-memory models.
///
/// License seats are shared between all sessions created by the same host;
/// `open_seats` reports how many are currently held.
pub struct MemoryHost {
    shared: Arc<HostShared>,
    models: Arc<FnvHashMap<PathBuf, MemoryModel>>,
    versions: Vec<String>,
    licenses: Vec<LicenseType>,
}

impl MemoryHost {
    /// Creates a new host with the given number of license seats.
    pub fn new(seats: usize) -> Self {
        MemoryHost {
            shared: Arc::new(HostShared {
                seats: Mutex::new(Seats {
                    ids: IdPool::new(),
                    limit: seats,
                    in_use: 0,
                    opened_total: 0,
                }),
                available: AtomicBool::new(true),
                launch_limit: None,
            }),
            models: Arc::new(FnvHashMap::default()),
            versions: Vec::new(),
            licenses: vec![
                LicenseType::Professional,
                LicenseType::Student,
                LicenseType::Viewer,
            ],
        }
    }

    /// Registers a model under the given path. Registered models take
    /// precedence over files on disk.
    pub fn with_model(mut self, path: impl Into<PathBuf>, model: MemoryModel) -> Self {
        Arc::make_mut(&mut self.models).insert(path.into(), model);
        self
    }

    /// Restricts the host to the listed product versions.
    pub fn with_versions(mut self, versions: &[&str]) -> Self {
        self.versions = versions.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Restricts the license types the host grants seats for.
    pub fn with_licenses(mut self, licenses: &[LicenseType]) -> Self {
        self.licenses = licenses.to_vec();
        self
    }

    /// Host refuses to launch more than `limit` sessions over its lifetime.
    pub fn with_launch_limit(mut self, limit: usize) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.launch_limit = Some(limit);
        }
        self
    }

    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Number of license seats currently held by open sessions.
    pub fn open_seats(&self) -> usize {
        self.shared.seats().in_use
    }

    /// Number of sessions opened so far.
    pub fn opened_total(&self) -> usize {
        self.shared.seats().opened_total
    }
}

impl SessionFactory for MemoryHost {
    type Session = MemorySession;

    fn open(&self, version: &str, license: LicenseType) -> Result<MemorySession> {
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(Error::HostUnavailable("host is not running".to_string()));
        }
        if !version.is_empty() && !self.versions.is_empty() && !self.versions.iter().any(|v| v == version)
        {
            return Err(Error::HostUnavailable(format!(
                "version '{}' is not installed",
                version
            )));
        }
        if !self.licenses.contains(&license) {
            return Err(Error::LicenseUnavailable(license));
        }

        let mut seats = self.shared.seats();
        if let Some(limit) = self.shared.launch_limit {
            if seats.opened_total >= limit {
                return Err(Error::HostUnavailable(format!(
                    "launch limit of {} sessions reached",
                    limit
                )));
            }
        }
        if seats.in_use >= seats.limit {
            return Err(Error::LicenseUnavailable(license));
        }
        let seat = seats.ids.request_id().ok_or(Error::LicenseUnavailable(license))?;
        seats.in_use += 1;
        seats.opened_total += 1;
        trace!("memory host: seat {} acquired ({} in use)", seat, seats.in_use);

        Ok(MemorySession {
            shared: self.shared.clone(),
            models: self.models.clone(),
            seat: Some(seat),
            visible: false,
            trust_models: false,
            loaded: None,
            context: None,
            loads: 0,
            scripts: Vec::new(),
        })
    }
}

enum RunState {
    Idle,
    Running {
        until: Instant,
        outcome: std::result::Result<(), String>,
    },
}

struct LoadedModel {
    path: PathBuf,
    template: MemoryModel,
    variables: FnvHashMap<String, (Option<ValueType>, Value)>,
    tables: FnvHashMap<String, MemoryTable>,
    run: RunState,
}

impl LoadedModel {
    fn new(path: PathBuf, template: MemoryModel) -> Self {
        let mut loaded = LoadedModel {
            path,
            template,
            variables: FnvHashMap::default(),
            tables: FnvHashMap::default(),
            run: RunState::Idle,
        };
        loaded.restore();
        loaded
    }

    /// Brings variables and tables back to their initial values.
    fn restore(&mut self) {
        self.variables = self
            .template
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), (v.value_type(), v.clone())))
            .collect();
        self.tables = self
            .template
            .tables
            .iter()
            .map(|(k, t)| (k.clone(), t.normalized()))
            .collect();
        self.run = RunState::Idle;
    }

    fn get(&self, path: &str) -> std::result::Result<&Value, String> {
        self.variables
            .get(path)
            .map(|(_, v)| v)
            .ok_or_else(|| format!("unknown variable {}", path))
    }

    fn assign(&mut self, path: &str, value: Value) -> Result<()> {
        let (ty, slot) = self
            .variables
            .get_mut(path)
            .ok_or_else(|| Error::VariableNotFound(path.to_string()))?;
        *slot = match ty {
            Some(t) => value.coerce_for(path, *t)?,
            None => value,
        };
        Ok(())
    }

    fn apply_rules(&mut self, context: Option<&str>) -> std::result::Result<(), String> {
        let rules = self.template.rules.clone();
        for rule in &rules {
            let (target, value) = match rule {
                Rule::Copy { target, source } => {
                    (target, self.get(&join_path(context, source))?.clone())
                }
                Rule::Not { target, source } => (
                    target,
                    Value::Bool(!self.get(&join_path(context, source))?.is_truthy()),
                ),
                Rule::Sum { target, sources } => {
                    (target, self.fold(context, sources, 0, |a, b| a + b)?)
                }
                Rule::Product { target, sources } => {
                    (target, self.fold(context, sources, 1, |a, b| a * b)?)
                }
                Rule::Set { target, value } => (target, value.clone()),
                Rule::Select {
                    target,
                    condition,
                    then,
                    otherwise,
                } => {
                    let value = match self.get(&join_path(context, condition))?.is_truthy() {
                        true => then.clone(),
                        false => otherwise.clone(),
                    };
                    (target, value)
                }
                Rule::Fail { condition, message } => {
                    if self.get(&join_path(context, condition))?.is_truthy() {
                        return Err(message
                            .clone()
                            .unwrap_or_else(|| format!("model raised error on {}", condition)));
                    }
                    continue;
                }
            };
            self.assign(&join_path(context, target), value)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Folds numeric sources, staying integral while all inputs are.
    fn fold(
        &self,
        context: Option<&str>,
        sources: &[String],
        init: i64,
        op: fn(f64, f64) -> f64,
    ) -> std::result::Result<Value, String> {
        let mut integral = true;
        let mut acc = init as f64;
        for source in sources {
            let path = join_path(context, source);
            let value = self.get(&path)?;
            if let Value::Float(_) = value {
                integral = false;
            }
            let n = value
                .as_f64()
                .ok_or_else(|| format!("non-numeric value in {}", path))?;
            acc = op(acc, n);
        }
        Ok(match integral {
            true => Value::Int(acc as i64),
            false => Value::Float(acc),
        })
    }
}

/// Single session with the in-memory host, holding one license seat.
pub struct MemorySession {
    shared: Arc<HostShared>,
    models: Arc<FnvHashMap<PathBuf, MemoryModel>>,
    seat: Option<u32>,
    visible: bool,
    trust_models: bool,
    loaded: Option<LoadedModel>,
    context: Option<String>,
    loads: usize,
    scripts: Vec<String>,
}

impl MemorySession {
    /// Script commands executed so far, in order.
    pub fn executed_scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn trusts_models(&self) -> bool {
        self.trust_models
    }

    /// Path of the currently loaded model.
    pub fn model_path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.path.as_path())
    }

    fn loaded(&mut self) -> Result<&mut LoadedModel> {
        if self.seat.is_none() {
            return Err(Error::HostUnavailable("session closed".to_string()));
        }
        self.loaded
            .as_mut()
            .ok_or_else(|| Error::Other("no model loaded".to_string()))
    }

    fn resolve(&self, name: &str) -> String {
        join_path(self.context.as_deref(), name)
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut MemoryTable> {
        let path = self.resolve(table);
        self.loaded()?
            .tables
            .get_mut(&path)
            .ok_or(Error::TableNotFound(path))
    }
}

impl AutomationSession for MemorySession {
    fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.visible = visible;
        Ok(())
    }

    fn set_trust_models(&mut self, trust: bool) -> Result<()> {
        self.trust_models = trust;
        Ok(())
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        if self.seat.is_none() {
            return Err(Error::HostUnavailable("session closed".to_string()));
        }
        let model = match self.models.get(path) {
            Some(m) => m.clone(),
            None => MemoryModel::from_path(path)?,
        };
        if model.reject_reload && self.loads > 0 {
            return Err(Error::ModelLoadFailed {
                path: path.to_string_lossy().to_string(),
                reason: "host refused to reload the model".to_string(),
            });
        }
        debug!("memory host: loading model {}", path.to_string_lossy());
        self.loaded = Some(LoadedModel::new(path.to_path_buf(), model));
        self.context = None;
        self.loads += 1;
        Ok(())
    }

    fn set_path_context(&mut self, path: &str) -> Result<()> {
        if !self.loaded()?.template.has_location(path) {
            return Err(Error::PathNotFound(path.to_string()));
        }
        self.context = Some(path.to_string());
        Ok(())
    }

    fn set_event_controller(&mut self, path: &str) -> Result<()> {
        match self.loaded()?.template.event_controllers.iter().any(|e| e == path) {
            true => Ok(()),
            false => Err(Error::PathNotFound(path.to_string())),
        }
    }

    fn get_value(&mut self, name: &str) -> Result<Value> {
        let path = self.resolve(name);
        self.loaded()?
            .variables
            .get(&path)
            .map(|(_, v)| v.clone())
            .ok_or(Error::VariableNotFound(path))
    }

    fn set_value(&mut self, name: &str, value: &Value) -> Result<()> {
        let path = self.resolve(name);
        self.loaded()?.assign(&path, value.clone())
    }

    fn table_dimensions(&mut self, table: &str) -> Result<(usize, usize)> {
        let t = self.table_mut(table)?;
        Ok((t.columns.len(), t.rows.len()))
    }

    fn resize_table(&mut self, table: &str, columns: usize, rows: usize) -> Result<()> {
        let t = self.table_mut(table)?;
        if t.max_rows.map_or(false, |max| rows > max)
            || t.max_columns.map_or(false, |max| columns > max)
        {
            return Err(Error::DimensionMismatch(format!(
                "host refused resizing {} to {}x{}",
                table, columns, rows
            )));
        }
        t.columns.resize(columns, String::new());
        t.column_types.truncate(columns);
        t.rows.resize(rows, Vec::new());
        for row in t.rows.iter_mut() {
            row.resize(columns, Value::Null);
        }
        Ok(())
    }

    fn get_table_cell(&mut self, table: &str, column: usize, row: usize) -> Result<Value> {
        let t = self.table_mut(table)?;
        if column == 0 || column > t.columns.len() {
            return Err(Error::DimensionMismatch(format!(
                "column {} outside of table with {} columns",
                column,
                t.columns.len()
            )));
        }
        if row == 0 {
            // unnamed columns have no header value
            return Ok(match t.columns[column - 1].as_str() {
                "" => Value::Null,
                name => Value::Str(name.to_string()),
            });
        }
        Ok(t.cell_mut(column - 1, row - 1)?.clone())
    }

    fn set_table_cell(
        &mut self,
        table: &str,
        column: usize,
        row: usize,
        value: &Value,
    ) -> Result<()> {
        let t = self.table_mut(table)?;
        if column == 0 || column > t.columns.len() {
            return Err(Error::DimensionMismatch(format!(
                "column {} outside of table with {} columns",
                column,
                t.columns.len()
            )));
        }
        if row == 0 {
            t.columns[column - 1] = match value {
                Value::Null => String::new(),
                v => v.to_string(),
            };
            return Ok(());
        }
        let value = match (t.column_type(column - 1), value) {
            (_, Value::Null) | (None, _) => value.clone(),
            (Some(ty), v) => v.clone().coerce_for(&format!("{}[{}, {}]", table, column, row), ty)?,
        };
        *t.cell_mut(column - 1, row - 1)? = value;
        Ok(())
    }

    fn start_run(&mut self, event_controller: &str) -> Result<()> {
        let context = self.context.clone();
        let loaded = self.loaded()?;
        if !loaded
            .template
            .event_controllers
            .iter()
            .any(|e| e == event_controller)
        {
            return Err(Error::PathNotFound(event_controller.to_string()));
        }
        if let RunState::Running { .. } = loaded.run {
            return Err(Error::RunFailed("simulation already running".to_string()));
        }

        let mut millis = loaded.template.run_duration_ms;
        if loaded.template.run_jitter_ms > 0 {
            millis += rand::thread_rng().gen_range(0, loaded.template.run_jitter_ms + 1);
        }
        if let Some(var) = loaded.template.duration_from.clone() {
            if let Ok(extra) = loaded.get(&join_path(context.as_deref(), &var)) {
                millis += extra.as_f64().unwrap_or(0.0).max(0.0) as u64;
            }
        }

        let outcome = loaded.apply_rules(context.as_deref());
        loaded.run = RunState::Running {
            until: Instant::now() + Duration::from_millis(millis),
            outcome,
        };
        Ok(())
    }

    fn is_running(&mut self) -> Result<bool> {
        let loaded = self.loaded()?;
        let finished = match &loaded.run {
            RunState::Idle => return Ok(false),
            RunState::Running { until, .. } => Instant::now() >= *until,
        };
        if !finished {
            return Ok(true);
        }
        match std::mem::replace(&mut loaded.run, RunState::Idle) {
            RunState::Running {
                outcome: Err(msg), ..
            } => Err(Error::RunFailed(msg)),
            _ => Ok(false),
        }
    }

    fn reset_run(&mut self, event_controller: &str) -> Result<()> {
        let loaded = self.loaded()?;
        if !loaded
            .template
            .event_controllers
            .iter()
            .any(|e| e == event_controller)
        {
            return Err(Error::PathNotFound(event_controller.to_string()));
        }
        loaded.restore();
        Ok(())
    }

    fn execute_script(
        &mut self,
        command: &str,
        parameter: Option<&Value>,
    ) -> Result<Option<Value>> {
        if self.loaded.is_none() {
            return Err(Error::ScriptFailed(format!(
                "no model loaded to execute: {}",
                command
            )));
        }
        self.scripts.push(command.to_string());
        Ok(parameter.cloned())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(seat) = self.seat.take() {
            let mut seats = self.shared.seats();
            let _ = seats.ids.return_id(seat);
            seats.in_use -= 1;
            trace!("memory host: seat {} released ({} in use)", seat, seats.in_use);
        }
        self.loaded = None;
        self.context = None;
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "line.spp";

    fn model() -> MemoryModel {
        MemoryModel::new()
            .frame(".Models.Frame")
            .event_controller(".Models.Frame.EventController")
            .variable(".Models.Frame.a", 2)
            .variable(".Models.Frame.b", 3.5)
            .variable(".Models.Frame.flag", false)
            .variable(".Models.Frame.total", 0.0)
            .variable(".Models.Frame.label", "")
            .rule(Rule::sum("total", &["a", "b"]))
            .rule(Rule::select("label", "flag", "on", "off"))
    }

    fn session(host: &MemoryHost) -> MemorySession {
        let mut s = host.open("", LicenseType::Professional).unwrap();
        s.load_model(Path::new(MODEL)).unwrap();
        s.set_path_context(".Models.Frame").unwrap();
        s
    }

    #[test]
    fn seats_are_limited_and_returned() {
        let host = MemoryHost::new(1).with_model(MODEL, model());
        let mut first = host.open("", LicenseType::Student).unwrap();
        assert_eq!(host.open_seats(), 1);
        match host.open("", LicenseType::Student) {
            Err(Error::LicenseUnavailable(LicenseType::Student)) => (),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("second seat granted"),
        }
        first.close().unwrap();
        first.close().unwrap();
        assert_eq!(host.open_seats(), 0);
        let second = host.open("", LicenseType::Student).unwrap();
        drop(second);
        assert_eq!(host.open_seats(), 0);
        assert_eq!(host.opened_total(), 2);
    }

    #[test]
    fn unknown_version_and_unavailable_host() {
        let host = MemoryHost::new(1).with_versions(&["16.1"]);
        assert!(host.open("16.1", LicenseType::Professional).is_ok());
        match host.open("15.0", LicenseType::Professional) {
            Err(Error::HostUnavailable(_)) => (),
            _ => panic!("expected HostUnavailable"),
        }
        host.set_available(false);
        match host.open("16.1", LicenseType::Professional) {
            Err(Error::HostUnavailable(_)) => (),
            _ => panic!("expected HostUnavailable"),
        }
        assert_eq!(host.open_seats(), 0);
    }

    #[test]
    fn missing_model_and_paths() {
        let host = MemoryHost::new(1).with_model(MODEL, model());
        let mut s = host.open("", LicenseType::Professional).unwrap();
        match s.load_model(Path::new("does/not/exist.spp")) {
            Err(Error::ModelNotFound(_)) => (),
            _ => panic!("expected ModelNotFound"),
        }
        s.load_model(Path::new(MODEL)).unwrap();
        match s.set_path_context(".Models.Nowhere") {
            Err(Error::PathNotFound(_)) => (),
            _ => panic!("expected PathNotFound"),
        }
        match s.set_event_controller(".Models.Frame.Clock") {
            Err(Error::PathNotFound(_)) => (),
            _ => panic!("expected PathNotFound"),
        }
    }

    #[test]
    fn rules_run_and_reset_restores_state() {
        let host = MemoryHost::new(1).with_model(MODEL, model());
        let mut s = session(&host);
        s.set_value("flag", &Value::Bool(true)).unwrap();
        s.start_run(".Models.Frame.EventController").unwrap();
        s.wait_for_run_complete(Duration::from_millis(1)).unwrap();
        assert_eq!(s.get_value("total").unwrap(), Value::Float(5.5));
        assert_eq!(s.get_value("label").unwrap(), Value::from("on"));

        s.reset_run(".Models.Frame.EventController").unwrap();
        assert_eq!(s.get_value("flag").unwrap(), Value::Bool(false));
        assert_eq!(s.get_value("total").unwrap(), Value::Float(0.0));
    }

    #[test]
    fn typed_variables_reject_mismatches() {
        let host = MemoryHost::new(1).with_model(MODEL, model());
        let mut s = session(&host);
        s.set_value("b", &Value::Int(4)).unwrap();
        assert_eq!(s.get_value("b").unwrap(), Value::Float(4.0));
        match s.set_value("flag", &Value::from("yes")) {
            Err(Error::TypeMismatch { .. }) => (),
            _ => panic!("expected TypeMismatch"),
        }
        match s.get_value("missing") {
            Err(Error::VariableNotFound(name)) => assert_eq!(name, ".Models.Frame.missing"),
            _ => panic!("expected VariableNotFound"),
        }
    }

    #[test]
    fn fail_rule_surfaces_after_run() {
        let model = model()
            .variable(".Models.Frame.broken", true)
            .rule(Rule::fail("broken"));
        let host = MemoryHost::new(1).with_model(MODEL, model);
        let mut s = session(&host);
        s.start_run(".Models.Frame.EventController").unwrap();
        match s.wait_for_run_complete(Duration::from_millis(1)) {
            Err(Error::RunFailed(_)) => (),
            _ => panic!("expected RunFailed"),
        }
        assert_eq!(s.is_running().unwrap(), false);
    }

    #[test]
    fn model_from_toml() {
        let text = r#"
            frames = [".Models.Frame"]
            event_controllers = [".Models.Frame.EventController"]
            run_duration_ms = 1

            [variables]
            ".Models.Frame.inspection" = false
            ".Models.Frame.simulation" = 0

            [tables.".Models.Frame.Data"]
            columns = ["Column1", "Column2"]
            rows = [[1, 3], [2, 4]]

            [[rules]]
            op = "select"
            target = "simulation"
            condition = "inspection"
            then = 42
            otherwise = 17
        "#;
        let model: MemoryModel = toml::from_str(text).unwrap();
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.tables[".Models.Frame.Data"].rows[1][1], Value::Int(4));
        assert_eq!(
            model.variables[".Models.Frame.inspection"],
            Value::Bool(false)
        );
    }

    #[test]
    fn loaded_cells_follow_column_types() {
        let table = MemoryTable::new(
            &["Column1", "Column2"],
            vec![
                vec![Value::Int(1), Value::Int(3)],
                vec![Value::Int(2), Value::from("n/a")],
            ],
        )
        .typed(&[ValueType::Int, ValueType::Float]);
        let host = MemoryHost::new(1).with_model(MODEL, model().table(".Models.Frame.Data", table));
        let mut s = host.open("", LicenseType::Professional).unwrap();
        s.load_model(Path::new(MODEL)).unwrap();
        assert_eq!(s.get_table_cell(".Models.Frame.Data", 2, 1).unwrap(), Value::Float(3.0));
        assert_eq!(s.get_table_cell(".Models.Frame.Data", 1, 2).unwrap(), Value::Int(2));
        assert_eq!(s.get_table_cell(".Models.Frame.Data", 2, 2).unwrap(), Value::from("n/a"));

        s.set_table_cell(".Models.Frame.Data", 2, 1, &Value::Int(9)).unwrap();
        s.reset_run(".Models.Frame.EventController").unwrap();
        assert_eq!(s.get_table_cell(".Models.Frame.Data", 2, 1).unwrap(), Value::Float(3.0));
    }
}
