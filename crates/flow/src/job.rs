// Archivo: job.rs
// Propósito: el `Job` de nivel superior: ejecuta sus flows en orden,
// dispara los listeners antes/después y bloquea reinicios si así se
// configuró.
use crate::composition::Flow;
use crate::errors::{FlowError, Result};
use crate::step::StepExecution;
use crate::timing::TimingReport;
use crate::tracker::ExecutionTracker;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Estado de una ejecución de job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Started,
    Completed,
    Failed,
}

/// Ejecución concreta de un job: identidad, estado, tiempos y registros de
/// steps.
#[derive(Debug)]
pub struct JobExecution {
    pub id: Uuid,
    pub job_name: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Mensaje del error que hizo fallar el job.
    pub failure: Option<String>,
    /// Steps que terminaron en `Failed`.
    pub failed_steps: Vec<String>,
    tracker: ExecutionTracker,
}

impl JobExecution {
    fn new(job_name: &str) -> Self {
        Self { id: Uuid::new_v4(),
               job_name: job_name.to_string(),
               status: JobStatus::Starting,
               started_at: Utc::now(),
               ended_at: None,
               failure: None,
               failed_steps: Vec::new(),
               tracker: ExecutionTracker::new() }
    }

    pub fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    /// Registros de todos los steps que llegaron a arrancar.
    pub fn step_executions(&self) -> Vec<StepExecution> {
        self.tracker.records()
    }

    pub fn timing_report(&self) -> TimingReport {
        TimingReport::from_records(&self.tracker.records())
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    /// Resumen serializable para informes.
    pub fn summary(&self) -> JobSummary {
        JobSummary { id: self.id,
                     job_name: self.job_name.clone(),
                     status: self.status,
                     started_at: self.started_at,
                     ended_at: self.ended_at,
                     failure: self.failure.clone(),
                     steps: self.step_executions(),
                     timing: self.timing_report() }
    }

    fn finish(&mut self, failure: Option<FlowError>) {
        self.ended_at = Some(Utc::now());
        match failure {
            None => self.status = JobStatus::Completed,
            Some(e) => {
                self.status = JobStatus::Failed;
                self.failed_steps = e.failed_steps();
                self.failure = Some(e.to_string());
            }
        }
    }
}

/// Vista serializable de una `JobExecution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub job_name: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
    pub steps: Vec<StepExecution>,
    pub timing: TimingReport,
}

pub type JobHook = Box<dyn Fn(&JobExecution) + Send + Sync>;

/// Par de callbacks invocados al inicio y al final del job. El callback
/// `after` se invoca siempre, también cuando el job falla.
#[derive(Default)]
pub struct JobListener {
    before: Option<JobHook>,
    after: Option<JobHook>,
}

impl JobListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before(mut self, hook: impl Fn(&JobExecution) + Send + Sync + 'static) -> Self {
        self.before = Some(Box::new(hook));
        self
    }

    pub fn on_after(mut self, hook: impl Fn(&JobExecution) + Send + Sync + 'static) -> Self {
        self.after = Some(Box::new(hook));
        self
    }

    fn before_job(&self, execution: &JobExecution) {
        if let Some(hook) = &self.before {
            hook(execution);
        }
    }

    fn after_job(&self, execution: &JobExecution) {
        if let Some(hook) = &self.after {
            hook(execution);
        }
    }
}

/// Job: flows ejecutados en orden con listeners de ciclo de vida.
pub struct Job {
    name: String,
    flows: Vec<Flow>,
    listeners: Vec<JobListener>,
    restartable: bool,
    launched: AtomicBool,
}

impl Job {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_restartable(&self) -> bool {
        self.restartable
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// Ejecuta el job. Un fallo de flow no se devuelve como `Err`: queda
    /// reflejado en `JobExecution::status`. `Err` sólo indica que el job no
    /// pudo lanzarse.
    pub fn run(&self) -> Result<JobExecution> {
        if self.launched.swap(true, Ordering::SeqCst) && !self.restartable {
            return Err(FlowError::RestartPrevented(self.name.clone()));
        }
        let mut execution = JobExecution::new(&self.name);
        info!("job '{}' lanzado (ejecución {})", self.name, execution.id);
        self.listeners.iter().for_each(|l| l.before_job(&execution));
        execution.status = JobStatus::Started;

        let mut failure = None;
        for flow in &self.flows {
            if let Err(e) = flow.execute(&execution.tracker) {
                error!("job '{}': flow '{}' fallido: {}", self.name, flow.name(), e);
                failure = Some(e);
                break;
            }
        }
        execution.finish(failure);
        self.listeners.iter().for_each(|l| l.after_job(&execution));
        info!("job '{}' terminado con estado {:?}", self.name, execution.status);
        Ok(execution)
    }
}

/// Constructor de jobs.
pub struct JobBuilder {
    name: String,
    flows: Vec<Flow>,
    listeners: Vec<JobListener>,
    restartable: bool,
}

impl JobBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               flows: Vec::new(),
               listeners: Vec::new(),
               restartable: true }
    }

    /// Un job lanzado una vez no puede volver a ejecutarse.
    pub fn prevent_restart(mut self) -> Self {
        self.restartable = false;
        self
    }

    pub fn listener(mut self, listener: JobListener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn start(mut self, flow: Flow) -> Self {
        self.flows.push(flow);
        self
    }

    pub fn next(mut self, flow: Flow) -> Self {
        self.flows.push(flow);
        self
    }

    pub fn build(self) -> Result<Job> {
        if self.flows.is_empty() {
            return Err(FlowError::InvalidDefinition(format!("job '{}' sin flows", self.name)));
        }
        // los registros de ejecución se indexan por nombre de step
        let mut seen = HashSet::new();
        for step in self.flows.iter().flat_map(|f| f.step_names()) {
            if !seen.insert(step.clone()) {
                return Err(FlowError::InvalidDefinition(format!("job '{}': step '{}' repetido", self.name, step)));
            }
        }
        Ok(Job { name: self.name,
                 flows: self.flows,
                 listeners: self.listeners,
                 restartable: self.restartable,
                 launched: AtomicBool::new(false) })
    }
}
