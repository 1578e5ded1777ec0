// Archivo: tracker.rs
// Propósito: registro concurrente de `StepExecution` por nombre de step.
use crate::step::StepExecution;
use dashmap::DashMap;

/// Registro de ejecuciones de steps compartido por todos los flows de un
/// job. Los steps escriben su registro al arrancar y al terminar, de modo que
/// un fallo a mitad de ejecución conserva el timestamp de inicio.
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    records: DashMap<String, StepExecution>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self { records: DashMap::new() }
    }

    /// Inserta o reemplaza el registro del step.
    pub fn record(&self, execution: StepExecution) {
        self.records.insert(execution.step_name.clone(), execution);
    }

    pub fn get(&self, step_name: &str) -> Option<StepExecution> {
        self.records.get(step_name).map(|r| r.value().clone())
    }

    /// Copia de todos los registros ordenada por inicio (los que no
    /// arrancaron quedan al final) y luego por nombre.
    pub fn records(&self) -> Vec<StepExecution> {
        let mut out: Vec<StepExecution> = self.records.iter().map(|r| r.value().clone()).collect();
        out.sort_by(|a, b| match (a.started_at, b.started_at) {
               (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.step_name.cmp(&b.step_name)),
               (Some(_), None) => std::cmp::Ordering::Less,
               (None, Some(_)) => std::cmp::Ordering::Greater,
               (None, None) => a.step_name.cmp(&b.step_name),
           });
        out
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
