// Archivo: errors.rs
// Propósito: definir los errores del motor de lotes y el alias Result<T>
// usado por las APIs del crate.
use thiserror::Error;

/// Errores del motor de procesamiento por chunks.
///
/// - `Source`: fallo al leer del origen de items.
/// - `Transform`: fallo del transformador sobre un item.
/// - `Sink`: fallo al escribir/confirmar un chunk (el chunk se revierte).
/// - `StepFailed`: un step terminó en `Failed`; envuelve la causa.
/// - `SplitFailed`: una o más ramas de un split fallaron.
/// - `RestartPrevented`: el job ya fue lanzado y no admite reinicio.
/// - `InvalidDefinition`: definición de step/flow/job inválida.
/// - `InvalidState`: operación no permitida en el estado actual.
/// - `Storage`: error interno de almacenamiento (p.ej. mutex envenenado).
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Error de lectura: {0}")]
    Source(String),
    #[error("Error de transformación: {0}")]
    Transform(String),
    #[error("Error de escritura: {0}")]
    Sink(String),
    #[error("Step '{step}' fallido: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<FlowError>,
    },
    #[error("Flow '{flow}' fallido en {} rama(s): {}", .failures.len(), join_failures(.failures))]
    SplitFailed { flow: String, failures: Vec<FlowError> },
    #[error("Job '{0}' ya fue ejecutado y no admite reinicio")]
    RestartPrevented(String),
    #[error("Definición inválida: {0}")]
    InvalidDefinition(String),
    #[error("Estado inválido: {0}")]
    InvalidState(String),
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
}

impl FlowError {
    /// Nombres de los steps fallidos contenidos en este error (recursivo).
    pub fn failed_steps(&self) -> Vec<String> {
        match self {
            FlowError::StepFailed { step, .. } => vec![step.clone()],
            FlowError::SplitFailed { failures, .. } => failures.iter().flat_map(|f| f.failed_steps()).collect(),
            _ => Vec::new(),
        }
    }
}

fn join_failures(failures: &[FlowError]) -> String {
    failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;

pub(crate) fn poisoned<E: std::fmt::Debug>(e: E) -> FlowError {
    FlowError::Storage(format!("mutex poisoned: {:?}", e))
}
