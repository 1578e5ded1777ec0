use thiserror::Error;

// Errores del workflow de clientes.
//
// Agrupa los errores del motor (`FlowError`), del dominio y persistencia
// (`DomainError`) y del pool de hilos, más los de configuración propios de
// este crate.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores originados en el motor de flujo.
  #[error("Error de flujo: {0}")]
  Flow(#[from] flow::FlowError),

  /// Errores del dominio o de la capa de persistencia.
  #[error("Error de dominio: {0}")]
  Domain(#[from] customer_domain::DomainError),

  #[error("Error creando el pool de hilos: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),

  /// Configuración inválida (variables de entorno mal formadas, tamaños a
  /// cero, pool demasiado pequeño).
  #[error("Error de configuración: {0}")]
  Config(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
