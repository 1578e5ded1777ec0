//! batch-workflow: job de comparación sobre clientes
//!
//! Conecta el motor `flow` con el dominio de clientes: lector paginado por
//! rango de ids, procesador que renombra, escritor transaccional, seeding
//! inicial del almacén y la fábrica que arma el job `comparisonJob` (un flow
//! secuencial seguido de un split paralelo).

pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod factory;
pub mod listener;

pub use batch::{CustomerProcessor, CustomerReader, CustomerWriter};
pub use bootstrap::{ensure_seeded, open_repository};
pub use config::BatchConfig;
pub use errors::{Result, WorkflowError};
pub use factory::{assemble_comparison_job, build_customer_comparison_job, StepComponents};
pub use listener::timing_report_listener;
