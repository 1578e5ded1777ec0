use crate::errors::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Configuración del job de comparación. Se carga de variables de entorno
/// (`BATCH_*`) con `from_env`, leyendo antes un `.env` si existe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
  /// URL del almacén (`BATCH_DB_URL`, o `DATABASE_URL`).
  pub db_url: String,
  pub pool_size: u32,
  /// Items por transacción.
  pub chunk_size: usize,
  /// Filas por consulta del lector.
  pub page_size: usize,
  pub sequential_steps: usize,
  pub parallel_steps: usize,
  /// Hilos del pool que ejecuta las ramas del split.
  pub split_threads: usize,
  pub seed_threads: usize,
  pub seed_records_per_thread: u64,
  pub seed_insert_batch: usize,
  /// Imprimir el resumen del job en JSON al terminar.
  pub report_json: bool,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self { db_url: "batch_customers.db".to_string(),
           pool_size: 8,
           chunk_size: 1000,
           page_size: 1000,
           sequential_steps: 2,
           parallel_steps: 2,
           split_threads: 2,
           seed_threads: 10,
           seed_records_per_thread: 10_000,
           seed_insert_batch: 1000,
           report_json: false }
  }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
  match lookup(key) {
    Some(raw) => raw.trim()
                    .parse::<T>()
                    .map_err(|_| WorkflowError::Config(format!("{}: valor inválido '{}'", key, raw))),
    None => Ok(default),
  }
}

impl BatchConfig {
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Igual que `from_env` pero leyendo de una función arbitraria.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let d = Self::default();
    let db_url = lookup("BATCH_DB_URL").or_else(|| lookup("DATABASE_URL")).unwrap_or(d.db_url);
    let report_json = match lookup("BATCH_REPORT_JSON") {
      Some(raw) => matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
      None => d.report_json,
    };
    let config = Self { db_url,
                        pool_size: parse_or(&lookup, "BATCH_POOL_SIZE", d.pool_size)?,
                        chunk_size: parse_or(&lookup, "BATCH_CHUNK_SIZE", d.chunk_size)?,
                        page_size: parse_or(&lookup, "BATCH_PAGE_SIZE", d.page_size)?,
                        sequential_steps: parse_or(&lookup, "BATCH_SEQUENTIAL_STEPS", d.sequential_steps)?,
                        parallel_steps: parse_or(&lookup, "BATCH_PARALLEL_STEPS", d.parallel_steps)?,
                        split_threads: parse_or(&lookup, "BATCH_SPLIT_THREADS", d.split_threads)?,
                        seed_threads: parse_or(&lookup, "BATCH_SEED_THREADS", d.seed_threads)?,
                        seed_records_per_thread: parse_or(&lookup,
                                                          "BATCH_SEED_RECORDS_PER_THREAD",
                                                          d.seed_records_per_thread)?,
                        seed_insert_batch: parse_or(&lookup, "BATCH_SEED_INSERT_BATCH", d.seed_insert_batch)?,
                        report_json };
    config.validate()?;
    Ok(config)
  }

  /// Total de clientes que crea el seeding.
  pub fn seed_total(&self) -> u64 {
    self.seed_threads as u64 * self.seed_records_per_thread
  }

  pub fn validate(&self) -> Result<()> {
    if self.db_url.trim().is_empty() {
      return Err(WorkflowError::Config("db_url vacío".into()));
    }
    let sizes = [("pool_size", self.pool_size as usize),
                 ("chunk_size", self.chunk_size),
                 ("page_size", self.page_size),
                 ("sequential_steps", self.sequential_steps),
                 ("parallel_steps", self.parallel_steps),
                 ("split_threads", self.split_threads),
                 ("seed_threads", self.seed_threads),
                 ("seed_insert_batch", self.seed_insert_batch)];
    if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
      return Err(WorkflowError::Config(format!("{} debe ser mayor que 0", name)));
    }
    // cada rama del split usa una conexión y el hilo principal otra
    if (self.pool_size as usize) < self.split_threads + 1 {
      return Err(WorkflowError::Config(format!("pool_size ({}) debe ser al menos split_threads + 1 ({})",
                                               self.pool_size,
                                               self.split_threads + 1)));
    }
    Ok(())
  }
}
