use crate::config::BatchConfig;
use crate::errors::Result;
use customer_domain::{placeholder_name, CustomerRepository};
use customer_persistence::DieselCustomerRepository;
use log::info;
use rayon::prelude::*;
use std::time::Instant;

/// Abre el almacén configurado (pool + migraciones).
pub fn open_repository(config: &BatchConfig) -> Result<DieselCustomerRepository> {
  Ok(DieselCustomerRepository::connect(&config.db_url, config.pool_size)?)
}

/// Inserta los nombres `[from, to)` en lotes de `batch` filas.
fn seed_slice(repo: &dyn CustomerRepository, from: u64, to: u64, batch: usize) -> Result<u64> {
  let mut inserted = 0u64;
  let mut next = from;
  while next < to {
    let end = (next + batch as u64).min(to);
    let names: Vec<String> = (next..end).map(placeholder_name).collect();
    inserted += repo.insert_names(&names)? as u64;
    next = end;
  }
  Ok(inserted)
}

/// Si el almacén está vacío lo llena con `seed_threads * seed_records_per_thread`
/// clientes provisionales. Cada hilo del pool inserta su propio tramo de
/// índices. Devuelve el número de clientes al terminar.
pub fn ensure_seeded(repo: &dyn CustomerRepository, config: &BatchConfig) -> Result<u64> {
  let existing = repo.count()?;
  if existing > 0 {
    info!("el almacén ya contiene {} clientes; se omite el seeding", existing);
    return Ok(existing);
  }
  let threads = config.seed_threads;
  let per_thread = config.seed_records_per_thread;
  info!("seeding de {} clientes con {} hilos", config.seed_total(), threads);
  let started = Instant::now();
  let pool = rayon::ThreadPoolBuilder::new().num_threads(threads)
                                            .thread_name(|i| format!("seed-{}", i))
                                            .build()?;
  let inserted: Vec<u64> = pool.install(|| {
                                 (0..threads as u64).into_par_iter()
                                                    .map(|t| {
                                                      seed_slice(repo,
                                                                 t * per_thread,
                                                                 (t + 1) * per_thread,
                                                                 config.seed_insert_batch)
                                                    })
                                                    .collect::<Result<Vec<u64>>>()
                               })?;
  let total = repo.count()?;
  info!("seeding completado: {} insertados en {} ms, {} clientes en el almacén",
        inserted.iter().sum::<u64>(),
        started.elapsed().as_millis(),
        total);
  Ok(total)
}
