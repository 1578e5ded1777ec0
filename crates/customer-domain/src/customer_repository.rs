// customer_repository.rs
use crate::{Customer, DomainError, IdRange};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Operaciones de persistencia que necesita el procesamiento de clientes.
///
/// Las implementaciones deben ser seguras entre hilos: los steps de un split
/// comparten el mismo repositorio.
pub trait CustomerRepository: Send + Sync {
  /// Número total de clientes.
  fn count(&self) -> Result<u64, DomainError>;

  /// Número de clientes cuyo nombre empieza por `prefix`.
  fn count_with_name_prefix(&self, prefix: &str) -> Result<u64, DomainError>;

  /// Id mínimo y máximo, o `None` si no hay clientes.
  fn id_bounds(&self) -> Result<Option<(i64, i64)>, DomainError>;

  /// Inserta un cliente por nombre en una sola transacción y devuelve cuántos
  /// se insertaron. Los ids los asigna el almacenamiento.
  fn insert_names(&self, names: &[String]) -> Result<usize, DomainError>;

  /// Hasta `limit` clientes dentro de `range` con id estrictamente mayor que
  /// `after`, ordenados por id ascendente.
  fn fetch_page(&self, range: &IdRange, after: Option<i64>, limit: usize) -> Result<Vec<Customer>, DomainError>;

  /// Upsert atómico por id: o se guardan todos o ninguno.
  fn save_all(&self, customers: &[Customer]) -> Result<(), DomainError>;

  fn get(&self, id: i64) -> Result<Option<Customer>, DomainError>;
}

struct Store {
  rows: BTreeMap<i64, String>,
  next_id: i64,
}

/// Repositorio en memoria, útil para pruebas y para ejecutar el job sin base
/// de datos.
pub struct InMemoryCustomerRepository {
  store: Mutex<Store>,
}

impl InMemoryCustomerRepository {
  pub fn new() -> Self {
    Self { store: Mutex::new(Store { rows: BTreeMap::new(), next_id: 1 }) }
  }

  fn lock(&self) -> Result<MutexGuard<'_, Store>, DomainError> {
    self.store
        .lock()
        .map_err(|e| DomainError::ExternalError(format!("Mutex 'customers' poisoned: {}", e)))
  }
}

impl Default for InMemoryCustomerRepository {
  fn default() -> Self {
    Self::new()
  }
}

impl CustomerRepository for InMemoryCustomerRepository {
  fn count(&self) -> Result<u64, DomainError> {
    Ok(self.lock()?.rows.len() as u64)
  }

  fn count_with_name_prefix(&self, prefix: &str) -> Result<u64, DomainError> {
    Ok(self.lock()?.rows.values().filter(|n| n.starts_with(prefix)).count() as u64)
  }

  fn id_bounds(&self) -> Result<Option<(i64, i64)>, DomainError> {
    let store = self.lock()?;
    let first = store.rows.keys().next().copied();
    let last = store.rows.keys().next_back().copied();
    Ok(first.zip(last))
  }

  fn insert_names(&self, names: &[String]) -> Result<usize, DomainError> {
    if names.iter().any(|n| n.is_empty()) {
      return Err(DomainError::ValidationError("nombre vacío en el lote".to_string()));
    }
    let mut store = self.lock()?;
    for name in names {
      let id = store.next_id;
      store.next_id += 1;
      store.rows.insert(id, name.clone());
    }
    Ok(names.len())
  }

  fn fetch_page(&self, range: &IdRange, after: Option<i64>, limit: usize) -> Result<Vec<Customer>, DomainError> {
    if range.is_empty() || limit == 0 {
      return Ok(Vec::new());
    }
    let store = self.lock()?;
    let lower = match after {
      Some(a) if a >= range.start => a.saturating_add(1),
      _ => range.start,
    };
    if lower >= range.end {
      return Ok(Vec::new());
    }
    Ok(store.rows
            .range(lower..range.end)
            .take(limit)
            .map(|(id, name)| Customer::from_parts(*id, name.clone()))
            .collect())
  }

  fn save_all(&self, customers: &[Customer]) -> Result<(), DomainError> {
    for c in customers {
      c.validate()?;
    }
    let mut store = self.lock()?;
    for c in customers {
      store.rows.insert(c.id(), c.name().to_string());
      if c.id() >= store.next_id {
        store.next_id = c.id() + 1;
      }
    }
    Ok(())
  }

  fn get(&self, id: i64) -> Result<Option<Customer>, DomainError> {
    Ok(self.lock()?.rows.get(&id).map(|n| Customer::from_parts(id, n.clone())))
  }
}
