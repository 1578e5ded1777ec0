// id_range.rs
use crate::errors::DomainError;
use serde::{Deserialize, Serialize};

/// Rango semiabierto `[start, end)` de ids de cliente. Es el filtro fijo que
/// recibe cada lector: dos steps con rangos disjuntos nunca tocan el mismo
/// cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdRange {
  pub start: i64,
  pub end: i64,
}

impl IdRange {
  pub fn new(start: i64, end: i64) -> Result<Self, DomainError> {
    if start > end {
      return Err(DomainError::ValidationError(format!("rango inválido [{}, {})", start, end)));
    }
    Ok(IdRange { start, end })
  }

  /// Todos los ids representables.
  pub fn all() -> Self {
    IdRange { start: i64::MIN, end: i64::MAX }
  }

  /// Rango que cubre `[min, max]` (ambos inclusive).
  pub fn covering(min: i64, max: i64) -> Result<Self, DomainError> {
    Self::new(min, max.saturating_add(1))
  }

  pub fn contains(&self, id: i64) -> bool {
    id >= self.start && id < self.end
  }

  pub fn is_empty(&self) -> bool {
    self.start >= self.end
  }

  pub fn len(&self) -> u64 {
    (self.end as i128 - self.start as i128).max(0) as u64
  }

  /// Divide en `parts` rangos contiguos y disjuntos que cubren exactamente
  /// este rango. Los primeros reciben el resto de la división.
  pub fn split(&self, parts: usize) -> Result<Vec<IdRange>, DomainError> {
    if parts == 0 {
      return Err(DomainError::ValidationError("no se puede dividir en 0 partes".to_string()));
    }
    let total = self.end as i128 - self.start as i128;
    let base = total / parts as i128;
    let rem = total % parts as i128;
    let mut out = Vec::with_capacity(parts);
    let mut cursor = self.start as i128;
    for i in 0..parts as i128 {
      let size = base + if i < rem { 1 } else { 0 };
      let next = cursor + size;
      out.push(IdRange { start: cursor as i64, end: next as i64 });
      cursor = next;
    }
    Ok(out)
  }
}
