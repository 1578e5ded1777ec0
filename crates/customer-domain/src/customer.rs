// customer.rs
use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefijo de los nombres provisionales generados por el seeding.
pub const PLACEHOLDER_PREFIX: &str = "InitialName";

/// Nombre provisional del cliente número `index`.
pub fn placeholder_name(index: u64) -> String {
  format!("{}{}", PLACEHOLDER_PREFIX, index)
}

/// Cliente persistido. El `id` lo asigna el almacenamiento en la primera
/// inserción y no cambia después.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  id: i64,
  name: String,
}

impl Customer {
  /// Reconstruye un cliente a partir de una fila del almacenamiento.
  pub fn from_parts(id: i64, name: impl Into<String>) -> Self {
    Customer { id, name: name.into() }
  }

  pub fn id(&self) -> i64 {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn update_name(&mut self, name: impl Into<String>) {
    self.name = name.into();
  }

  /// Asigna un nombre nuevo y único (UUID v4). Dos llamadas nunca dejan el
  /// mismo valor.
  pub fn assign_fresh_name(&mut self) {
    self.update_name(Uuid::new_v4().to_string());
  }

  pub fn is_placeholder(&self) -> bool {
    self.name.starts_with(PLACEHOLDER_PREFIX)
  }

  /// Regla del almacenamiento: el nombre no puede quedar vacío.
  pub fn validate(&self) -> Result<(), DomainError> {
    if self.name.is_empty() {
      return Err(DomainError::ValidationError(format!("cliente {}: nombre vacío", self.id)));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_names_differ_and_are_not_placeholders() {
    let mut c = Customer::from_parts(7, placeholder_name(7));
    assert!(c.is_placeholder());
    c.assign_fresh_name();
    let first = c.name().to_string();
    c.assign_fresh_name();
    assert_ne!(first, c.name());
    assert!(!c.is_placeholder());
    assert_eq!(c.id(), 7);
  }

  #[test]
  fn empty_names_are_rejected() {
    let c = Customer::from_parts(1, "");
    assert!(matches!(c.validate(), Err(DomainError::ValidationError(_))));
    assert_eq!(serde_json::to_value(Customer::from_parts(1, "a")).unwrap()["name"], "a");
  }
}
