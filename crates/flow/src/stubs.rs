// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un proveedor de páginas sobre un `Vec` (`VecPageProvider`) y un
// destino que registra los chunks confirmados (`RecordingSink`). No son
// durables y se usan para demos o pruebas locales.
use crate::errors::{FlowError, Result};
use crate::item::{ItemSink, PageProvider};
use std::sync::{Arc, Mutex};

/// Paginación por offset sobre un vector.
pub struct VecPageProvider<T> {
    items: Vec<T>,
    offset: usize,
}

impl<T> VecPageProvider<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, offset: 0 }
    }
}

impl<T: Clone + Send + Sync> PageProvider<T> for VecPageProvider<T> {
    fn reset(&mut self) -> Result<()> {
        self.offset = 0;
        Ok(())
    }

    fn next_page(&mut self, page_size: usize) -> Result<Vec<T>> {
        let end = (self.offset + page_size).min(self.items.len());
        let page = self.items[self.offset.min(end)..end].to_vec();
        self.offset = end;
        Ok(page)
    }
}

/// Chunks confirmados por un `RecordingSink`, compartidos con el test.
pub type SinkLog<T> = Arc<Mutex<Vec<Vec<T>>>>;

/// Destino en memoria que registra cada chunk confirmado. Con
/// `failing_on(k)` el chunk número `k` (base 1) falla y no se registra.
pub struct RecordingSink<T> {
    log: SinkLog<T>,
    fail_on_chunk: Option<usize>,
    attempts: usize,
}

impl<T> RecordingSink<T> {
    pub fn new() -> Self {
        Self { log: Arc::new(Mutex::new(Vec::new())),
               fail_on_chunk: None,
               attempts: 0 }
    }

    pub fn failing_on(chunk_number: usize) -> Self {
        Self { fail_on_chunk: Some(chunk_number),
               ..Self::new() }
    }

    /// Handle para inspeccionar los chunks confirmados.
    pub fn log(&self) -> SinkLog<T> {
        self.log.clone()
    }
}

impl<T> Default for RecordingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> ItemSink<T> for RecordingSink<T> {
    fn write(&mut self, chunk: &[T]) -> Result<()> {
        self.attempts += 1;
        if self.fail_on_chunk == Some(self.attempts) {
            return Err(FlowError::Sink(format!("fallo simulado en chunk {}", self.attempts)));
        }
        self.log
            .lock()
            .map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))?
            .push(chunk.to_vec());
        Ok(())
    }
}
