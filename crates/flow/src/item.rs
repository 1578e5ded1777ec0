// Archivo: item.rs
// Propósito: contratos de lectura, transformación y escritura de items
// (`ItemSource`, `ItemTransformer`, `ItemSink`) y el origen paginado
// genérico `PagingItemSource`.
use crate::errors::{FlowError, Result};
use std::collections::VecDeque;

/// Origen ordenado y perezoso de items.
///
/// `open` establece un cursor estable, `next` devuelve el siguiente item o
/// `None` al final de la secuencia y `close` libera recursos. Cada step
/// posee su propia instancia: dos steps nunca comparten cursor.
pub trait ItemSource<T>: Send {
    fn open(&mut self) -> Result<()>;

    fn next(&mut self) -> Result<Option<T>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Función de transformación aplicada item a item.
///
/// Debe poder invocarse de forma concurrente desde steps distintos, por eso
/// recibe `&self` y exige `Send + Sync`.
pub trait ItemTransformer<T>: Send + Sync {
    fn transform(&self, item: T) -> Result<T>;
}

impl<T, F> ItemTransformer<T> for F where F: Fn(T) -> Result<T> + Send + Sync
{
    fn transform(&self, item: T) -> Result<T> {
        self(item)
    }
}

/// Destino transaccional de chunks.
///
/// `write` persiste todos los items del chunk como una unidad atómica: o
/// llegan todos al almacenamiento o ninguno. La implementación no debe
/// retener referencias a chunks previos.
pub trait ItemSink<T>: Send {
    fn write(&mut self, chunk: &[T]) -> Result<()>;
}

/// Proveedor de páginas hacia adelante para `PagingItemSource`.
///
/// `reset` vuelve al inicio de la secuencia; `next_page` devuelve como
/// máximo `page_size` items. Una página más corta que `page_size` indica que
/// no hay más datos.
pub trait PageProvider<T>: Send {
    fn reset(&mut self) -> Result<()>;

    fn next_page(&mut self, page_size: usize) -> Result<Vec<T>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// `ItemSource` paginado: mantiene en memoria como máximo una página.
pub struct PagingItemSource<T> {
    name: String,
    page_size: usize,
    provider: Box<dyn PageProvider<T>>,
    buffer: VecDeque<T>,
    exhausted: bool,
    opened: bool,
    pages_read: u64,
}

impl<T> PagingItemSource<T> {
    pub fn new(name: impl Into<String>, page_size: usize, provider: Box<dyn PageProvider<T>>) -> Result<Self> {
        let name = name.into();
        if page_size == 0 {
            return Err(FlowError::InvalidDefinition(format!("source '{}': page_size debe ser >= 1", name)));
        }
        Ok(Self { name,
                  page_size,
                  provider,
                  buffer: VecDeque::with_capacity(page_size),
                  exhausted: false,
                  opened: false,
                  pages_read: 0 })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Número de páginas leídas desde el último `open`.
    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }
}

impl<T: Send> ItemSource<T> for PagingItemSource<T> {
    fn open(&mut self) -> Result<()> {
        self.provider.reset()?;
        self.buffer.clear();
        self.exhausted = false;
        self.pages_read = 0;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<T>> {
        if !self.opened {
            return Err(FlowError::Source(format!("source '{}' no está abierto", self.name)));
        }
        if self.buffer.is_empty() && !self.exhausted {
            let page = self.provider.next_page(self.page_size)?;
            self.pages_read += 1;
            if page.len() < self.page_size {
                self.exhausted = true;
            }
            self.buffer.extend(page);
        }
        Ok(self.buffer.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.opened = false;
        self.provider.close()
    }
}
