// Archivo: step.rs
// Propósito: implementar el step por chunks (`ChunkStep`): lee items de un
// `ItemSource`, los transforma y los escribe en chunks de tamaño fijo, donde
// cada chunk es una unidad transaccional.
use crate::errors::{poisoned, FlowError, Result};
use crate::item::{ItemSink, ItemSource, ItemTransformer};
use crate::tracker::ExecutionTracker;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

/// Categoría de un step para el informe de tiempos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCategory {
    Sequential,
    Parallel,
}

impl StepCategory {
    /// Todas las categorías, en el orden en que se informan.
    pub const ALL: [StepCategory; 2] = [StepCategory::Sequential, StepCategory::Parallel];

    /// Etiqueta legible usada en el informe.
    pub fn label(&self) -> &'static str {
        match self {
            StepCategory::Sequential => "Procesamiento secuencial",
            StepCategory::Parallel => "Procesamiento paralelo",
        }
    }

    /// Prefijo de nombre de step asociado a la categoría.
    pub fn step_prefix(&self) -> &'static str {
        match self {
            StepCategory::Sequential => "sequentialStep",
            StepCategory::Parallel => "parallelStep",
        }
    }

    /// Clasifica por prefijo de nombre. Sólo se usa cuando el step no fue
    /// etiquetado explícitamente.
    pub fn from_step_name(name: &str) -> Option<StepCategory> {
        Self::ALL.into_iter().find(|c| name.starts_with(c.step_prefix()))
    }
}

impl fmt::Display for StepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepCategory::Sequential => "sequential",
            StepCategory::Parallel => "parallel",
        };
        write!(f, "{}", s)
    }
}

/// Estado de un step: `Idle → Running → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Registro de ejecución de un step (Execution Record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_name: String,
    pub category: Option<StepCategory>,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub read_count: u64,
    pub write_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
    pub failure: Option<String>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>, category: Option<StepCategory>) -> Self {
        Self { step_name: step_name.into(),
               category,
               status: StepStatus::Idle,
               started_at: None,
               ended_at: None,
               read_count: 0,
               write_count: 0,
               commit_count: 0,
               rollback_count: 0,
               failure: None }
    }

    /// Duración del step en milisegundos si tiene ambos timestamps.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(s), Some(e)) => Some((e - s).num_milliseconds()),
            _ => None,
        }
    }

    fn begin(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
        self.ended_at = None;
        self.failure = None;
    }

    fn finish(&mut self, failure: Option<&FlowError>) {
        self.ended_at = Some(Utc::now());
        match failure {
            None => self.status = StepStatus::Completed,
            Some(e) => {
                self.status = StepStatus::Failed;
                self.failure = Some(e.to_string());
            }
        }
    }
}

/// Unidad ejecutable dentro de un flow.
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> Option<StepCategory>;

    fn status(&self) -> StepStatus;

    /// Ejecuta el step completo y devuelve su registro. Si falla, el error
    /// se devuelve envuelto en `FlowError::StepFailed` y el registro (con
    /// su timestamp de fin) queda en el `tracker`.
    fn execute(&self, tracker: &ExecutionTracker) -> Result<StepExecution>;
}

/// Step de lectura-proceso-escritura por chunks.
pub struct ChunkStep<T> {
    name: String,
    category: Option<StepCategory>,
    chunk_size: usize,
    source: Mutex<Box<dyn ItemSource<T>>>,
    transformer: Arc<dyn ItemTransformer<T>>,
    sink: Mutex<Box<dyn ItemSink<T>>>,
    status: Mutex<StepStatus>,
}

impl<T> ChunkStep<T> {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn lock<'a, V>(&'a self, m: &'a Mutex<V>) -> Result<MutexGuard<'a, V>> {
        m.lock().map_err(poisoned)
    }

    fn transition(&self, next: StepStatus) -> Result<()> {
        let mut status = self.lock(&self.status)?;
        if next == StepStatus::Running && *status == StepStatus::Running {
            return Err(FlowError::InvalidState(format!("step '{}' ya está en ejecución", self.name)));
        }
        *status = next;
        Ok(())
    }

    /// Bucle principal: el chunk N se escribe antes de leer el chunk N+1.
    fn process_chunks(&self,
                      source: &mut dyn ItemSource<T>,
                      sink: &mut dyn ItemSink<T>,
                      record: &mut StepExecution)
                      -> Result<()> {
        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            let mut exhausted = false;
            while chunk.len() < self.chunk_size {
                match source.next()? {
                    Some(item) => {
                        record.read_count += 1;
                        match self.transformer.transform(item) {
                            Ok(t) => chunk.push(t),
                            Err(e) => {
                                record.rollback_count += 1;
                                return Err(e);
                            }
                        }
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if !chunk.is_empty() {
                if let Err(e) = sink.write(&chunk) {
                    record.rollback_count += 1;
                    return Err(e);
                }
                record.commit_count += 1;
                record.write_count += chunk.len() as u64;
                debug!("step '{}': chunk {} confirmado ({} items)",
                       self.name,
                       record.commit_count,
                       chunk.len());
            }
            if exhausted {
                return Ok(());
            }
        }
    }

    fn run(&self, record: &mut StepExecution) -> Result<()> {
        let mut source = self.lock(&self.source)?;
        let mut sink = self.lock(&self.sink)?;
        source.open()?;
        // un pánico en el transformador o el destino falla el chunk como cualquier error
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                          self.process_chunks(source.as_mut(), sink.as_mut(), record)
                      })).unwrap_or_else(|payload| {
                             record.rollback_count += 1;
                             Err(FlowError::Transform(format!("pánico en step '{}': {}",
                                                              self.name,
                                                              panic_message(payload.as_ref()))))
                         });
        let closed = source.close();
        outcome.and(closed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "causa desconocida".to_string()
    }
}

impl<T: 'static> Step for ChunkStep<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Option<StepCategory> {
        self.category
    }

    fn status(&self) -> StepStatus {
        self.status.lock().map(|s| *s).unwrap_or_else(|e| *e.into_inner())
    }

    fn execute(&self, tracker: &ExecutionTracker) -> Result<StepExecution> {
        self.transition(StepStatus::Running)?;
        let mut record = StepExecution::new(self.name.clone(), self.category);
        record.begin();
        tracker.record(record.clone());
        info!("step '{}' iniciado (chunk={})", self.name, self.chunk_size);

        let outcome = self.run(&mut record);
        record.finish(outcome.as_ref().err());
        tracker.record(record.clone());
        self.transition(record.status)?;

        match outcome {
            Ok(()) => {
                info!("step '{}' completado: leídos={} escritos={} commits={}",
                      self.name, record.read_count, record.write_count, record.commit_count);
                Ok(record)
            }
            Err(e) => {
                error!("step '{}' fallido tras {} commits: {}", self.name, record.commit_count, e);
                Err(FlowError::StepFailed { step: self.name.clone(),
                                            source: Box::new(e) })
            }
        }
    }
}

/// Constructor ergonómico de `ChunkStep`.
///
/// ```rust
/// use flow::stubs::{RecordingSink, VecPageProvider};
/// use flow::{PagingItemSource, StepBuilder, StepCategory};
/// let source = PagingItemSource::new("reader", 10, Box::new(VecPageProvider::new(vec![1, 2, 3]))).unwrap();
/// let step = StepBuilder::new("sequentialStep1").category(StepCategory::Sequential)
///                                                .chunk(2)
///                                                .reader(source)
///                                                .processor(|x: i32| -> flow::Result<i32> { Ok(x * 10) })
///                                                .writer(RecordingSink::new())
///                                                .build()
///                                                .unwrap();
/// assert_eq!(step.chunk_size(), 2);
/// ```
pub struct StepBuilder<T> {
    name: String,
    category: Option<StepCategory>,
    chunk_size: Option<usize>,
    source: Option<Box<dyn ItemSource<T>>>,
    transformer: Option<Arc<dyn ItemTransformer<T>>>,
    sink: Option<Box<dyn ItemSink<T>>>,
}

impl<T: 'static> StepBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               category: None,
               chunk_size: None,
               source: None,
               transformer: None,
               sink: None }
    }

    /// Etiqueta explícita de categoría. Sin ella se clasifica por prefijo.
    pub fn category(mut self, category: StepCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn chunk(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn reader(mut self, source: impl ItemSource<T> + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn boxed_reader(mut self, source: Box<dyn ItemSource<T>>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn processor(mut self, transformer: impl ItemTransformer<T> + 'static) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    /// Comparte un transformador ya construido entre varios steps.
    pub fn shared_processor(mut self, transformer: Arc<dyn ItemTransformer<T>>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn writer(mut self, sink: impl ItemSink<T> + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn boxed_writer(mut self, sink: Box<dyn ItemSink<T>>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<ChunkStep<T>> {
        let missing = |what: &str| FlowError::InvalidDefinition(format!("step '{}': falta {}", self.name, what));
        let chunk_size = self.chunk_size.ok_or_else(|| missing("chunk"))?;
        if chunk_size == 0 {
            return Err(FlowError::InvalidDefinition(format!("step '{}': chunk debe ser >= 1", self.name)));
        }
        let source = self.source.ok_or_else(|| missing("reader"))?;
        let transformer = self.transformer.ok_or_else(|| missing("processor"))?;
        let sink = self.sink.ok_or_else(|| missing("writer"))?;
        let category = self.category.or_else(|| StepCategory::from_step_name(&self.name));
        Ok(ChunkStep { name: self.name,
                       category,
                       chunk_size,
                       source: Mutex::new(source),
                       transformer,
                       sink: Mutex::new(sink),
                       status: Mutex::new(StepStatus::Idle) })
    }
}
