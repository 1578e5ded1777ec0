//! Crate `flow`: motor de procesamiento por lotes en chunks
//!
//! Este crate define los contratos de lectura/transformación/escritura de
//! items (`ItemSource`, `ItemTransformer`, `ItemSink`), el step por chunks
//! (`ChunkStep`), la composición de steps en flows secuenciales o
//! concurrentes (`Flow`), el `Job` de nivel superior con sus listeners, y el
//! agregador de tiempos por categoría (`TimingReport`).
//!
//! Diseño resumido:
//! - Chunk = transacción: cada chunk se escribe con una sola llamada a
//!   `ItemSink::write`, que debe ser atómica.
//! - Flow secuencial: orden total y fail-fast.
//! - Flow split: ramas en un `rayon::ThreadPool` acotado; un fallo no cancela
//!   a las ramas hermanas, el split falla cuando todas han terminado.
//! - Registros de ejecución por step en un `ExecutionTracker` concurrente.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::stubs::{RecordingSink, VecPageProvider};
//! use flow::{FlowBuilder, JobBuilder, PagingItemSource, StepBuilder};
//! let source = PagingItemSource::new("reader", 4, Box::new(VecPageProvider::new((0..10).collect::<Vec<u32>>()))).unwrap();
//! let sink = RecordingSink::new();
//! let log = sink.log();
//! let step = StepBuilder::new("sequentialStep1").chunk(3)
//!                                               .reader(source)
//!                                               .processor(|x: u32| -> flow::Result<u32> { Ok(x + 1) })
//!                                               .writer(sink)
//!                                               .build()
//!                                               .unwrap();
//! let job = JobBuilder::new("demo").start(FlowBuilder::new("f").start(step).build().unwrap()).build().unwrap();
//! let execution = job.run().unwrap();
//! assert!(!execution.is_failed());
//! assert_eq!(log.lock().unwrap().len(), 4);
//! ```
pub mod composition;
pub mod errors;
pub mod item;
pub mod job;
pub mod step;
pub mod stubs;
pub mod timing;
pub mod tracker;

pub use composition::*;
pub use errors::*;
pub use item::*;
pub use job::*;
pub use step::*;
pub use timing::*;
pub use tracker::*;
