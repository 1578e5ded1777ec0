// Archivo: composition.rs
// Propósito: composición de steps en flows secuenciales y en splits
// concurrentes ejecutados sobre un pool de workers acotado.
use crate::errors::{FlowError, Result};
use crate::step::Step;
use crate::tracker::ExecutionTracker;
use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;

/// Miembro de un flow secuencial: un step o un flow anidado.
pub enum FlowMember {
    Step(Arc<dyn Step>),
    Flow(Flow),
}

impl<S: Step + 'static> From<S> for FlowMember {
    fn from(step: S) -> Self {
        FlowMember::Step(Arc::new(step))
    }
}

impl From<Flow> for FlowMember {
    fn from(flow: Flow) -> Self {
        FlowMember::Flow(flow)
    }
}

impl FlowMember {
    fn execute(&self, tracker: &ExecutionTracker) -> Result<()> {
        match self {
            FlowMember::Step(step) => step.execute(tracker).map(|_| ()),
            FlowMember::Flow(flow) => flow.execute(tracker),
        }
    }

    fn collect_step_names(&self, out: &mut Vec<String>) {
        match self {
            FlowMember::Step(step) => out.push(step.name().to_string()),
            FlowMember::Flow(flow) => flow.collect_step_names(out),
        }
    }
}

enum FlowKind {
    Sequential(Vec<FlowMember>),
    Split { executor: Arc<ThreadPool>, branches: Vec<Flow> },
}

/// Flow con nombre: secuencial (orden total, fail-fast) o split (ramas
/// concurrentes unidas al final).
pub struct Flow {
    name: String,
    kind: FlowKind,
}

impl Flow {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_split(&self) -> bool {
        matches!(self.kind, FlowKind::Split { .. })
    }

    /// Nombres de todos los steps contenidos, en orden de declaración.
    pub fn step_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_step_names(&mut out);
        out
    }

    fn collect_step_names(&self, out: &mut Vec<String>) {
        match &self.kind {
            FlowKind::Sequential(members) => members.iter().for_each(|m| m.collect_step_names(out)),
            FlowKind::Split { branches, .. } => branches.iter().for_each(|b| b.collect_step_names(out)),
        }
    }

    pub fn execute(&self, tracker: &ExecutionTracker) -> Result<()> {
        match &self.kind {
            FlowKind::Sequential(members) => self.execute_sequential(members, tracker),
            FlowKind::Split { executor, branches } => self.execute_split(executor, branches, tracker),
        }
    }

    fn execute_sequential(&self, members: &[FlowMember], tracker: &ExecutionTracker) -> Result<()> {
        info!("flow '{}' iniciado ({} miembros)", self.name, members.len());
        for member in members {
            if let Err(e) = member.execute(tracker) {
                warn!("flow '{}' detenido: {}", self.name, e);
                return Err(e);
            }
        }
        info!("flow '{}' completado", self.name);
        Ok(())
    }

    /// Lanza todas las ramas en el pool y espera a que terminen todas. Un
    /// fallo no cancela a las ramas hermanas.
    fn execute_split(&self, executor: &ThreadPool, branches: &[Flow], tracker: &ExecutionTracker) -> Result<()> {
        info!("flow '{}' lanzando {} ramas en paralelo (workers={})",
              self.name,
              branches.len(),
              executor.current_num_threads());
        let results: Vec<Result<()>> =
            executor.install(|| branches.par_iter().with_max_len(1).map(|b| b.execute(tracker)).collect());
        let failures: Vec<FlowError> = results.into_iter().filter_map(|r| r.err()).collect();
        if failures.is_empty() {
            info!("flow '{}' completado", self.name);
            Ok(())
        } else {
            warn!("flow '{}' fallido en {} de {} ramas", self.name, failures.len(), branches.len());
            Err(FlowError::SplitFailed { flow: self.name.clone(),
                                         failures })
        }
    }
}

/// Constructor de flows secuenciales.
///
/// ```rust
/// use flow::FlowBuilder;
/// use std::sync::Arc;
/// let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
/// let inner = FlowBuilder::new("vacio").split(pool).build();
/// assert!(inner.is_err());
/// ```
pub struct FlowBuilder {
    name: String,
    members: Vec<FlowMember>,
}

impl FlowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               members: Vec::new() }
    }

    /// Primer miembro del flow.
    pub fn start(mut self, member: impl Into<FlowMember>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Miembro siguiente: se ejecuta cuando el anterior termina.
    pub fn next(mut self, member: impl Into<FlowMember>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Convierte el builder en un split cuyas ramas corren en `executor`.
    pub fn split(self, executor: Arc<ThreadPool>) -> SplitFlowBuilder {
        SplitFlowBuilder { name: self.name,
                           executor,
                           branches: Vec::new() }
    }

    pub fn build(self) -> Result<Flow> {
        if self.members.is_empty() {
            return Err(FlowError::InvalidDefinition(format!("flow '{}' sin miembros", self.name)));
        }
        Ok(Flow { name: self.name,
                  kind: FlowKind::Sequential(self.members) })
    }
}

/// Constructor de flows split.
pub struct SplitFlowBuilder {
    name: String,
    executor: Arc<ThreadPool>,
    branches: Vec<Flow>,
}

impl SplitFlowBuilder {
    pub fn add(mut self, branch: Flow) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn build(self) -> Result<Flow> {
        if self.branches.is_empty() {
            return Err(FlowError::InvalidDefinition(format!("split '{}' sin ramas", self.name)));
        }
        Ok(Flow { name: self.name,
                  kind: FlowKind::Split { executor: self.executor,
                                          branches: self.branches } })
    }
}
