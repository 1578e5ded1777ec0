// Archivo: timing.rs
// Propósito: agregar los registros de ejecución por categoría y derivar la
// duración de cada una como (fin máximo - inicio mínimo).
use crate::step::{StepCategory, StepExecution};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Acumulador de tiempos de una categoría (milisegundos epoch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTiming {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub steps: usize,
}

impl CategoryTiming {
    /// Incorpora un step con ambos timestamps.
    pub fn update(&mut self, step_start_ms: i64, step_end_ms: i64) {
        self.start_ms = Some(self.start_ms.map_or(step_start_ms, |s| s.min(step_start_ms)));
        self.end_ms = Some(self.end_ms.map_or(step_end_ms, |e| e.max(step_end_ms)));
        self.steps += 1;
    }

    /// `None` cuando ningún step de la categoría registró inicio y fin.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_ms, self.end_ms) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        }
    }
}

/// Informe de tiempos: siempre contiene todas las categorías, en el orden de
/// `StepCategory::ALL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingReport {
    categories: IndexMap<StepCategory, CategoryTiming>,
}

impl TimingReport {
    pub fn from_records<'a, I>(records: I) -> Self
        where I: IntoIterator<Item = &'a StepExecution>
    {
        let mut categories: IndexMap<StepCategory, CategoryTiming> =
            StepCategory::ALL.iter().map(|c| (*c, CategoryTiming::default())).collect();
        for record in records {
            let Some(category) = record.category else { continue };
            if let (Some(start), Some(end)) = (record.started_at, record.ended_at) {
                if let Some(timing) = categories.get_mut(&category) {
                    timing.update(start.timestamp_millis(), end.timestamp_millis());
                }
            }
        }
        Self { categories }
    }

    pub fn get(&self, category: StepCategory) -> Option<&CategoryTiming> {
        self.categories.get(&category)
    }

    pub fn duration_ms(&self, category: StepCategory) -> Option<i64> {
        self.get(category).and_then(|t| t.duration_ms())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepCategory, &CategoryTiming)> {
        self.categories.iter()
    }

    /// Una línea por categoría: duración en ms o aviso de "no disponible".
    pub fn lines(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|(category, timing)| match timing.duration_ms() {
                Some(ms) => format!("{} tiempo total: {} ms", category.label(), ms),
                None => format!("{}: información de tiempo no disponible", category.label()),
            })
            .collect()
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}
