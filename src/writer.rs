//! Writes one group's edges, one database round-trip per ordered pair.
//!
//! A failed pair is logged and recorded in the report; it never stops the
//! rest of the group. Pairs are written sequentially.
use log::error;

use crate::graph::{EdgeStore, EntityKind};
use crate::grouping::Group;

/// How rows returned by each write add up to the reported total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountMode {
    /// Every successful pair's rows are added.
    #[default]
    Sum,
    /// Per member, only the rows of its last successful pair count.
    LastWrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    pub kind: EntityKind,
    pub source: String,
    pub target: String,
    pub result: Result<usize, String>,
}

impl PairOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub attempted: usize,
    pub failed: usize,
    /// Total according to the `CountMode` in use.
    pub updated: usize,
    pub outcomes: Vec<PairOutcome>,
}

impl WriteReport {
    pub fn absorb(&mut self, other: WriteReport) {
        self.attempted += other.attempted;
        self.failed += other.failed;
        self.updated += other.updated;
        self.outcomes.extend(other.outcomes);
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

pub async fn write_group<S: EdgeStore + ?Sized>(
    store: &S,
    group: &Group,
    domain: &str,
    kind: EntityKind,
    mode: CountMode,
) -> WriteReport {
    let mut report = WriteReport::default();
    for member in &group.members {
        let source = kind.qualify(member, domain);
        let mut last_rows = 0;
        for other in group.peers(member) {
            let target = kind.qualify(other, domain);
            report.attempted += 1;
            let result = match store.create_pair(kind, &source, &target).await {
                Ok(rows) => {
                    last_rows = rows;
                    if mode == CountMode::Sum {
                        report.updated += rows;
                    }
                    Ok(rows)
                }
                Err(e) => {
                    error!("{} {} -> {}: {}", kind.relationship(), source, target, e);
                    report.failed += 1;
                    Err(e.to_string())
                }
            };
            report.outcomes.push(PairOutcome {
                kind,
                source: source.clone(),
                target,
                result,
            });
        }
        if mode == CountMode::LastWrite {
            report.updated += last_rows;
        }
    }
    report
}

pub async fn write_groups<S: EdgeStore + ?Sized>(
    store: &S,
    groups: &[Group],
    domain: &str,
    kind: EntityKind,
    mode: CountMode,
) -> WriteReport {
    let mut report = WriteReport::default();
    for group in groups {
        report.absorb(write_group(store, group, domain, kind, mode).await);
    }
    report
}
