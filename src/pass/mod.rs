//! The pass driver interface (spec §6): each pass exposes `run(graph)`; a
//! [`PassManager`] composes passes in a user-specified sequence and, when a
//! [`StatisticsCollector`] is supplied, records one line per pass per spec
//! §6's statistics format.
//!
//! This is deliberately the lean end of the spectrum compared to a
//! dialect-registering, analysis-caching pass manager (the teacher's own
//! `OpPassManager`/MLIR-style `PassManager`): the operation catalog is
//! closed and there is exactly one kind of IR (a single `Graph`), so none of
//! that machinery pulls its weight here — a `Vec<Box<dyn Pass>>` run in
//! order is the whole of it, matching jlm's flat `jlm-opt` pass list.

mod stats;

pub use stats::{PassCounters, PassRecord, StatisticsCollector};

use crate::{ir::Graph, traversal, Result};

/// A semantics-preserving rewrite over a whole graph (spec §4.7, §6).
/// Implementations report pass-specific counters (e.g. nodes removed) via
/// the returned [`PassCounters`]; the [`PassManager`] fills in the common
/// fields (pass id, timestamps, before/after size).
pub trait Pass {
    /// The pass's statistics-record id (spec §6, `pass-id`).
    fn name(&self) -> &'static str;

    /// Runs the pass over `graph` in place, returning whatever
    /// pass-specific counters it wants recorded.
    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters>;
}

/// Total live node count across the whole module, root region included
/// (used as the statistics record's `before-size`/`after-size`).
pub fn graph_size(graph: &Graph) -> usize {
    let mut count = 0usize;
    traversal::walk_topdown(graph, graph.root(), &mut |_| count += 1);
    count
}

/// Composes passes in a fixed, user-specified order (spec §6, "Pass driver
/// interface").
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Runs every pass in sequence. If `stats` is supplied, one record is
    /// appended per pass, regardless of whether that pass changed anything.
    pub fn run(&mut self, graph: &mut Graph, mut stats: Option<&mut StatisticsCollector<'_>>) -> Result<()> {
        for pass in &mut self.passes {
            let before_size = graph_size(graph);
            let start = stats::now_millis();
            let counters = pass.run(graph)?;
            let end = stats::now_millis();
            let after_size = graph_size(graph);

            log::debug!(
                target: "rvsdg::pass",
                "ran pass {} ({before_size} -> {after_size} nodes)",
                pass.name()
            );

            if let Some(collector) = stats.as_deref_mut() {
                let record = PassRecord {
                    pass_id: pass.name(),
                    start_timestamp_millis: start,
                    end_timestamp_millis: end,
                    before_size,
                    after_size,
                    counters,
                };
                let _ = collector.record(&record);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Operation;

    struct NoopPass;
    impl Pass for NoopPass {
        fn name(&self) -> &'static str {
            "noop"
        }
        fn run(&mut self, _graph: &mut Graph) -> Result<PassCounters> {
            Ok(PassCounters::new())
        }
    }

    #[test]
    fn manager_runs_passes_in_order_and_records_stats() {
        let mut g = Graph::new();
        g.create_node(g.root(), Operation::BitConstant { value: 1, width: 32 }, &[])
            .unwrap();

        let mut manager = PassManager::new();
        manager.add(NoopPass);

        let mut buf = Vec::new();
        {
            let mut collector = StatisticsCollector::new(&mut buf);
            manager.run(&mut g, Some(&mut collector)).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("pass-id=noop"));
        assert!(text.contains("before-size=1"));
    }

    #[test]
    fn graph_size_counts_nested_regions() {
        let mut g = Graph::new();
        let mut lambda = g
            .create_lambda(
                g.root(),
                crate::types::FunctionType {
                    args: vec![],
                    results: vec![],
                },
                &[],
            )
            .unwrap();
        let subregion = lambda.subregion();
        lambda
            .graph_mut()
            .create_node(subregion, Operation::BitConstant { value: 1, width: 32 }, &[])
            .unwrap();
        lambda.finalize(&[]).unwrap();

        assert_eq!(graph_size(&g), 2);
    }
}
