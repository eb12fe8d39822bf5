//! Stress command - allocation churn with a rooted subset.

use anyhow::{Result, ensure};
use clap::Args;
use snek_vm::{GcConfig, Vm};

#[derive(Args)]
pub struct StressCommand {
    /// Objects to allocate
    #[arg(long, default_value_t = 100_000)]
    pub objects: usize,

    /// Root every Nth allocation
    #[arg(long, default_value_t = 10)]
    pub keep_every: usize,

    /// Collect after this many allocations (0 collects only when the threshold is reached)
    #[arg(long, default_value_t = 0)]
    pub collect_every: usize,
}

/// Outcome of a stress run
#[derive(Debug, PartialEq, Eq)]
pub struct StressReport {
    pub allocated: usize,
    pub rooted: usize,
    pub live: usize,
    pub collections: u64,
    /// Live object count that triggered collection when `--collect-every` is 0
    pub threshold: usize,
}

impl StressCommand {
    pub fn run(&self, config: &GcConfig) -> Result<()> {
        let report = self.execute(config)?;
        println!(
            "allocated {} objects, {} rooted, {} live after {} collections (threshold {})",
            report.allocated, report.rooted, report.live, report.collections, report.threshold
        );
        Ok(())
    }

    pub fn execute(&self, config: &GcConfig) -> Result<StressReport> {
        ensure!(self.keep_every > 0, "--keep-every must be at least 1");

        let mut vm = Vm::with_config(config.clone())?;
        let frame = vm.new_frame()?;
        let mut rooted = 0;
        let mut previous = None;

        for i in 0..self.objects {
            let obj = match (i % 3, previous) {
                (0, _) => vm.new_integer(i as i64)?,
                (1, _) | (_, None) => vm.new_string(&format!("object {i}"))?,
                (_, Some(prev)) => {
                    let leaf = vm.new_float(i as f64)?;
                    vm.new_vector3(prev, leaf, prev)?
                }
            };
            previous = Some(obj);

            if i % self.keep_every == 0 {
                vm.frame_reference(frame, obj)?;
                rooted += 1;
            }

            let due = if self.collect_every == 0 {
                vm.should_gc()
            } else {
                (i + 1) % self.collect_every == 0
            };
            if due {
                vm.collect_garbage();
                tracing::debug!(live = vm.object_count(), "collected");
                // `previous` may have been unrooted garbage
                previous = previous.filter(|&prev| vm.get(prev).is_some());
            }
        }

        vm.collect_garbage();
        let stats = vm.stats();
        tracing::info!(
            collections = stats.collections,
            total_pause_us = stats.total_pause.as_micros() as u64,
            live_bytes = vm.total_bytes(),
            "stress run complete"
        );

        Ok(StressReport {
            allocated: self.objects,
            rooted,
            live: vm.object_count(),
            collections: stats.collections,
            threshold: vm.config().gc_threshold,
        })
    }
}
