//! Scenarios command - replay the reference GC scenarios with diagnostics.

use anyhow::{Result, ensure};
use clap::{Args, ValueEnum};
use snek_vm::{GcConfig, Vm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// One rooted string, then its frame is popped
    Simple,
    /// Three frames, a vector rooted in two of them
    Full,
    /// One string rooted in two frames
    Shared,
}

impl Scenario {
    const ALL: [Scenario; 3] = [Scenario::Simple, Scenario::Full, Scenario::Shared];

    fn name(self) -> &'static str {
        match self {
            Scenario::Simple => "simple",
            Scenario::Full => "full",
            Scenario::Shared => "shared_reference",
        }
    }
}

#[derive(Args)]
pub struct ScenariosCommand {
    /// Run only this scenario
    #[arg(long, value_enum)]
    pub name: Option<Scenario>,

    /// List the live objects after every collection
    #[arg(long)]
    pub dump: bool,
}

impl ScenariosCommand {
    pub fn run(&self, config: &GcConfig) -> Result<()> {
        let selected: Vec<Scenario> = match self.name {
            Some(scenario) => vec![scenario],
            None => Scenario::ALL.to_vec(),
        };

        for scenario in selected {
            println!("==== Running {} ====", scenario.name());
            let mut runner = Runner {
                vm: Vm::with_config(config.clone())?,
                dump: self.dump,
            };
            match scenario {
                Scenario::Simple => runner.simple()?,
                Scenario::Full => runner.full()?,
                Scenario::Shared => runner.shared()?,
            }
            let Runner { vm, .. } = runner;
            vm.free();
            println!("==== {} passed ====\n", scenario.name());
        }

        println!("All scenarios passed.");
        Ok(())
    }
}

/// Live objects as `handle type (tag N, B bytes)` lines
fn heap_listing(vm: &Vm) -> Vec<String> {
    vm.heap()
        .iter()
        .map(|(handle, object)| {
            format!(
                "{handle} {} (tag {}, {} bytes)",
                object.type_name(),
                object.tag(),
                object.heap_size()
            )
        })
        .collect()
}

struct Runner {
    vm: Vm,
    dump: bool,
}

impl Runner {
    fn expect_count(&self, expected: usize) -> Result<()> {
        let live = self.vm.object_count();
        ensure!(
            live == expected,
            "expected {expected} live objects, found {live}"
        );
        Ok(())
    }

    fn collect(&mut self, label: &str) {
        let outcome = self.vm.collect_garbage();
        println!(
            "[gc] {label}. Object count: {} (freed {})",
            self.vm.object_count(),
            outcome.freed_objects
        );
        if self.dump {
            for line in heap_listing(&self.vm) {
                println!("[heap]   {line}");
            }
        }
    }

    fn simple(&mut self) -> Result<()> {
        println!("[init] VM created. Object count: {}", self.vm.object_count());

        let f1 = self.vm.new_frame()?;
        println!("[frame] Frame f1 created.");

        let s = self.vm.new_string("I wish I knew how to read.")?;
        self.vm.frame_reference(f1, s)?;
        println!("[alloc] String object allocated and referenced in f1.");

        self.collect("Garbage collected");
        self.expect_count(1)?;

        self.vm.frame_pop().release();
        println!("[frame] Frame f1 popped and freed.");

        self.collect("Garbage collected");
        self.expect_count(0)
    }

    fn full(&mut self) -> Result<()> {
        let f1 = self.vm.new_frame()?;
        let f2 = self.vm.new_frame()?;
        let f3 = self.vm.new_frame()?;
        println!("[frame] Frames f1, f2, f3 created.");

        for (frame, label) in [(f1, "frame 1"), (f2, "frame 2"), (f3, "frame 3")] {
            let s = self.vm.new_string(label)?;
            self.vm.frame_reference(frame, s)?;
            println!("[alloc] \"{label}\" assigned to {frame}.");
        }

        let i1 = self.vm.new_integer(69)?;
        let i2 = self.vm.new_integer(420)?;
        let i3 = self.vm.new_integer(1337)?;
        let v = self.vm.new_vector3(i1, i2, i3)?;
        println!("[alloc] vector v created from i1, i2, i3.");

        self.vm.frame_reference(f2, v)?;
        self.vm.frame_reference(f3, v)?;
        println!("[ref] vector v referenced in f2 and f3.");

        println!("[info] Object count before GC: {}", self.vm.object_count());
        self.expect_count(7)?;

        self.vm.frame_pop().release();
        println!("[frame] Frame f3 popped and freed.");
        self.collect("GC after freeing f3");
        self.expect_count(6)?;

        self.vm.frame_pop().release();
        println!("[frame] Frame f2 popped and freed.");
        self.vm.frame_pop().release();
        println!("[frame] Frame f1 popped and freed.");

        self.collect("Final GC");
        self.expect_count(0)
    }

    fn shared(&mut self) -> Result<()> {
        let f1 = self.vm.new_frame()?;
        let f2 = self.vm.new_frame()?;
        println!("[frame] Frames f1 and f2 created.");

        let shared = self.vm.new_string("I'm shared!")?;
        self.vm.frame_reference(f1, shared)?;
        self.vm.frame_reference(f2, shared)?;
        println!("[ref] Shared string referenced in both f1 and f2.");

        self.collect("After initial GC");
        self.expect_count(1)?;

        self.vm.frame_pop().release();
        println!("[frame] Frame f2 popped and freed.");
        self.collect("GC after freeing f2");
        self.expect_count(1)?;

        self.vm.frame_pop().release();
        println!("[frame] Frame f1 popped and freed.");
        self.collect("GC after freeing f1");
        self.expect_count(0)
    }
}
