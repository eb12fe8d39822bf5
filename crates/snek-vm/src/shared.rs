//! A VM shared between threads behind one lock

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::error::Result;
use crate::heap::GcConfig;
use crate::vm::Vm;

/// A [`Vm`] behind a single mutex.
///
/// No VM operation is safe to run concurrently with another, so every
/// operation, including collection, goes through the one lock. Clones share
/// the same VM.
#[derive(Debug, Clone, Default)]
pub struct SharedVm {
    inner: Arc<Mutex<Vm>>,
}

impl SharedVm {
    /// Wrap an existing VM
    pub fn new(vm: Vm) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vm)),
        }
    }

    /// Create a shared VM with custom config
    pub fn with_config(config: GcConfig) -> Result<Self> {
        Ok(Self::new(Vm::with_config(config)?))
    }

    /// Lock the VM for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Vm> {
        self.inner.lock()
    }

    /// Run `f` with the VM locked
    pub fn with<R>(&self, f: impl FnOnce(&mut Vm) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_threads_share_one_heap() {
        let shared = SharedVm::default();
        let frame = shared.with(|vm| vm.new_frame()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        shared.with(|vm| {
                            let obj = vm.new_integer(t * 100 + i).unwrap();
                            if i % 5 == 0 {
                                vm.frame_reference(frame, obj).unwrap();
                            }
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut vm = shared.lock();
        assert_eq!(vm.object_count(), 100);
        vm.collect_garbage();
        assert_eq!(vm.object_count(), 20);
        assert_eq!(vm.frame(frame).map(|f| f.len()), Some(20));
    }
}
