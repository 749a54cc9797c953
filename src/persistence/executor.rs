//! Spawning fire-and-forget persistence work
//!
//! The session never awaits anything. It hands futures to a [`TaskSpawner`]:
//! in the browser that is `wasm_bindgen_futures::spawn_local`, natively it is
//! the spawner of a `futures` [`LocalPool`](futures::executor::LocalPool) the
//! host drains once per frame.

use futures::executor::LocalSpawner;
use futures::task::{LocalFutureObj, LocalSpawn};

use super::LocalFuture;

/// Something that can run a local future to completion in the background
pub trait TaskSpawner {
    fn spawn_local(&self, task: LocalFuture<()>);
}

/// Tasks wait in the pool until `run_until_stalled`, so tests can hold a
/// save in flight across a reset.
impl TaskSpawner for LocalSpawner {
    fn spawn_local(&self, task: LocalFuture<()>) {
        if let Err(e) = self.spawn_local_obj(LocalFutureObj::new(task)) {
            log::warn!("Dropping background task: {}", e);
        }
    }
}

/// Browser spawner backed by the JS microtask queue
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmSpawner;

#[cfg(target_arch = "wasm32")]
impl TaskSpawner for WasmSpawner {
    fn spawn_local(&self, task: LocalFuture<()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
