// Task worker -- drains the queue one task per tick.

use std::sync::Arc;

use super::Shared;

pub(super) fn spawn(shared: Arc<Shared>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("task-worker".into())
        .spawn(move || worker_loop(shared))?;
    Ok(())
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        std::thread::sleep(shared.interval);

        let task = {
            let mut state = shared.lock();
            match state.tasks.pop_front() {
                Some(task) => {
                    state.running = true;
                    task
                }
                None if state.passes_active > 0 => continue,
                None => {
                    // Decided under the lock, so a concurrent push sees
                    // worker_alive == false and spawns a replacement
                    state.worker_alive = false;
                    shared.changed.notify_all();
                    return;
                }
            }
        };

        // Catch panics so one bad file cannot stall the queue
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Task worker: task failed: {}", e),
            Err(_) => log::error!("Task worker: task panicked (recovered)"),
        }

        let mut state = shared.lock();
        state.running = false;
        shared.changed.notify_all();
    }
}
