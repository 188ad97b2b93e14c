use std::future::Future;

use tokio::select;
use tokio::spawn;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Tracks every task the client spawns so that shutdown can signal all of
/// them and wait for the lot to finish.
pub struct TaskManager {
    hold_tx: Mutex<Option<mpsc::Sender<()>>>,
    hold_rx: Mutex<mpsc::Receiver<()>>,
    stop_tx: broadcast::Sender<()>,
}

impl TaskManager {
    pub fn new() -> Self {
        let (hold_tx, hold_rx) = mpsc::channel(1);
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            // Another task may invalidate `hold_tx` once shutdown begins,
            // so both halves sit behind a mutex.
            hold_tx: Mutex::new(Some(hold_tx)),
            hold_rx: Mutex::new(hold_rx),
            stop_tx,
        }
    }

    /// Spawn a task under this manager. Requests made after `stop` began
    /// are ignored; the returned handle then resolves immediately.
    pub async fn spawn<F, T>(&self, f: F) -> Task
    where
        F: FnOnce(TaskContext) -> T + Send + 'static,
        T: Future + Send + 'static,
        T::Output: Send + 'static,
    {
        let (task_stop_tx, task_stop_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::channel(1);

        if let Some(hold_tx) = self.hold_tx.lock().await.clone() {
            let stop_rx = self.stop_tx.subscribe();
            let _ = spawn(async move {
                // The context's channel halves are released when the future
                // generated by `f` finishes, which both drops the hold and
                // wakes any `Task::stop` caller.
                let task_context = TaskContext {
                    stop: stop_rx,
                    task_stop: task_stop_rx,
                    _hold: hold_tx,
                    _done: done_tx,
                };

                f(task_context).await;
            });
        }

        Task {
            stop_tx: task_stop_tx,
            done_rx,
        }
    }

    pub async fn stop(&self) {
        // Dropping the apex `hold_tx` first also makes later `spawn` calls
        // no-ops; a task spawned after the stop broadcast would never see
        // the signal and deadlock the `recv` below.
        drop(self.hold_tx.lock().await.take());

        let _ = self.stop_tx.send(());

        // The channel breaks once every task dropped its hold.
        let _ = self.hold_rx.lock().await.recv().await;
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one spawned task. Dropping it detaches the task; only an
/// explicit `stop` (or manager shutdown) terminates it.
pub struct Task {
    stop_tx: mpsc::UnboundedSender<()>,
    done_rx: mpsc::Receiver<()>,
}

impl Task {
    /// Signal this one task to stop and wait until it finished.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        let _ = self.done_rx.recv().await;
    }
}

pub struct TaskContext {
    stop: broadcast::Receiver<()>,
    task_stop: mpsc::UnboundedReceiver<()>,
    _hold: mpsc::Sender<()>,
    _done: mpsc::Sender<()>,
}

impl TaskContext {
    /// Resolves when either this task or the whole manager is asked to
    /// stop. A dropped `Task` handle does not count as a stop request.
    pub async fn wait_for_stop(&mut self) {
        select! {
            _ = self.stop.recv() => {}
            Some(()) = self.task_stop.recv() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::TaskManager;

    #[tokio::test]
    async fn stop_waits_for_spawned_tasks() {
        let manager = TaskManager::new();
        let finished = Arc::new(AtomicBool::new(false));

        let _task = manager
            .spawn({
                let finished = finished.clone();
                |mut task_context| async move {
                    task_context.wait_for_stop().await;
                    finished.store(true, Ordering::SeqCst);
                }
            })
            .await;

        manager.stop().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn task_stop_targets_one_task() {
        let manager = TaskManager::new();
        let finished = Arc::new(AtomicBool::new(false));

        let mut task = manager
            .spawn({
                let finished = finished.clone();
                |mut task_context| async move {
                    task_context.wait_for_stop().await;
                    finished.store(true, Ordering::SeqCst);
                }
            })
            .await;

        task.stop().await;
        assert!(finished.load(Ordering::SeqCst));
    }
}
