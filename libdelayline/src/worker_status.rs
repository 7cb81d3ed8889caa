/// Progress report sent from a reconstruction worker
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub worker_id: usize,
}

impl WorkerStatus {
    pub fn new(progress: f32, worker_id: usize) -> Self {
        Self {
            progress,
            worker_id,
        }
    }
}
