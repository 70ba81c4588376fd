use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::pipeline::Pipeline;

/// Upper bound on one idle sleep. Submissions wake the loop early anyway.
const IDLE_WAIT: Duration = Duration::from_secs(60);

/// Real-time driver for a pipeline's scheduled transitions.
/// - `request_shutdown()` で停止を要求（実行中の遷移は最後まで適用される）
/// - `shutdown_and_join()` で終了を待てる
pub struct SchedulerLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerLoop {
    pub fn spawn(pipeline: Pipeline) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            scheduler_loop(pipeline, &mut shutdown_rx).await;
        });
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn scheduler_loop(pipeline: Pipeline, shutdown_rx: &mut watch::Receiver<bool>) {
    let wakeup = pipeline.wakeup();
    info!("scheduler loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let applied = pipeline.run_due().await;
        if applied > 0 {
            debug!(applied, "scheduler tick");
        }

        // 次の発火時刻まで眠る。新しい投入があれば notify で起こされる
        let wait = match pipeline.next_fire_at().await {
            Some(fire_at) => (fire_at - pipeline.now()).to_std().unwrap_or(Duration::ZERO),
            None => IDLE_WAIT,
        };

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = wakeup.notified() => {}
            _ = tokio::time::sleep(wait.min(IDLE_WAIT)) => {}
        }
    }

    info!("scheduler loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PipelineBuilder;
    use crate::config::PipelineConfig;
    use crate::domain::{IntentState, TransactionState};

    fn fast_pipeline() -> Pipeline {
        let config = PipelineConfig {
            time_unit_ms: 10,
            ..PipelineConfig::default()
        };
        PipelineBuilder::new().config(config).build().unwrap()
    }

    #[tokio::test]
    async fn loop_drives_records_to_completion() {
        let pipeline = fast_pipeline();
        let driver = SchedulerLoop::spawn(pipeline.clone());

        pipeline.toggle_wallet_module("gasless").await.unwrap();
        let tx = pipeline.submit_wallet_transaction("gasless", "0.1").await.unwrap();
        let intent = pipeline.submit_intent("test", "1.0", None).await.unwrap();
        pipeline.execute_intent(intent).await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(pipeline.get(tx).await.unwrap().state(), TransactionState::Completed);
        assert_eq!(pipeline.get(intent).await.unwrap().state(), IntentState::Completed);
        assert_eq!(pipeline.pending_transitions().await, 0);

        driver.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_loop() {
        let driver = SchedulerLoop::spawn(fast_pipeline());
        tokio::time::timeout(Duration::from_secs(1), driver.shutdown_and_join())
            .await
            .unwrap();
    }
}
