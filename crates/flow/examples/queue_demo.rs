//! Queue demo
//!
//! Resizes a batch of fake images through a bounded queue, retrying flaky
//! uploads, and prints the lifecycle hooks as they fire.
//!
//! Run:
//!   cargo run --example queue_demo -p everruns-flow
//!
//! Tune with FLOW_QUEUE_CONCURRENCY=1 to watch the backlog drain one by one.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use everruns_flow::prelude::*;
use everruns_flow::tick;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
struct Image {
    name: String,
    width: u32,
}

struct Resizer {
    target_width: u32,
    uploads: Arc<AtomicU32>,
}

#[async_trait]
impl Worker<Image> for Resizer {
    type Output = String;
    type Error = String;

    async fn run(&self, image: Image) -> Result<String, String> {
        if image.width < self.target_width {
            return Err(format!("{} is already smaller than the target", image.name));
        }
        tick::sleep(Duration::from_millis(u64::from(image.width / 10))).await;

        // Every third upload attempt fails
        let policy = RetryPolicy::new(3).with_interval(Duration::from_millis(20));
        retry(policy, || async {
            if self.uploads.fetch_add(1, Ordering::SeqCst) % 3 == 2 {
                Err(format!("upload of {} timed out", image.name))
            } else {
                Ok(format!("{}@{}w", image.name, self.target_width))
            }
        })
        .await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "everruns_flow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = QueueConfig::from_env().with_name("thumbnails");
    tracing::info!(concurrency = config.concurrency, "Starting queue demo");

    let queue = TaskQueue::with_config(
        Resizer {
            target_width: 200,
            uploads: Arc::new(AtomicU32::new(0)),
        },
        config,
    )?;

    queue.on_saturated(|| async { tracing::info!("queue saturated") });
    queue.on_unsaturated(|| async { tracing::info!("queue has a free slot") });
    queue.on_task_error(|err, image: Image| async move {
        tracing::warn!(image = %image.name, error = %err, "resize failed");
    });

    let drained: Waiter<(), ()> = Waiter::new();
    let signal = drained.clone();
    let probe = queue.clone();
    queue.on_drain(move || {
        // Drain also fires between backlogged tasks at low concurrency
        if probe.idle() {
            signal.resolve(());
        }
        async { tracing::info!("no task running") }
    });

    let images = [("cat", 640), ("dog", 1280), ("icon", 64), ("map", 2048), ("logo", 320)]
        .into_iter()
        .map(|(name, width)| Image {
            name: name.to_string(),
            width,
        });
    let handles = queue.push_all(images);

    // Push one urgent image to the front of whatever is still waiting
    let urgent = queue.unshift(Image {
        name: "avatar".to_string(),
        width: 480,
    });
    println!("urgent: {:?}", urgent.await);

    for handle in handles {
        match handle.await {
            Ok(thumbnail) => println!("done: {}", thumbnail),
            Err(err) => println!("skipped: {}", err),
        }
    }

    drained.wait().await.ok();
    println!("stats: {}", serde_json::to_string(&queue.stats())?);
    Ok(())
}
