/// Event loop: one task per inbound event, periodic purge of expired waits.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, info, warn};

use jtelebot_core::BotRequest;

use crate::dispatch::Dispatcher;

pub struct BotRuntime {
    dispatcher: Arc<Dispatcher>,
    purge_interval: Option<Duration>,
}

impl BotRuntime {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher, purge_interval: None }
    }

    /// Purge expired waits on this period while running.
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = Some(interval);
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Consume events until the channel closes, then wait for in-flight tasks.
    ///
    /// Events are handled concurrently; responses of one event are delivered in order.
    pub async fn run(&self, mut rx: mpsc::Receiver<BotRequest>) {
        let mut tasks = JoinSet::new();
        let mut purge = self.purge_interval.map(time::interval);
        info!("Bot runtime started");

        loop {
            while let Some(joined) = tasks.try_join_next() {
                report_join(joined);
            }

            tokio::select! {
                request = rx.recv() => {
                    let Some(request) = request else { break };
                    debug!(chat_id = request.chat_id(), message_id = request.message().message_id, "Event received");
                    let dispatcher = self.dispatcher.clone();
                    tasks.spawn(async move { dispatcher.handle_and_deliver(request).await });
                }
                _ = tick(&mut purge) => {
                    match self.dispatcher.services().waiting.purge_expired().await {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, "Purged expired command waits"),
                        Err(e) => warn!(error = %e, "Failed to purge command waits"),
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            report_join(joined);
        }
        info!("Bot runtime stopped");
    }
}

async fn tick(interval: &mut Option<time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn report_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Event task failed");
    }
}

#[cfg(test)]
mod tests {
    use jtelebot_core::CommandWaitingStore;

    use super::*;
    use crate::testing::{Harness, GROUP_ID};

    #[tokio::test]
    async fn test_runs_until_channel_closes() {
        let h = Harness::new().await;
        let runtime = BotRuntime::new(h.dispatcher.clone()).with_purge_interval(Duration::from_millis(10));
        let (tx, rx) = mpsc::channel(8);

        tx.send(BotRequest::new(h.message(GROUP_ID, 5, "/ping"))).await.unwrap();
        tx.send(BotRequest::new(h.message(GROUP_ID, 6, "/karma nobody"))).await.unwrap();
        tx.send(BotRequest::new(h.message(GROUP_ID, 7, "/ping"))).await.unwrap();
        drop(tx);

        runtime.run(rx).await;

        let delivered = h.sink.delivered.lock().unwrap();
        let mut texts: Vec<&str> = delivered.iter().filter_map(|r| r.as_text()).collect();
        texts.sort();
        assert_eq!(texts, vec!["Wrong input", "pong", "pong"]);
    }

    #[tokio::test]
    async fn test_periodic_purge_keeps_fresh_waits() {
        let h = Harness::new().await;
        let runtime = BotRuntime::new(h.dispatcher.clone()).with_purge_interval(Duration::from_millis(5));
        let stale = h.message(GROUP_ID, 5, "/echo");
        h.waiting.add(&stale, "echo").await.unwrap();
        assert_eq!(h.waiting.purge_expired().await.unwrap(), 0);

        let (tx, rx) = mpsc::channel::<BotRequest>(1);
        let handle = tokio::spawn(async move { runtime.run(rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(h.waiting.len().await, 1);
    }
}
