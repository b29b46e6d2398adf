//! Per-channel watch loop
//!
//! Each enabled channel runs one task: a slow tick rescans the log
//! directory, a fast tick polls the followed file. Records are processed
//! one at a time and sent in order on the channel's output stream.

use super::Orchestrator;
use crate::core::{ChannelConfig, ChatRecord, Config, GeneralConfig, LogChannel, LogSession, PipelineResult};
use crate::glossary::GlossaryStore;
use crate::session::{scan_with_timeout, SessionDetector, SessionEvent};
use crate::tailer::{local_system_change, LogTailer};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Buffered results per channel before the watcher waits on the consumer
const OUTPUT_BUFFER: usize = 256;

pub struct ChannelWatcher {
    channel: LogChannel,
    general: GeneralConfig,
    backfill_lines: usize,
    detector: SessionDetector,
    tailer: Option<LogTailer>,
    orchestrator: Arc<Orchestrator>,
    output: mpsc::Sender<PipelineResult>,
}

impl ChannelWatcher {
    pub fn new(
        channel: LogChannel,
        general: GeneralConfig,
        channel_config: &ChannelConfig,
        orchestrator: Arc<Orchestrator>,
        output: mpsc::Sender<PipelineResult>,
    ) -> Self {
        Self {
            channel,
            general,
            backfill_lines: channel_config.backfill_lines,
            detector: SessionDetector::new(channel, channel_config),
            tailer: None,
            orchestrator,
            output,
        }
    }

    /// Run until `shutdown` flips to true or the output receiver is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "{} Watching {} (backfill {} lines)",
            self.channel.tag(),
            self.general.log_dir.display(),
            self.backfill_lines
        );

        let mut scan_tick = interval(Duration::from_millis(self.general.scan_interval_ms));
        let mut poll_tick = interval(Duration::from_millis(self.general.poll_interval_ms));
        scan_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let keep_going = tokio::select! {
                biased;
                _ = shutdown.changed() => false,
                _ = scan_tick.tick() => self.rescan().await,
                _ = poll_tick.tick() => self.poll().await,
            };
            if !keep_going || *shutdown.borrow() {
                break;
            }
        }

        self.tailer = None;
        log::info!("{} Watcher stopped", self.channel.tag());
    }

    async fn rescan(&mut self) -> bool {
        let timeout = Duration::from_millis(self.general.scan_timeout_ms);
        let candidates = match scan_with_timeout(self.general.log_dir.clone(), self.channel, timeout).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("{} Directory scan failed: {}", self.channel.tag(), e);
                return true;
            }
        };

        match self.detector.update(&candidates, Utc::now()) {
            Some(SessionEvent::Switched { session, kind, .. }) => {
                log::info!("{} Session switch ({:?}): {}", self.channel.tag(), kind, session);
                self.tailer = None;
            }
            Some(SessionEvent::WentIdle { .. }) => self.tailer = None,
            None => {}
        }

        // Also retries a session whose earlier attach failed
        match (self.tailer.is_none(), self.detector.active().cloned()) {
            (true, Some(session)) => self.attach(session).await,
            _ => true,
        }
    }

    async fn attach(&mut self, session: LogSession) -> bool {
        let backfill_lines = self.backfill_lines;
        let label = session.file_path.display().to_string();
        let task = tokio::task::spawn_blocking(move || LogTailer::attach(&session, backfill_lines, Utc::now()));
        match task.await {
            Ok(Ok((tailer, backfill))) => {
                self.tailer = Some(tailer);
                self.emit(backfill).await
            }
            Ok(Err(e)) => {
                log::warn!("{} Cannot attach to {}, retrying on next scan: {}", self.channel.tag(), label, e);
                true
            }
            Err(e) => {
                log::error!("{} Attach task failed: {}", self.channel.tag(), e);
                true
            }
        }
    }

    async fn poll(&mut self) -> bool {
        let Some(mut tailer) = self.tailer.take() else {
            return true;
        };
        let task = tokio::task::spawn_blocking(move || {
            let records = tailer.poll();
            (tailer, records)
        });
        let (tailer, records) = match task.await {
            Ok(done) => done,
            Err(e) => {
                log::error!("{} Read task failed: {}", self.channel.tag(), e);
                return true;
            }
        };
        self.tailer = Some(tailer);
        match records {
            Ok(records) => self.emit(records).await,
            Err(e) => {
                log::warn!("{} Read failed: {}", self.channel.tag(), e);
                true
            }
        }
    }

    /// Process and forward records in order; false once the consumer is gone
    async fn emit(&mut self, records: Vec<ChatRecord>) -> bool {
        for record in records {
            self.detector
                .record_activity(Utc.from_utc_datetime(&record.timestamp));
            if self.channel == LogChannel::Local {
                if let Some(system) = local_system_change(&record) {
                    self.detector.set_solar_system(&system);
                }
            }

            let result = self.orchestrator.process(self.channel, &record).await;
            if result.suppressed {
                continue;
            }
            if self.output.send(result).await.is_err() {
                log::debug!("{} Output closed", self.channel.tag());
                return false;
            }
        }
        true
    }
}

/// Running channel tasks and their output streams
pub struct Pipelines {
    pub outputs: Vec<(LogChannel, mpsc::Receiver<PipelineResult>)>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipelines {
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signal every task and wait for it to finish its current record
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                log::error!("Pipeline task failed: {}", e);
            }
        }
    }
}

/// Periodically reload the user glossary when it changes on disk
pub fn spawn_glossary_reloader(
    store: Arc<GlossaryStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => {
                    // Errors are logged by the store; the previous table stays active
                    let _ = store.reload_if_changed();
                }
            }
        }
    })
}

/// Start one watcher per enabled channel plus the glossary reloader
pub fn spawn_pipelines(config: &Config, orchestrator: Arc<Orchestrator>) -> Pipelines {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let mut outputs = Vec::new();
    let mut tasks = Vec::new();

    for channel in LogChannel::ALL {
        let channel_config = config.channel(channel);
        if !channel_config.enabled {
            log::info!("{} Disabled", channel.tag());
            continue;
        }
        let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
        let watcher = ChannelWatcher::new(
            channel,
            config.general.clone(),
            channel_config,
            Arc::clone(&orchestrator),
            tx,
        );
        tasks.push(tokio::spawn(watcher.run(shutdown_rx.clone())));
        outputs.push((channel, rx));
    }

    tasks.push(spawn_glossary_reloader(
        Arc::clone(orchestrator.glossary()),
        Duration::from_millis(config.glossary.reload_check_ms.max(100)),
        shutdown_rx,
    ));

    Pipelines {
        outputs,
        shutdown,
        tasks,
    }
}
