use std::io::Write;
use std::path::Path;

use bag::LogStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::pacing::ReplayState;
use crate::sink::DatagramSink;
use crate::PlaybackError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Записей, переданных в sink.
    pub emitted: u64,
    /// Из них отправка вернула ошибку (без повторов).
    pub send_failures: u64,
    /// Записей, выданных без ожидания из-за отставания от исходного темпа.
    pub late: u64,
    pub cancelled: bool,
}

/// Воспроизведение bag'а в sink с исходными интервалами.
///
/// Перед каждой записью спит `записанный интервал − реально прошедшее
/// время` с последней контрольной точки. Точка ставится после сна и до
/// отправки, поэтому стоимость отправки и эха ложится на следующий
/// интервал.
pub struct Replayer<S> {
    sink: S,
    topic: String,
    echo: Option<Box<dyn Write + Send>>,
}

impl<S: DatagramSink> Replayer<S> {
    pub fn new(sink: S, topic: impl Into<String>) -> Self {
        Self { sink, topic: topic.into(), echo: None }
    }

    /// Печатать каждый отправленный payload в stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo.then(|| Box::new(std::io::stdout()) as Box<dyn Write + Send>);
        self
    }

    /// Эхо в произвольный writer. Первая ошибка записи отключает эхо,
    /// воспроизведение продолжается.
    pub fn with_echo_to(mut self, out: impl Write + Send + 'static) -> Self {
        self.echo = Some(Box::new(out));
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Открыть bag, воспроизвести его и освободить bag и sink на любом
    /// пути выхода.
    pub async fn play_file(
        &mut self,
        path: impl AsRef<Path>,
        token: &CancellationToken,
    ) -> Result<ReplaySummary, PlaybackError> {
        let path = path.as_ref();
        let mut store = match LogStore::open_for_read(path) {
            Ok(s) => s,
            Err(e) => {
                self.sink.close();
                return Err(e.into());
            }
        };
        self.play_store(&mut store, token).await
    }

    /// Воспроизвести открытый store, затем закрыть store и sink — при
    /// успехе, ошибке и отмене одинаково.
    pub async fn play_store(
        &mut self,
        store: &mut LogStore,
        token: &CancellationToken,
    ) -> Result<ReplaySummary, PlaybackError> {
        tracing::info!(bag = %store.path().display(), topic = %self.topic, "replay started");

        let result = self.replay(store, token).await;
        store.close();
        self.sink.close();

        match &result {
            Ok(summary) => tracing::info!(
                emitted = summary.emitted,
                send_failures = summary.send_failures,
                late = summary.late,
                cancelled = summary.cancelled,
                "replay finished"
            ),
            Err(e) => tracing::error!(error = %e, "replay failed"),
        }
        result
    }

    /// Один проход по store без освобождения ресурсов; обычно нужен
    /// `play_store`.
    pub async fn replay(
        &mut self,
        store: &mut LogStore,
        token: &CancellationToken,
    ) -> Result<ReplaySummary, PlaybackError> {
        let mut state = ReplayState::new();
        let mut summary = ReplaySummary::default();

        for record in store.messages(&self.topic) {
            if token.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let record = record?;

            let now = Instant::now();
            let delay = state.delay_until(record.stamp, now);
            if state.is_behind(record.stamp, now) {
                summary.late += 1;
                tracing::debug!(stamp = record.stamp.as_nanos(), "behind schedule, sending without delay");
            }
            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        summary.cancelled = true;
                        break;
                    }
                }
            }

            state.checkpoint(record.stamp, Instant::now());

            if let Err(e) = self.sink.send(record.payload.as_bytes()).await {
                summary.send_failures += 1;
                tracing::warn!(error = %e, payload = %record.payload, "send failed");
            }
            summary.emitted += 1;

            self.echo_payload(&record.payload);
            tracing::trace!(stamp = record.stamp.as_nanos(), len = record.payload.len(), "emitted");
        }

        if summary.cancelled {
            tracing::info!(emitted = summary.emitted, "replay cancelled");
        }
        Ok(summary)
    }

    fn echo_payload(&mut self, payload: &str) {
        let Some(out) = self.echo.as_mut() else { return };
        if let Err(e) = writeln!(out, "{payload}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "echo output failed, echo disabled");
            self.echo = None;
        }
    }
}
