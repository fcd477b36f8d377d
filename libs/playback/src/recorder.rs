use bag::{LogStore, Record};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub recorded: u64,
    /// Событий, которые не удалось записать.
    pub lost: u64,
}

/// Мост из живого потока событий в bag.
///
/// Режим открытия (перезапись или дозапись) решает вызывающий; здесь
/// только последовательная запись.
pub struct Recorder {
    store: LogStore,
    topic: String,
    summary: RecordSummary,
}

impl Recorder {
    pub fn new(store: LogStore, topic: impl Into<String>) -> Self {
        Self { store, topic: topic.into(), summary: RecordSummary::default() }
    }

    pub fn summary(&self) -> RecordSummary {
        self.summary
    }

    /// Записать одно событие со штампом текущего времени.
    ///
    /// Ошибка записи не фатальна: событие считается потерянным, сессия
    /// продолжается. Возвращает `false` для потерянного события.
    pub fn on_event(&mut self, payload: &str) -> bool {
        let record = Record::now(self.topic.as_str(), payload);
        match self.store.append(&record) {
            Ok(()) => {
                self.summary.recorded += 1;
                tracing::trace!(len = payload.len(), "recorded");
                true
            }
            Err(e) => {
                self.summary.lost += 1;
                tracing::warn!(error = %e, "event lost");
                false
            }
        }
    }

    /// Принимать события до отмены token (или закрытия канала), затем
    /// закрыть bag.
    pub async fn run(mut self, mut events: mpsc::Receiver<String>, token: &CancellationToken) -> RecordSummary {
        tracing::info!(bag = %self.store.path().display(), topic = %self.topic, "recording");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = events.recv() => match event {
                    Some(payload) => {
                        self.on_event(&payload);
                    }
                    None => {
                        tracing::info!("event feed closed");
                        break;
                    }
                },
            }
        }
        self.finish()
    }

    /// Закрыть bag и вернуть итог сессии.
    pub fn finish(mut self) -> RecordSummary {
        self.store.close();
        tracing::info!(
            recorded = self.summary.recorded,
            lost = self.summary.lost,
            bag = %self.store.path().display(),
            "recording stopped"
        );
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use bag::OpenMode;

    use super::*;

    const TOPIC: &str = "/vive_input/raw_string";

    fn payloads(path: &std::path::Path) -> Vec<String> {
        let mut store = LogStore::open_for_read(path).unwrap();
        store.messages(TOPIC).map(|r| r.unwrap().payload).collect()
    }

    #[tokio::test]
    async fn records_until_feed_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.bag");
        let recorder = Recorder::new(LogStore::open(&path, OpenMode::Write).unwrap(), TOPIC);

        let (tx, rx) = mpsc::channel(8);
        for p in ["1.0 2.0 3.0", "1.1 2.1 3.1", "ünïcödé"] {
            tx.send(p.to_string()).await.unwrap();
        }
        drop(tx);

        let summary = recorder.run(rx, &CancellationToken::new()).await;
        assert_eq!(summary, RecordSummary { recorded: 3, lost: 0 });
        assert_eq!(payloads(&path), ["1.0 2.0 3.0", "1.1 2.1 3.1", "ünïcödé"]);
    }

    #[tokio::test]
    async fn stops_on_cancel_and_closes_bag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cancel.bag");
        let recorder = Recorder::new(LogStore::open_for_write(&path).unwrap(), TOPIC);
        let token = CancellationToken::new();

        let (tx, rx) = mpsc::channel(8);
        tx.send("before".to_string()).await.unwrap();

        let run_token = token.clone();
        let task = tokio::spawn(async move { recorder.run(rx, &run_token).await });
        tokio::task::yield_now().await;
        while tx.capacity() < 8 {
            tokio::task::yield_now().await;
        }
        token.cancel();

        let summary = task.await.unwrap();
        assert_eq!(summary.recorded, 1);
        // После отмены события больше не принимаются.
        assert!(tx.send("after".to_string()).await.is_err());
        assert_eq!(payloads(&path), ["before"]);
    }

    #[test]
    fn write_errors_are_counted_and_recording_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.bag");
        drop(LogStore::open_for_write(&path).unwrap());

        // Store, открытый на чтение, отвергает каждую запись.
        let mut recorder = Recorder::new(LogStore::open_for_read(&path).unwrap(), TOPIC);
        assert!(!recorder.on_event("lost-1"));
        assert!(!recorder.on_event("lost-2"));
        assert_eq!(recorder.summary(), RecordSummary { recorded: 0, lost: 2 });
        assert_eq!(recorder.finish().lost, 2);
    }

    #[test]
    fn stamps_are_monotonic_enough_for_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamps.bag");
        let mut recorder = Recorder::new(LogStore::open_for_write(&path).unwrap(), TOPIC);
        recorder.on_event("a");
        std::thread::sleep(std::time::Duration::from_millis(5));
        recorder.on_event("b");
        recorder.finish();

        let mut store = LogStore::open_for_read(&path).unwrap();
        let stamps: Vec<_> = store.messages(TOPIC).map(|r| r.unwrap().stamp).collect();
        assert!(stamps[1].signed_gap(stamps[0]) >= 5_000_000);
    }
}
