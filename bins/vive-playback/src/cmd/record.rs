use bag::LogStore;
use playback::{Recorder, spawn_udp_feed};
use tokio_util::sync::CancellationToken;

use super::prompt::{ask_clear, resolve_open_mode};
use crate::config::Effective;
use crate::error::AppError;

/// Ёмкость канала между UDP feed и Recorder.
const FEED_BUFFER: usize = 1024;

pub async fn run(eff: &Effective) -> Result<(), AppError> {
    println!("~~~ Record mode selected ~~~");

    let (mode, message) = resolve_open_mode(&eff.bag_file, eff.existing, || {
        ask_clear(&mut std::io::stdin().lock(), &mut std::io::stdout())
    })?;

    let token = CancellationToken::new();
    let feed = spawn_udp_feed(&format!("0.0.0.0:{}", eff.in_port), FEED_BUFFER, token.clone()).await?;

    // Bag открываем после bind: при занятом порту файл не трогается.
    let store = match LogStore::open(&eff.bag_file, mode) {
        Ok(s) => s,
        Err(e) => {
            token.cancel();
            super::join_logged("udp feed", feed.handle).await;
            return Err(e.into());
        }
    };
    println!("{message}");

    let watcher = super::cancel_on_ctrl_c(token.clone());
    let summary = Recorder::new(store, eff.input_topic.as_str()).run(feed.events, &token).await;

    token.cancel();
    watcher.abort();
    super::join_logged("udp feed", feed.handle).await;

    println!("Recorded {} message(s), lost {}.", summary.recorded, summary.lost);
    Ok(())
}
