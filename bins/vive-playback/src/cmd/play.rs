use playback::{Replayer, UdpSink};
use tokio_util::sync::CancellationToken;

use crate::config::Effective;
use crate::error::AppError;

pub async fn run(eff: &Effective) -> Result<(), AppError> {
    let sink = UdpSink::connect(&eff.out_host, eff.out_port).await?;

    let token = CancellationToken::new();
    let watcher = super::cancel_on_ctrl_c(token.clone());

    let result = Replayer::new(sink, eff.input_topic.as_str())
        .with_echo(eff.echo)
        .play_file(&eff.bag_file, &token)
        .await;
    watcher.abort();

    let summary = result?;
    if summary.send_failures > 0 {
        tracing::warn!(failures = summary.send_failures, "some datagrams were not sent");
    }
    Ok(())
}
