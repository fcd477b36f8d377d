use std::time::Duration;

use bag::Stamp;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    recorded: Stamp,
    real: Instant,
}

/// Состояние темпа одного прогона воспроизведения.
///
/// Оба времени (записанное и реальное) выставляются вместе в
/// `checkpoint()` и пусты только до первой записи.
#[derive(Debug, Default)]
pub struct ReplayState {
    last: Option<Checkpoint>,
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.last.is_some()
    }

    pub fn last_recorded_time(&self) -> Option<Stamp> {
        self.last.map(|c| c.recorded)
    }

    pub fn last_real_time(&self) -> Option<Instant> {
        self.last.map(|c| c.real)
    }

    /// Сколько ещё ждать перед выдачей записи со штампом `stamp`, если
    /// сейчас `now`. Первая запись выдаётся сразу.
    pub fn delay_until(&self, stamp: Stamp, now: Instant) -> Duration {
        match self.last {
            None => Duration::ZERO,
            Some(cp) => remaining_gap(
                stamp.signed_gap(cp.recorded),
                now.saturating_duration_since(cp.real),
            ),
        }
    }

    /// Записанный интервал до `stamp` положителен, но ждать уже нечего:
    /// конвейер отстаёт от исходного темпа.
    pub fn is_behind(&self, stamp: Stamp, now: Instant) -> bool {
        match self.last {
            None => false,
            Some(cp) => stamp.signed_gap(cp.recorded) > 0 && self.delay_until(stamp, now).is_zero(),
        }
    }

    pub fn checkpoint(&mut self, stamp: Stamp, now: Instant) {
        self.last = Some(Checkpoint { recorded: stamp, real: now });
    }
}

/// Записанный интервал минус реально прошедшее время, не меньше нуля.
///
/// Нулевой или отрицательный интервал (дубликаты, обратный порядок
/// штампов) даёт ноль, а не ошибку.
pub fn remaining_gap(recorded_gap_ns: i64, real_elapsed: Duration) -> Duration {
    if recorded_gap_ns <= 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(recorded_gap_ns as u64).saturating_sub(real_elapsed)
}
