use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════
//  Stamp
// ═══════════════════════════════════════════════════════════════

/// Момент записанного времени: наносекунды от Unix epoch.
///
/// Не зависит от часового пояса и времени суток, поэтому разница двух
/// stamp'ов осмысленна и для долгих сессий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stamp(i64);

impl Stamp {
    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9).round() as i64)
    }

    /// Текущее системное время.
    pub fn now() -> Self {
        let ns = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(i64::try_from(ns).unwrap_or(i64::MAX))
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Знаковая разница `self - earlier` в наносекундах.
    /// Отрицательна, если записи в логе идут не по возрастанию времени.
    pub fn signed_gap(self, earlier: Stamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Record
// ═══════════════════════════════════════════════════════════════

/// Одно захваченное событие.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub topic: String,
    #[serde(rename = "ts_ns")]
    pub stamp: Stamp,
    /// Непрозрачное тело события, не интерпретируется.
    #[serde(rename = "data")]
    pub payload: String,
}

impl Record {
    pub fn new(topic: impl Into<String>, stamp: Stamp, payload: impl Into<String>) -> Self {
        Self { topic: topic.into(), stamp, payload: payload.into() }
    }

    /// Запись со штампом текущего времени.
    pub fn now(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(topic, Stamp::now(), payload)
    }
}
