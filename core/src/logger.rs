// Global logging system for CGsnap

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 256;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DBG",
            LogLevel::Info => "INF",
            LogLevel::Warn => "WRN",
        }
    }
}

/// One entry of the ring.
///
/// Messages are static so logging never formats or allocates; a single
/// numeric argument rides along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: &'static str,
    pub value: Option<u32>,
}

static LOG_BUFFER: Mutex<[Option<LogRecord>; MAX_LOG_ENTRIES]> =
    Mutex::new([None; MAX_LOG_ENTRIES]);
static LOG_COUNT: AtomicUsize = AtomicUsize::new(0); // Total logs written
static LOG_DROPPED: AtomicUsize = AtomicUsize::new(0); // Lost to lock contention

/// Append a record to the ring.
///
/// Never spins: an interrupt that fires while the ring is held elsewhere on
/// the same core would deadlock, so a contended record is counted and dropped.
pub fn log(level: LogLevel, message: &'static str, value: Option<u32>) {
    let Some(mut buffer) = LOG_BUFFER.try_lock() else {
        LOG_DROPPED.fetch_add(1, Ordering::Relaxed);
        return;
    };
    let count = LOG_COUNT.fetch_add(1, Ordering::SeqCst);
    let idx = count % MAX_LOG_ENTRIES; // Ring buffer wrap-around

    buffer[idx] = Some(LogRecord {
        level,
        message,
        value,
    });
}

/// Iterator over ring entries in chronological order.
/// The ring buffer maintains up to MAX_LOG_ENTRIES logs. When full, oldest logs are overwritten.
pub struct LogIterator {
    start_idx: usize,
    current: usize,
    remaining: usize,
}

impl Iterator for LogIterator {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let idx = (self.start_idx + self.current) % MAX_LOG_ENTRIES;
        self.current += 1;
        self.remaining -= 1;

        LOG_BUFFER.lock()[idx]
    }
}

/// Get the last N log entries (up to MAX_LOG_ENTRIES)
pub fn get_last_n_logs(n: usize) -> LogIterator {
    let total_count = LOG_COUNT.load(Ordering::SeqCst);
    let available = total_count.min(MAX_LOG_ENTRIES);
    let num_logs = n.min(available);

    LogIterator {
        start_idx: (total_count - num_logs) % MAX_LOG_ENTRIES,
        current: 0,
        remaining: num_logs,
    }
}

pub fn log_count() -> usize {
    LOG_COUNT.load(Ordering::SeqCst).min(MAX_LOG_ENTRIES)
}

pub fn total_log_count() -> usize {
    LOG_COUNT.load(Ordering::SeqCst)
}

pub fn dropped_log_count() -> usize {
    LOG_DROPPED.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        $crate::logger::log($crate::logger::LogLevel::Info, $msg, None)
    };
    ($msg:expr, $val:expr) => {
        $crate::logger::log($crate::logger::LogLevel::Info, $msg, Some($val as u32))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        $crate::logger::log($crate::logger::LogLevel::Warn, $msg, None)
    };
    ($msg:expr, $val:expr) => {
        $crate::logger::log($crate::logger::LogLevel::Warn, $msg, Some($val as u32))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($msg:expr) => {
        $crate::logger::log($crate::logger::LogLevel::Debug, $msg, None)
    };
    ($msg:expr, $val:expr) => {
        $crate::logger::log($crate::logger::LogLevel::Debug, $msg, Some($val as u32))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_advances_total_count() {
        let before = total_log_count() + dropped_log_count();
        log_info!("logger: first");
        log_warn!("logger: second", 42u32);

        // Other tests log concurrently; only the lower bound is stable.
        assert!(total_log_count() + dropped_log_count() >= before + 2);
        assert!(log_count() <= MAX_LOG_ENTRIES);
    }

    #[test]
    fn test_ring_wraps_and_keeps_capacity() {
        let start = total_log_count();
        while total_log_count() < start + MAX_LOG_ENTRIES + 10 {
            log_debug!("logger: filler");
        }
        assert_eq!(log_count(), MAX_LOG_ENTRIES);
        assert_eq!(get_last_n_logs(5).count(), 5);
    }

    #[test]
    fn test_contended_record_dropped_not_spun() {
        let before = dropped_log_count();
        {
            let _held = LOG_BUFFER.lock();
            log_warn!("logger: contended");
        }
        assert!(dropped_log_count() >= before + 1);
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(LogLevel::Info.tag(), "INF");
        assert!(LogLevel::Debug < LogLevel::Warn);
    }
}
