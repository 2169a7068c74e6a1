use std::sync::{LazyLock, Mutex};

use flexi_logger::{Logger, LoggerHandle};
use tiered_connectivity::lists::AggregatedData;

pub mod dsu;
pub mod slow_lists;

/// Sum aggregate over i32 items.
#[derive(Debug, Clone, Default)]
pub struct AggSum(pub i32);

impl AggregatedData for AggSum {
    type Data = i32;

    fn from(data: &Self::Data) -> Self {
        Self(*data)
    }

    fn merge(self, right: Self) -> Self {
        Self(self.0 + right.0)
    }

    fn reverse(self) -> Self {
        self
    }
}

impl PartialEq<i32> for AggSum {
    fn eq(&self, other: &i32) -> bool {
        self.0 == *other
    }
}

impl PartialEq for AggSum {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for AggSum {}

/// Order-sensitive aggregate: items 0..=9 read as decimal digits. Reversal
/// reverses the digit string, so this catches ordering and flip bugs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggDigit {
    pub value: u64,
    pub digits: u32,
}

impl AggregatedData for AggDigit {
    type Data = i32;

    fn from(data: &Self::Data) -> Self {
        Self {
            value: *data as u64,
            digits: 1,
        }
    }

    fn merge(self, right: Self) -> Self {
        Self {
            value: self.value * 10u64.pow(right.digits) + right.value,
            digits: self.digits + right.digits,
        }
    }

    fn reverse(self) -> Self {
        let mut v = self.value;
        let mut rev = 0;
        for _ in 0..self.digits {
            rev = rev * 10 + v % 10;
            v /= 10;
        }
        Self {
            value: rev,
            digits: self.digits,
        }
    }
}

impl PartialEq<u64> for AggDigit {
    fn eq(&self, other: &u64) -> bool {
        self.value == *other
    }
}

#[allow(dead_code)]
pub static LOGGER: LazyLock<Mutex<LoggerHandle>> = LazyLock::new(|| {
    Mutex::new(
        Logger::try_with_env_or_str("info")
            .unwrap()
            .write_mode(flexi_logger::WriteMode::SupportCapture)
            .log_to_stdout()
            .set_palette("196;208;3;7;8".to_owned())
            .format(|w, now, record| {
                let style = flexi_logger::style(record.level());
                write!(
                    w,
                    "{} {pref}[{}] {}{suf}",
                    now.format("%H:%M:%S"),
                    &record.level().as_str()[0..1],
                    record.args(),
                    pref = style.prefix(),
                    suf = style.suffix(),
                )
            })
            .start()
            .unwrap(),
    )
});

#[allow(dead_code)]
pub fn init_logger() {
    let _ = &*LOGGER;
}
