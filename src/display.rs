use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};

use crate::model::tick::normalize_symbol;

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub symbol: String,
    pub price: f64,
    pub last_updated_at: f64,
}

/// Copy of the display map taken under the lock, sorted by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub taken_at: f64,
    pub rows: Vec<DisplayRow>,
}

pub trait DisplayRenderer {
    fn render(&self, snapshot: &DisplaySnapshot);
}

#[derive(Debug, Default)]
struct DisplayInner {
    rows: BTreeMap<String, (f64, f64)>,
    initial_prices_received: bool,
    last_render_at: Option<f64>,
}

/// Latest price per symbol, written by every pipeline and read by the
/// renderer. The lock is only held for map mutation or copy.
#[derive(Debug)]
pub struct SharedDisplayState {
    expected: HashSet<String>,
    render_interval_seconds: f64,
    inner: Mutex<DisplayInner>,
}

impl SharedDisplayState {
    pub fn new<S: AsRef<str>>(expected_symbols: &[S], render_interval_seconds: f64) -> Self {
        Self {
            expected: expected_symbols
                .iter()
                .map(|s| normalize_symbol(s.as_ref()))
                .collect(),
            render_interval_seconds,
            inner: Mutex::new(DisplayInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DisplayInner> {
        // Rows are plain values, a panicked writer cannot leave them torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(&self, symbol: &str, price: f64, timestamp: f64) {
        let symbol = normalize_symbol(symbol);
        let mut inner = self.lock();
        inner.rows.insert(symbol, (price, timestamp));
        if !inner.initial_prices_received
            && self.expected.iter().all(|s| inner.rows.contains_key(s))
        {
            inner.initial_prices_received = true;
            tracing::info!(symbols = self.expected.len(), "Initial prices received");
        }
    }

    pub fn initial_prices_received(&self) -> bool {
        self.lock().initial_prices_received
    }

    pub fn snapshot(&self, now: f64) -> DisplaySnapshot {
        let inner = self.lock();
        Self::copy_rows(&inner, now)
    }

    fn copy_rows(inner: &DisplayInner, now: f64) -> DisplaySnapshot {
        DisplaySnapshot {
            taken_at: now,
            rows: inner
                .rows
                .iter()
                .map(|(symbol, &(price, last_updated_at))| DisplayRow {
                    symbol: symbol.clone(),
                    price,
                    last_updated_at,
                })
                .collect(),
        }
    }

    /// Take a snapshot when every expected symbol has reported and the
    /// render interval has elapsed; marks the render time when it does.
    pub fn snapshot_if_due(&self, now: f64) -> Option<DisplaySnapshot> {
        let mut inner = self.lock();
        if !inner.initial_prices_received {
            return None;
        }
        if let Some(last) = inner.last_render_at {
            if now - last < self.render_interval_seconds {
                return None;
            }
        }
        inner.last_render_at = Some(now);
        Some(Self::copy_rows(&inner, now))
    }

    /// Render outside the lock. Returns `true` if a frame was drawn.
    pub fn maybe_render<R: DisplayRenderer + ?Sized>(&self, now: f64, renderer: &R) -> bool {
        match self.snapshot_if_due(now) {
            Some(snapshot) => {
                renderer.render(&snapshot);
                true
            }
            None => false,
        }
    }
}

/// Format with two decimals and thousands separators, e.g. `67,123.45`.
pub fn format_price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

pub fn format_clock(timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    let nanos = ((timestamp - timestamp.floor()) * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

pub fn render_table(snapshot: &DisplaySnapshot) -> String {
    let mut out = String::new();
    out.push_str("=== VolMon price monitor ===\n");
    out.push_str(&format!(
        "{:<10} | {:>15} | {}\n",
        "SYMBOL", "PRICE (USDT)", "LAST UPDATE"
    ));
    out.push_str(&"-".repeat(50));
    out.push('\n');
    for row in &snapshot.rows {
        out.push_str(&format!(
            "{:<10} | {:>15} | {}\n",
            row.symbol,
            format_price(row.price),
            format_clock(row.last_updated_at)
        ));
    }
    out
}

/// Prints the table to stdout, separated from the previous frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleRenderer;

impl DisplayRenderer for ConsoleRenderer {
    fn render(&self, snapshot: &DisplaySnapshot) {
        let table = render_table(snapshot);
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = write!(stdout, "\n\n\n{}", table).and_then(|_| stdout.flush()) {
            tracing::warn!(error = %e, "Failed to render price table");
        }
    }
}
