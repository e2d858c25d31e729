//! Margin-aware trade simulator.
//!
//! Replays candle history against a strategy's signals and one parameter
//! combo, producing a trade ledger and an equity curve under realistic
//! capital constraints. Two modes: `simulate_single` (one instrument, the
//! fast path used during parameter search) and `simulate_portfolio`
//! (multi-symbol unified timeline, shared capital, position-count cap).

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::domain::ohlcv::{Candle, PriceSeries};
use crate::domain::parameter_space::ParameterCombo;
use crate::domain::signal::{Direction, InstrumentMeta, SignalStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Timeout,
    EndOfData,
}

#[derive(Debug, Clone)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub notional: f64,
    pub margin: f64,
    pub pnl: f64,
    pub entry_ts: DateTime<Utc>,
    pub exit_ts: DateTime<Utc>,
    pub exit_reason: ExitReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub ts: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub initial_equity: f64,
    /// Fraction of current equity risked per trade (distance to stop).
    pub risk_pct: f64,
    /// Taker fee per leg, as a fraction of notional.
    pub fee_rate: f64,
    pub slippage_rate: f64,
    pub max_open_positions: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            initial_equity: 10_000.0,
            risk_pct: 0.02,
            fee_rate: 0.0005,
            slippage_rate: 0.0005,
            max_open_positions: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub initial_equity: f64,
    pub final_equity: f64,
    /// Number of bars replayed (timeline length in portfolio mode).
    pub bars: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TradeSize {
    pub notional: f64,
    pub margin: f64,
    pub effective_leverage: f64,
}

/// Risk-based position sizing.
///
/// `notional = equity × risk_pct / stop_loss_pct`, margined at the
/// instrument-capped leverage. Margin per trade is bounded by
/// `equity / max_open_positions` so a single trade cannot starve every
/// position slot; the notional shrinks with the capped margin. Returns
/// `None` when the trade must be skipped: margin exceeding available
/// collateral (an exchange would reject the order) or notional below the
/// exchange floor.
pub fn size_trade(
    equity: f64,
    available_margin: f64,
    combo: &ParameterCombo,
    meta: &InstrumentMeta,
    config: &SimConfig,
) -> Option<TradeSize> {
    if !meta.is_tradable || combo.stop_loss_pct <= 0.0 {
        return None;
    }

    let risk_amount = equity * config.risk_pct;
    let mut notional = risk_amount / combo.stop_loss_pct;
    let effective_leverage = combo.leverage.min(meta.max_leverage);
    let mut margin = notional / effective_leverage;

    let margin_cap = equity / config.max_open_positions.max(1) as f64;
    if margin > margin_cap {
        margin = margin_cap;
        notional = margin * effective_leverage;
    }

    if margin > available_margin || notional < meta.min_notional {
        return None;
    }

    Some(TradeSize {
        notional,
        margin,
        effective_leverage,
    })
}

#[derive(Debug, Clone)]
struct OpenPosition {
    symbol: String,
    direction: Direction,
    entry_price: f64,
    entry_ts: DateTime<Utc>,
    notional: f64,
    margin: f64,
    stop_price: f64,
    target_price: f64,
    timeout_bars: usize,
    bars_held: usize,
}

fn open_position(
    symbol: &str,
    direction: Direction,
    market_price: f64,
    ts: DateTime<Utc>,
    size: TradeSize,
    combo: &ParameterCombo,
    config: &SimConfig,
) -> OpenPosition {
    let sign = direction.sign();
    let entry_price = market_price * (1.0 + sign * config.slippage_rate);
    let stop_price = entry_price * (1.0 - sign * combo.stop_loss_pct);
    let target_price = if combo.take_profit_pct > 0.0 {
        entry_price * (1.0 + sign * combo.take_profit_pct)
    } else {
        0.0
    };
    OpenPosition {
        symbol: symbol.to_string(),
        direction,
        entry_price,
        entry_ts: ts,
        notional: size.notional,
        margin: size.margin,
        stop_price,
        target_price,
        timeout_bars: combo.exit_timeout_bars,
        bars_held: 0,
    }
}

/// Stop-loss is checked before take-profit: when a bar's range touches
/// both, the conservative reading is that the stop filled first.
fn check_exit(position: &mut OpenPosition, candle: &Candle) -> Option<(f64, ExitReason)> {
    match position.direction {
        Direction::Long => {
            if candle.low <= position.stop_price {
                return Some((position.stop_price, ExitReason::StopLoss));
            }
            if position.target_price > 0.0 && candle.high >= position.target_price {
                return Some((position.target_price, ExitReason::TakeProfit));
            }
        }
        Direction::Short => {
            if candle.high >= position.stop_price {
                return Some((position.stop_price, ExitReason::StopLoss));
            }
            if position.target_price > 0.0 && candle.low <= position.target_price {
                return Some((position.target_price, ExitReason::TakeProfit));
            }
        }
    }

    position.bars_held += 1;
    if position.timeout_bars > 0 && position.bars_held >= position.timeout_bars {
        return Some((candle.close, ExitReason::Timeout));
    }
    None
}

fn close_position(
    position: OpenPosition,
    raw_price: f64,
    ts: DateTime<Utc>,
    reason: ExitReason,
    config: &SimConfig,
) -> Trade {
    let sign = position.direction.sign();
    let exit_price = raw_price * (1.0 - sign * config.slippage_rate);
    let gross = sign * (exit_price - position.entry_price) / position.entry_price
        * position.notional;
    // Taker fee on both legs.
    let fees = 2.0 * config.fee_rate * position.notional;
    Trade {
        symbol: position.symbol,
        direction: position.direction,
        entry_price: position.entry_price,
        exit_price,
        notional: position.notional,
        margin: position.margin,
        pnl: gross - fees,
        entry_ts: position.entry_ts,
        exit_ts: ts,
        exit_reason: reason,
    }
}

fn unrealized(position: &OpenPosition, close: f64) -> f64 {
    position.direction.sign() * (close - position.entry_price) / position.entry_price
        * position.notional
}

/// Single-instrument replay; the fast path for grid search.
pub fn simulate_single(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    combo: &ParameterCombo,
    meta: &InstrumentMeta,
    config: &SimConfig,
) -> SimResult {
    let candles = &series.candles;
    let warmup = strategy.warmup_bars().max(2);

    let mut equity = config.initial_equity;
    let mut used_margin = 0.0;
    let mut open: Option<OpenPosition> = None;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        if let Some((raw_price, reason)) = open.as_mut().and_then(|p| check_exit(p, candle)) {
            if let Some(position) = open.take() {
                used_margin -= position.margin;
                let trade = close_position(position, raw_price, candle.ts, reason, config);
                equity += trade.pnl;
                trades.push(trade);
            }
        }

        if open.is_none() && i >= warmup {
            if let Some(signal) = strategy.signal(&candles[..=i]) {
                let available = equity - used_margin;
                if let Some(size) = size_trade(equity, available, combo, meta, config) {
                    let position = open_position(
                        &series.symbol,
                        signal.direction,
                        candle.close,
                        candle.ts,
                        size,
                        combo,
                        config,
                    );
                    used_margin += position.margin;
                    open = Some(position);
                }
            }
        }

        let mark = open.as_ref().map(|p| unrealized(p, candle.close)).unwrap_or(0.0);
        equity_curve.push(EquityPoint {
            ts: candle.ts,
            equity: equity + mark,
        });
    }

    if let Some(position) = open.take() {
        if let Some(last) = candles.last() {
            let trade =
                close_position(position, last.close, last.ts, ExitReason::EndOfData, config);
            equity += trade.pnl;
            trades.push(trade);
            if let Some(point) = equity_curve.last_mut() {
                point.equity = equity;
            }
        }
    }

    SimResult {
        trades,
        equity_curve,
        initial_equity: config.initial_equity,
        final_equity: equity,
        bars: candles.len(),
    }
}

/// Multi-instrument replay over a unified timeline with one shared capital
/// pool and a position-count cap.
pub fn simulate_portfolio(
    data: &[(InstrumentMeta, PriceSeries)],
    strategy: &dyn SignalStrategy,
    combo: &ParameterCombo,
    config: &SimConfig,
) -> SimResult {
    let warmup = strategy.warmup_bars().max(2);

    let timeline: BTreeSet<DateTime<Utc>> = data
        .iter()
        .flat_map(|(_, series)| series.candles.iter().map(|c| c.ts))
        .collect();

    let mut cursors = vec![0usize; data.len()];
    let mut last_close: HashMap<String, f64> = HashMap::new();
    let mut positions: HashMap<String, OpenPosition> = HashMap::new();

    let mut equity = config.initial_equity;
    let mut used_margin = 0.0;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(timeline.len());

    for &ts in &timeline {
        // Which instruments have a bar at this timestamp.
        let mut current: Vec<(usize, usize)> = Vec::new();
        for (idx, (_, series)) in data.iter().enumerate() {
            let cursor = cursors[idx];
            if cursor < series.candles.len() && series.candles[cursor].ts == ts {
                current.push((idx, cursor));
                cursors[idx] += 1;
                last_close.insert(series.symbol.clone(), series.candles[cursor].close);
            }
        }

        // Exits first, two-pass: collect triggered symbols, then close.
        let mut exits: Vec<(String, f64, ExitReason)> = Vec::new();
        for &(idx, bar) in &current {
            let (_, series) = &data[idx];
            if let Some(position) = positions.get_mut(&series.symbol) {
                if let Some((raw_price, reason)) =
                    check_exit(position, &series.candles[bar])
                {
                    exits.push((series.symbol.clone(), raw_price, reason));
                }
            }
        }
        for (symbol, raw_price, reason) in exits {
            if let Some(position) = positions.remove(&symbol) {
                used_margin -= position.margin;
                let trade = close_position(position, raw_price, ts, reason, config);
                equity += trade.pnl;
                trades.push(trade);
            }
        }

        // Entries while slots remain.
        for &(idx, bar) in &current {
            if positions.len() >= config.max_open_positions {
                break;
            }
            let (meta, series) = &data[idx];
            if bar < warmup || positions.contains_key(&series.symbol) {
                continue;
            }
            if let Some(signal) = strategy.signal(&series.candles[..=bar]) {
                let available = equity - used_margin;
                if let Some(size) = size_trade(equity, available, combo, meta, config) {
                    let position = open_position(
                        &series.symbol,
                        signal.direction,
                        series.candles[bar].close,
                        ts,
                        size,
                        combo,
                        config,
                    );
                    used_margin += position.margin;
                    positions.insert(series.symbol.clone(), position);
                }
            }
        }

        let mark: f64 = positions
            .values()
            .filter_map(|p| last_close.get(&p.symbol).map(|&c| unrealized(p, c)))
            .sum();
        equity_curve.push(EquityPoint {
            ts,
            equity: equity + mark,
        });
    }

    // Close whatever is still open at each instrument's final price.
    let remaining: Vec<String> = positions.keys().cloned().collect();
    for symbol in remaining {
        if let Some(position) = positions.remove(&symbol) {
            let close = last_close.get(&symbol).copied().unwrap_or(position.entry_price);
            let last_ts = equity_curve
                .last()
                .map(|p| p.ts)
                .unwrap_or(position.entry_ts);
            let trade = close_position(position, close, last_ts, ExitReason::EndOfData, config);
            equity += trade.pnl;
            trades.push(trade);
        }
    }
    if let Some(point) = equity_curve.last_mut() {
        point.equity = equity;
    }

    SimResult {
        trades,
        equity_curve,
        initial_equity: config.initial_equity,
        final_equity: equity,
        bars: timeline.len(),
    }
}
