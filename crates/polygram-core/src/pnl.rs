//! PNL calculation
//!
//! Realized PnL per trade by average cost, and the wallet summary built from
//! positions and trades.

use std::collections::HashMap;

use crate::models::{Position, PnlSummary, Trade, TradeSide, NO_TRADING_HISTORY};

/// Assign realized PnL to each trade using average-cost accounting.
///
/// Fills are replayed oldest first (ties keep upstream order), one book per
/// outcome token. Buys add to the held size and cost basis and realize
/// nothing. Sells realize `(price - avg_cost) * matched` for the part of the
/// fill covered by known holdings; the uncovered remainder realizes nothing
/// because the history that opened it is not available.
pub fn realize_trades(trades: &mut [Trade]) {
    let mut order: Vec<usize> = (0..trades.len()).collect();
    order.sort_by_key(|&i| trades[i].timestamp);

    let mut books: HashMap<String, Lot> = HashMap::new();

    for i in order {
        let trade = &mut trades[i];
        let key = if trade.asset.is_empty() {
            trade.market_id.clone()
        } else {
            trade.asset.clone()
        };
        let lot = books.entry(key).or_default();

        trade.pnl = match trade.side {
            TradeSide::Buy => {
                lot.size += trade.size;
                lot.cost += trade.size * trade.price;
                0.0
            }
            TradeSide::Sell => {
                let matched = trade.size.min(lot.size);
                if matched <= 0.0 {
                    0.0
                } else {
                    let avg_cost = lot.cost / lot.size;
                    lot.size -= matched;
                    lot.cost -= avg_cost * matched;
                    (trade.price - avg_cost) * matched
                }
            }
        };
    }
}

/// Aggregate positions and trades into a wallet summary.
///
/// `trades` must already carry realized PnL (see [`realize_trades`]).
pub fn summarize(positions: &[Position], trades: &[Trade]) -> PnlSummary {
    let unrealized: f64 = positions.iter().map(|p| p.pnl).sum();
    let realized: f64 = trades.iter().map(|t| t.pnl).sum();
    let volume: f64 = trades.iter().map(|t| t.volume).sum();
    let winning = trades.iter().filter(|t| t.pnl > 0.0).count();

    let win_rate = if trades.is_empty() {
        0.0
    } else {
        round_to(winning as f64 / trades.len() as f64 * 100.0, 1)
    };

    PnlSummary {
        total_pnl: round_to(unrealized + realized, 2),
        realized_pnl: round_to(realized, 2),
        unrealized_pnl: round_to(unrealized, 2),
        total_volume: round_to(volume, 2),
        total_trades: trades.len(),
        win_rate,
        active_since: active_since(trades),
    }
}

fn active_since(trades: &[Trade]) -> String {
    trades
        .iter()
        .map(|t| t.timestamp)
        .min()
        .map(|earliest| earliest.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|| NO_TRADING_HISTORY.to_string())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Default)]
struct Lot {
    size: f64,
    cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use chrono::{TimeZone, Utc};

    fn trade(asset: &str, side: TradeSide, size: f64, price: f64, ts: i64) -> Trade {
        Trade {
            id: format!("{asset}-{ts}"),
            asset: asset.to_string(),
            market_id: "0xmarket".to_string(),
            title: "Test market".to_string(),
            side,
            size,
            price,
            volume: size * price,
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            pnl: 0.0,
        }
    }

    fn position(pnl: f64) -> Position {
        Position {
            market_id: "0xmarket".to_string(),
            asset: "1".to_string(),
            title: "Test market".to_string(),
            outcome: Outcome::Yes,
            size: 10.0,
            avg_price: 0.5,
            current_price: 0.5,
            current_value: 5.0,
            pnl,
            percent_pnl: 0.0,
            redeemable: false,
            mergeable: false,
        }
    }

    #[test]
    fn test_average_cost_realization() {
        let mut trades = vec![
            trade("a", TradeSide::Buy, 100.0, 0.40, 1_700_000_000),
            trade("a", TradeSide::Buy, 100.0, 0.60, 1_700_000_100),
            trade("a", TradeSide::Sell, 50.0, 0.70, 1_700_000_200),
        ];
        realize_trades(&mut trades);

        assert_eq!(trades[0].pnl, 0.0);
        assert_eq!(trades[1].pnl, 0.0);
        // avg cost 0.50 -> (0.70 - 0.50) * 50
        assert!((trades[2].pnl - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_realization_replays_chronologically() {
        // upstream returns newest first
        let mut trades = vec![
            trade("a", TradeSide::Sell, 10.0, 0.30, 1_700_000_200),
            trade("a", TradeSide::Buy, 10.0, 0.50, 1_700_000_100),
        ];
        realize_trades(&mut trades);

        assert!((trades[0].pnl - -2.0).abs() < 1e-9);
        assert_eq!(trades[1].pnl, 0.0);
    }

    #[test]
    fn test_sell_without_cost_basis_realizes_nothing() {
        let mut trades = vec![
            trade("a", TradeSide::Buy, 10.0, 0.50, 1_700_000_000),
            trade("b", TradeSide::Sell, 10.0, 0.90, 1_700_000_100),
            trade("a", TradeSide::Sell, 25.0, 0.60, 1_700_000_200),
        ];
        realize_trades(&mut trades);

        assert_eq!(trades[1].pnl, 0.0);
        // only the 10 held shares are matched
        assert!((trades[2].pnl - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_without_trades() {
        let summary = summarize(&[position(12.346)], &[]);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.active_since, NO_TRADING_HISTORY);
        assert_eq!(summary.unrealized_pnl, 12.35);
        assert_eq!(summary.realized_pnl, 0.0);
        assert_eq!(summary.total_volume, 0.0);
    }

    #[test]
    fn test_summary_totals_and_win_rate() {
        let mut trades = vec![
            trade("a", TradeSide::Buy, 100.0, 0.40, 1_700_000_000),
            trade("a", TradeSide::Sell, 50.0, 0.70, 1_700_086_400),
            trade("a", TradeSide::Sell, 50.0, 0.10, 1_700_172_800),
        ];
        realize_trades(&mut trades);
        let positions = [position(3.333), position(-1.111)];

        let summary = summarize(&positions, &trades);
        assert_eq!(summary.total_trades, 3);
        assert_eq!(summary.win_rate, 33.3);
        assert_eq!(summary.realized_pnl, 0.0);
        assert_eq!(summary.unrealized_pnl, 2.22);
        assert_eq!(summary.total_volume, 80.0);
        assert!(
            (summary.total_pnl - (summary.unrealized_pnl + summary.realized_pnl)).abs() <= 0.011
        );
        // 1_700_000_000 is 2023-11-14 UTC
        assert_eq!(summary.active_since, "11/14/2023");
    }

    #[test]
    fn test_total_matches_parts_with_rounding() {
        let mut trades = vec![
            trade("a", TradeSide::Buy, 3.0, 0.333, 1_700_000_000),
            trade("a", TradeSide::Sell, 3.0, 0.5, 1_700_000_001),
        ];
        realize_trades(&mut trades);
        let positions = [position(0.004), position(0.004)];

        let summary = summarize(&positions, &trades);
        assert!(
            (summary.total_pnl - (summary.unrealized_pnl + summary.realized_pnl)).abs() <= 0.011
        );
        assert_eq!(summary.win_rate, 50.0);
    }
}
