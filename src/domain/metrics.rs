//! Simulation result statistics.
//!
//! Computed once, at simulation end, from the full trade list and equity
//! curve. Risk ratios are taken over per-trade returns (population standard
//! deviation, no annualization).

use crate::domain::portfolio::{EquityPoint, Portfolio};
use crate::domain::position::Trade;

/// When there are no trades yet there is no evidence either way.
pub const NO_EVIDENCE_WIN_RATE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Largest peak-to-trough equity decline, in percent.
    pub max_drawdown_pct: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl SimulationResult {
    pub fn compute(portfolio: &Portfolio) -> Self {
        let trades = &portfolio.trades;
        let initial_capital = portfolio.initial_capital;
        let final_capital = portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let mut winning = 0usize;
        let mut losing = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            if trade.pnl > 0.0 {
                winning += 1;
                total_wins += trade.pnl;
                largest_win = largest_win.max(trade.pnl);
            } else if trade.pnl < 0.0 {
                losing += 1;
                total_losses += trade.pnl.abs();
                largest_loss = largest_loss.max(trade.pnl.abs());
            }
        }

        let win_rate = if trades.is_empty() {
            NO_EVIDENCE_WIN_RATE
        } else {
            winning as f64 / trades.len() as f64
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else {
            0.0
        };

        let avg_win = if winning > 0 {
            total_wins / winning as f64
        } else {
            0.0
        };
        let avg_loss = if losing > 0 {
            total_losses / losing as f64
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let (sharpe_ratio, sortino_ratio) = risk_adjusted(&returns);

        let max_drawdown_pct = max_drawdown_pct(&portfolio.equity_curve);
        let total_return_pct = if initial_capital > 0.0 {
            (final_capital - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };
        let calmar_ratio = if max_drawdown_pct > 0.0 {
            total_return_pct / max_drawdown_pct
        } else {
            0.0
        };

        SimulationResult {
            initial_capital,
            final_capital,
            trades: trades.clone(),
            win_rate,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown_pct,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
        }
    }
}

/// Sharpe over all trade returns, Sortino over downside deviation only.
fn risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 { mean / stddev } else { 0.0 };

    let downside_variance = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        mean / downside_stddev
    } else {
        0.0
    };

    (sharpe, sortino)
}

/// Largest peak-to-trough decline of the running equity curve, in percent.
fn max_drawdown_pct(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}
