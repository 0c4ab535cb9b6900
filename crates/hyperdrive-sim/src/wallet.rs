//! Per-agent balances and the delta-apply mechanism that mutates them.
//!
//! The reference implementation keys a wallet's positions by attribute
//! name on a duck-typed object (`wallet["longs"][mint_time]`); here a
//! wallet is a plain record and updates go through a tagged
//! [`WalletDelta`] variant instead of dynamic dispatch.

use std::collections::BTreeMap;

use fixedpointmath::FixedDecimal;
use serde::{Deserialize, Serialize};

/// An open long position, keyed by the `mint_time` it was opened at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Long {
    pub balance: FixedDecimal,
    pub mint_time: FixedDecimal,
    pub open_share_price: FixedDecimal,
}

/// An open short position, keyed by the `mint_time` it was opened at. The
/// margin is the trader's maximum loss, held by the wallet until close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Short {
    pub balance: FixedDecimal,
    pub open_share_price: FixedDecimal,
    pub mint_time: FixedDecimal,
    pub margin: FixedDecimal,
}

/// One agent's fungible and non-fungible balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: u64,
    pub base: FixedDecimal,
    pub lp_balance: FixedDecimal,
    pub longs: BTreeMap<FixedDecimal, Long>,
    pub shorts: BTreeMap<FixedDecimal, Short>,
    pub fees_paid: FixedDecimal,
}

impl Wallet {
    pub fn new(address: u64, base: FixedDecimal) -> Self {
        Self {
            address,
            base,
            lp_balance: FixedDecimal::zero(),
            longs: BTreeMap::new(),
            shorts: BTreeMap::new(),
            fees_paid: FixedDecimal::zero(),
        }
    }

    /// Total budget still available to this wallet: base on hand, ignoring
    /// the mark-to-market value of open positions (used for max-trade
    /// sizing, which only ever consumes `base`).
    pub fn budget(&self) -> FixedDecimal {
        self.base
    }

    pub fn apply(&mut self, deltas: &WalletDeltas) {
        for delta in &deltas.0 {
            match delta {
                WalletDelta::Base(amount) => self.base = self.base + *amount,
                WalletDelta::LpBalance(amount) => self.lp_balance = self.lp_balance + *amount,
                WalletDelta::FeesPaid(amount) => self.fees_paid = self.fees_paid + *amount,
                WalletDelta::Long { mint_time, balance_delta, open_share_price } => {
                    let entry = self.longs.entry(*mint_time).or_insert(Long {
                        balance: FixedDecimal::zero(),
                        mint_time: *mint_time,
                        open_share_price: *open_share_price,
                    });
                    entry.balance = entry.balance + *balance_delta;
                    if entry.balance <= FixedDecimal::zero() {
                        self.longs.remove(mint_time);
                    }
                }
                WalletDelta::Short { mint_time, balance_delta, open_share_price, margin_delta } => {
                    let entry = self.shorts.entry(*mint_time).or_insert(Short {
                        balance: FixedDecimal::zero(),
                        open_share_price: *open_share_price,
                        mint_time: *mint_time,
                        margin: FixedDecimal::zero(),
                    });
                    entry.balance = entry.balance + *balance_delta;
                    entry.margin = entry.margin + *margin_delta;
                    if entry.balance <= FixedDecimal::zero() {
                        self.base = self.base + entry.margin;
                        self.shorts.remove(mint_time);
                    }
                }
            }
        }
    }

    /// A read-only accounting snapshot used by analytics and the
    /// end-of-run report: open position counts and a rough mark-to-market
    /// total value at the given spot price.
    pub fn snapshot(&self, spot_price: FixedDecimal) -> WalletSnapshot {
        let longs_value: FixedDecimal = self
            .longs
            .values()
            .map(|l| l.balance * spot_price)
            .fold(FixedDecimal::zero(), |a, b| a + b);
        let shorts_margin: FixedDecimal = self
            .shorts
            .values()
            .map(|s| s.margin)
            .fold(FixedDecimal::zero(), |a, b| a + b);
        WalletSnapshot {
            base: self.base,
            lp_balance: self.lp_balance,
            open_longs: self.longs.len(),
            open_shorts: self.shorts.len(),
            longs_value,
            shorts_margin,
            total_value: self.base + self.lp_balance + longs_value + shorts_margin,
            fees_paid: self.fees_paid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub base: FixedDecimal,
    pub lp_balance: FixedDecimal,
    pub open_longs: usize,
    pub open_shorts: usize,
    pub longs_value: FixedDecimal,
    pub shorts_margin: FixedDecimal,
    pub total_value: FixedDecimal,
    pub fees_paid: FixedDecimal,
}

/// A single named change to a wallet's balances, matched exhaustively by
/// [`Wallet::apply`]. Prefer constructing these via [`WalletDeltas`]'s
/// helper methods over building the enum directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalletDelta {
    Base(FixedDecimal),
    LpBalance(FixedDecimal),
    FeesPaid(FixedDecimal),
    Long {
        mint_time: FixedDecimal,
        balance_delta: FixedDecimal,
        open_share_price: FixedDecimal,
    },
    Short {
        mint_time: FixedDecimal,
        balance_delta: FixedDecimal,
        open_share_price: FixedDecimal,
        margin_delta: FixedDecimal,
    },
}

#[derive(Debug, Clone, Default)]
pub struct WalletDeltas(pub Vec<WalletDelta>);

impl WalletDeltas {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, delta: WalletDelta) {
        self.0.push(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixedpointmath::fixed;

    #[test]
    fn long_is_pruned_when_balance_reaches_zero() {
        let mut wallet = Wallet::new(0, fixed!(1_000));
        wallet.apply(&WalletDeltas(vec![WalletDelta::Long {
            mint_time: fixed!(0),
            balance_delta: fixed!(10),
            open_share_price: fixed!(1),
        }]));
        assert_eq!(wallet.longs.len(), 1);

        wallet.apply(&WalletDeltas(vec![WalletDelta::Long {
            mint_time: fixed!(0),
            balance_delta: fixed!(-10),
            open_share_price: fixed!(1),
        }]));
        assert_eq!(wallet.longs.len(), 0);
    }

    #[test]
    fn short_close_returns_margin_to_base() {
        let mut wallet = Wallet::new(0, fixed!(1_000));
        wallet.apply(&WalletDeltas(vec![
            WalletDelta::Base(fixed!(-50)),
            WalletDelta::Short {
                mint_time: fixed!(0),
                balance_delta: fixed!(10),
                open_share_price: fixed!(1),
                margin_delta: fixed!(50),
            },
        ]));
        assert_eq!(wallet.base, fixed!(950));
        assert_eq!(wallet.shorts.len(), 1);

        wallet.apply(&WalletDeltas(vec![WalletDelta::Short {
            mint_time: fixed!(0),
            balance_delta: fixed!(-10),
            open_share_price: fixed!(1),
            margin_delta: fixed!(0),
        }]));
        assert_eq!(wallet.shorts.len(), 0);
        assert_eq!(wallet.base, fixed!(1_000));
    }
}
