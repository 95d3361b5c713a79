use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

/// Fractional digits carried by the chain's `Dec` type.
const DEC_PRECISION: u32 = 18;
const DEC_ONE: u128 = 10u128.pow(DEC_PRECISION);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid coin expression: {0}")]
    Expression(String),

    #[error("invalid decimal amount: {0}")]
    Decimal(String),

    #[error("amount overflow for denom {0}")]
    Overflow(String),
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,

    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    /// Parses the `<amount><denom>` shorthand used by CLI flags, e.g. `10stake`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::Expression(s.to_owned()))?;

        let (amount, denom) = s.split_at(split);

        if amount.is_empty() || denom.is_empty() {
            return Err(CoinError::Expression(s.to_owned()));
        }

        let amount = amount
            .parse()
            .map_err(|_| CoinError::Expression(s.to_owned()))?;

        Ok(Coin::new(amount, denom))
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Adds `coin` into a denom-sorted coin list, merging with an existing entry.
pub fn add_coin(coins: &mut Vec<Coin>, coin: &Coin) -> Result<(), CoinError> {
    match coins.binary_search_by(|c| c.denom.as_str().cmp(&coin.denom)) {
        Ok(idx) => {
            let existing = &mut coins[idx];
            existing.amount = existing
                .amount
                .checked_add(coin.amount)
                .ok_or_else(|| CoinError::Overflow(coin.denom.clone()))?;
        }
        Err(idx) => coins.insert(idx, coin.clone()),
    }

    Ok(())
}

/// Decimal with 18 fractional digits, stored as atomic units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Dec(u128);

impl Dec {
    pub fn from_integer(value: u128) -> Result<Self, CoinError> {
        value
            .checked_mul(DEC_ONE)
            .map(Dec)
            .ok_or_else(|| CoinError::Decimal(value.to_string()))
    }

    pub fn checked_add(self, other: Dec) -> Option<Dec> {
        self.0.checked_add(other.0).map(Dec)
    }
}

impl FromStr for Dec {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoinError::Decimal(s.to_owned());

        let (int, frac) = s.split_once('.').unwrap_or((s, ""));

        if int.is_empty() || frac.len() > DEC_PRECISION as usize {
            return Err(invalid());
        }

        let int: u128 = int.parse().map_err(|_| invalid())?;

        let frac_units = if frac.is_empty() {
            0
        } else {
            let digits: u128 = frac.parse().map_err(|_| invalid())?;
            digits * 10u128.pow(DEC_PRECISION - frac.len() as u32)
        };

        int.checked_mul(DEC_ONE)
            .and_then(|x| x.checked_add(frac_units))
            .map(Dec)
            .ok_or_else(invalid)
    }
}

impl Display for Dec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / DEC_ONE,
            self.0 % DEC_ONE,
            width = DEC_PRECISION as usize
        )
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,

    #[serde_as(as = "DisplayFromStr")]
    pub amount: Dec,
}

impl DecCoin {
    pub fn from_coin(coin: &Coin) -> Result<Self, CoinError> {
        Ok(Self {
            denom: coin.denom.clone(),
            amount: Dec::from_integer(coin.amount)?,
        })
    }
}

/// Same as [`add_coin`] for decimal coin lists such as the community pool.
pub fn add_dec_coin(coins: &mut Vec<DecCoin>, coin: &DecCoin) -> Result<(), CoinError> {
    match coins.binary_search_by(|c| c.denom.as_str().cmp(&coin.denom)) {
        Ok(idx) => {
            let existing = &mut coins[idx];
            existing.amount = existing
                .amount
                .checked_add(coin.amount)
                .ok_or_else(|| CoinError::Overflow(coin.denom.clone()))?;
        }
        Err(idx) => coins.insert(idx, coin.clone()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_shorthand() {
        let coin: Coin = "50000stake".parse().unwrap();
        assert_eq!(coin, Coin::new(50000, "stake"));
        assert_eq!(coin.to_string(), "50000stake");

        assert!("stake".parse::<Coin>().is_err());
        assert!("100".parse::<Coin>().is_err());
    }

    #[test]
    fn coin_amount_is_a_json_string() {
        let json = serde_json::to_value(Coin::new(10, "stake")).unwrap();
        assert_eq!(json, serde_json::json!({"denom": "stake", "amount": "10"}));
    }

    #[test]
    fn add_coin_merges_and_keeps_order() {
        let mut coins = vec![Coin::new(5, "stake")];

        add_coin(&mut coins, &Coin::new(1, "atom")).unwrap();
        add_coin(&mut coins, &Coin::new(7, "stake")).unwrap();

        assert_eq!(coins, vec![Coin::new(1, "atom"), Coin::new(12, "stake")]);
    }

    #[test]
    fn dec_round_trips_chain_format() {
        let dec: Dec = "50000.000000000000000000".parse().unwrap();
        assert_eq!(dec, Dec::from_integer(50000).unwrap());
        assert_eq!(dec.to_string(), "50000.000000000000000000");

        let half: Dec = "0.5".parse().unwrap();
        assert_eq!(half.to_string(), "0.500000000000000000");
    }

    #[test]
    fn community_pool_accumulates() {
        let fee = Coin::new(50000, "stake");
        let mut pool = vec![];

        add_dec_coin(&mut pool, &DecCoin::from_coin(&fee).unwrap()).unwrap();
        add_dec_coin(&mut pool, &DecCoin::from_coin(&fee).unwrap()).unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].amount.to_string(), "100000.000000000000000000");
    }

    proptest::proptest! {
        #[test]
        fn dec_display_parses_back(int in 0u128..1_000_000_000, frac in 0u128..DEC_ONE) {
            let dec = Dec(int * DEC_ONE + frac);
            let parsed: Dec = dec.to_string().parse().unwrap();
            proptest::prop_assert_eq!(parsed, dec);
        }
    }
}
