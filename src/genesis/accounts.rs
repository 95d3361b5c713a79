use serde_json::json;

use empower_e2e_core::{
    coin::add_coin,
    modules::{AuthGenesis, Balance, BankGenesis, BASE_ACCOUNT_TYPE},
    Coin,
};

use super::GenesisError;

/// Adds a `BaseAccount` for `address` unless one exists.
pub fn ensure_base_account(auth: &mut AuthGenesis, address: &str) -> bool {
    if auth.has_account(address) {
        return false;
    }

    auth.accounts.push(json!({
        "@type": BASE_ACCOUNT_TYPE,
        "address": address,
        "pub_key": null,
        "account_number": "0",
        "sequence": "0",
    }));

    true
}

/// Merges `coin` into the bank balance of `address`. The supply is only
/// adjusted when the base genesis declares one; an empty supply is computed
/// by the chain at init.
pub fn credit_balance(
    bank: &mut BankGenesis,
    address: &str,
    coin: &Coin,
) -> Result<(), GenesisError> {
    match bank.balances.iter_mut().find(|x| x.address == address) {
        Some(balance) => add_coin(&mut balance.coins, coin)?,
        None => bank.balances.push(Balance {
            address: address.to_owned(),
            coins: vec![coin.clone()],
        }),
    }

    if !bank.supply.is_empty() {
        add_coin(&mut bank.supply, coin)?;
    }

    Ok(())
}

pub fn add_base_account_and_balance(
    auth: &mut AuthGenesis,
    bank: &mut BankGenesis,
    address: &str,
    coin: &Coin,
) -> Result<(), GenesisError> {
    ensure_base_account(auth, address);
    credit_balance(bank, address, coin)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "empower1qnk2n4nlkpw9xfqntladh74w6ujtulwnz7rf8m";

    #[test]
    fn account_added_once_balance_merged() {
        let mut auth = AuthGenesis::default();
        let mut bank = BankGenesis::default();

        let coin = Coin::new(100, "stake");

        add_base_account_and_balance(&mut auth, &mut bank, ADDR, &coin).unwrap();
        add_base_account_and_balance(&mut auth, &mut bank, ADDR, &coin).unwrap();

        assert_eq!(auth.accounts.len(), 1);
        assert_eq!(auth.accounts[0]["@type"], BASE_ACCOUNT_TYPE);
        assert_eq!(bank.balances.len(), 1);
        assert_eq!(bank.balances[0].coins, vec![Coin::new(200, "stake")]);
        assert!(bank.supply.is_empty());
    }

    #[test]
    fn explicit_supply_follows_credits() {
        let mut bank = BankGenesis {
            supply: vec![Coin::new(1_000, "stake")],
            ..Default::default()
        };

        credit_balance(&mut bank, ADDR, &Coin::new(5, "stake")).unwrap();
        credit_balance(&mut bank, ADDR, &Coin::new(7, "atoken")).unwrap();

        assert_eq!(
            bank.supply,
            vec![Coin::new(7, "atoken"), Coin::new(1_005, "stake")]
        );
    }
}
