//! Economy system: named currencies, upgrade levels and upgrade cost curves.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::GameState;

/// Economy error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconomyError {
    /// Insufficient funds
    #[error("Insufficient {currency:?}: need {needed}, have {have}")]
    InsufficientFunds {
        /// Currency that was short
        currency: CurrencyKey,
        /// Amount needed
        needed: u64,
        /// Amount available
        have: u64,
    },
    /// Currency entry absent from the state
    #[error("Currency not present: {0:?}")]
    MissingCurrency(CurrencyKey),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;

/// Currency identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKey {
    /// Primary currency, pays for upgrades
    Steak,
    /// Pays for gear enhancement
    Gold,
    /// Boss currency
    Dragonscales,
    /// Premium currency
    Gems,
}

impl Default for CurrencyKey {
    fn default() -> Self {
        Self::Steak
    }
}

impl CurrencyKey {
    /// All currencies in display order.
    pub const ALL: [Self; 4] = [Self::Steak, Self::Gold, Self::Dragonscales, Self::Gems];
}

/// A currency balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Currency key
    #[serde(default)]
    pub key: CurrencyKey,
    /// Balance, never negative
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: u64,
    /// Whether the currency has been revealed to the player. Never reverts.
    #[serde(default)]
    pub unlocked: bool,
}

impl Currency {
    /// Creates a currency entry.
    #[must_use]
    pub const fn new(key: CurrencyKey, amount: u64, unlocked: bool) -> Self {
        Self {
            key,
            amount,
            unlocked,
        }
    }
}

/// Older snapshots may carry fractional or negative amounts.
fn lenient_amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(if raw.is_finite() && raw > 0.0 {
        raw.floor() as u64
    } else {
        0
    })
}

/// All currency balances keyed by currency.
///
/// Entries under keys this version does not know are dropped on load, so a
/// snapshot carrying a retired currency still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Currencies(BTreeMap<CurrencyKey, Currency>);

impl<'de> Deserialize<'de> for Currencies {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut balances = BTreeMap::new();
        for (name, entry) in raw {
            let Ok(key) = serde_json::from_value::<CurrencyKey>(Value::String(name.clone())) else {
                warn!("Dropping unknown currency {name}");
                continue;
            };
            let mut currency: Currency = serde_json::from_value(entry).map_err(D::Error::custom)?;
            // the map key wins over a stale or missing inner key
            currency.key = key;
            balances.insert(key, currency);
        }
        Ok(Self(balances))
    }
}

impl Default for Currencies {
    fn default() -> Self {
        let mut balances = BTreeMap::new();
        for key in CurrencyKey::ALL {
            balances.insert(key, Currency::new(key, 0, key == CurrencyKey::Steak));
        }
        Self(balances)
    }
}

impl Currencies {
    /// Creates an empty set with no currency entries at all.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts or replaces a currency entry.
    pub fn insert(&mut self, currency: Currency) {
        self.0.insert(currency.key, currency);
    }

    /// Gets a currency entry.
    #[must_use]
    pub fn get(&self, key: CurrencyKey) -> Option<&Currency> {
        self.0.get(&key)
    }

    /// Returns the balance of a currency, zero when absent.
    #[must_use]
    pub fn balance_of(&self, key: CurrencyKey) -> u64 {
        self.0.get(&key).map_or(0, |c| c.amount)
    }

    /// Checks whether a currency is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, key: CurrencyKey) -> bool {
        self.0.get(&key).is_some_and(|c| c.unlocked)
    }

    /// Credits a currency and unlocks it.
    ///
    /// Returns `false` without touching anything when the entry is absent.
    pub fn earn(&mut self, key: CurrencyKey, amount: u64) -> bool {
        match self.0.get_mut(&key) {
            Some(currency) => {
                currency.amount = currency.amount.saturating_add(amount);
                currency.unlocked = true;
                true
            },
            None => {
                debug!("Skipping credit of {amount} to missing currency {key:?}");
                false
            },
        }
    }

    /// Unlocks a currency without crediting it.
    pub fn unlock(&mut self, key: CurrencyKey) -> bool {
        match self.0.get_mut(&key) {
            Some(currency) => {
                currency.unlocked = true;
                true
            },
            None => false,
        }
    }

    /// Checks a debit without applying it.
    pub fn check_spend(&self, key: CurrencyKey, amount: u64) -> EconomyResult<()> {
        let currency = self.0.get(&key).ok_or(EconomyError::MissingCurrency(key))?;
        if currency.amount < amount {
            return Err(EconomyError::InsufficientFunds {
                currency: key,
                needed: amount,
                have: currency.amount,
            });
        }
        Ok(())
    }

    /// Debits a currency. All-or-nothing.
    pub fn spend(&mut self, key: CurrencyKey, amount: u64) -> EconomyResult<()> {
        self.check_spend(key, amount)?;
        if let Some(currency) = self.0.get_mut(&key) {
            currency.amount -= amount;
        }
        Ok(())
    }

    /// Iterates over all currency entries.
    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.0.values()
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().map(|c| c.amount).sum()
    }
}

/// Purchasable dragon upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeType {
    /// +2 damage per level
    Damage,
    /// +0.3 fire rate multiplier per level
    FireRate,
    /// +8 max health per level
    Health,
    /// +1 dragon per level
    ExtraDragons,
}

impl UpgradeType {
    /// All upgrade types.
    pub const ALL: [Self; 4] = [Self::Damage, Self::FireRate, Self::Health, Self::ExtraDragons];

    /// Cost of the first level.
    #[must_use]
    pub const fn base_cost(self) -> u64 {
        match self {
            Self::Damage => 5,
            Self::FireRate => 8,
            Self::Health => 12,
            Self::ExtraDragons => 500,
        }
    }

    /// Currency the upgrade is paid in.
    #[must_use]
    pub const fn currency(self) -> CurrencyKey {
        CurrencyKey::Steak
    }
}

/// Purchased upgrade levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Upgrades {
    /// Damage upgrade level
    pub damage: u32,
    /// Fire rate upgrade level
    pub fire_rate: u32,
    /// Health upgrade level
    pub health: u32,
    /// Extra dragons purchased
    pub extra_dragons: u32,
}

impl Upgrades {
    /// Returns the level of an upgrade.
    #[must_use]
    pub const fn level(&self, upgrade: UpgradeType) -> u32 {
        match upgrade {
            UpgradeType::Damage => self.damage,
            UpgradeType::FireRate => self.fire_rate,
            UpgradeType::Health => self.health,
            UpgradeType::ExtraDragons => self.extra_dragons,
        }
    }

    fn level_mut(&mut self, upgrade: UpgradeType) -> &mut u32 {
        match upgrade {
            UpgradeType::Damage => &mut self.damage,
            UpgradeType::FireRate => &mut self.fire_rate,
            UpgradeType::Health => &mut self.health,
            UpgradeType::ExtraDragons => &mut self.extra_dragons,
        }
    }
}

/// Cost of buying the next level of an upgrade.
///
/// `base × (level + 1)^1.5`, floored; extra dragons grow with the square instead.
#[must_use]
pub fn upgrade_cost(upgrade: UpgradeType, current_level: u32) -> u64 {
    let base = upgrade.base_cost();
    let next = u64::from(current_level) + 1;
    match upgrade {
        UpgradeType::ExtraDragons => base.saturating_mul(next.saturating_mul(next)),
        _ => (base as f64 * (next as f64).powf(1.5)).floor() as u64,
    }
}

impl GameState {
    /// Credits a currency. Missing entries are skipped.
    pub fn add_currency(&mut self, key: CurrencyKey, amount: u64) -> bool {
        self.currencies.earn(key, amount)
    }

    /// Cost of the next level of an upgrade for this state.
    #[must_use]
    pub fn next_upgrade_cost(&self, upgrade: UpgradeType) -> u64 {
        upgrade_cost(upgrade, self.upgrades.level(upgrade))
    }

    /// Buys one level of an upgrade and rederives the dragon stats.
    ///
    /// Returns the price paid. A health purchase restores the dragon to full health.
    pub fn purchase_upgrade(&mut self, upgrade: UpgradeType) -> EconomyResult<u64> {
        let cost = self.next_upgrade_cost(upgrade);
        self.currencies.spend(upgrade.currency(), cost)?;

        *self.upgrades.level_mut(upgrade) += 1;
        self.refresh_stats();
        if upgrade == UpgradeType::Health {
            self.dragon_stats.current_hp = self.dragon_stats.max_hp;
        }

        debug!(
            "Purchased {upgrade:?} level {} for {cost}",
            self.upgrades.level(upgrade)
        );
        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_upgrade_cost_curve() {
        assert_eq!(upgrade_cost(UpgradeType::Damage, 0), 5);
        assert_eq!(upgrade_cost(UpgradeType::Damage, 1), 14);
        assert_eq!(upgrade_cost(UpgradeType::Health, 0), 12);
        assert_eq!(upgrade_cost(UpgradeType::ExtraDragons, 0), 500);
        assert_eq!(upgrade_cost(UpgradeType::ExtraDragons, 2), 4500);
    }

    #[test]
    fn test_purchase_without_funds_is_rejected() {
        let mut state = GameState::new(0);
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 0);

        let result = state.purchase_upgrade(UpgradeType::Damage);
        assert!(matches!(
            result,
            Err(EconomyError::InsufficientFunds { needed: 5, have: 0, .. })
        ));
        assert_eq!(state.upgrades.damage, 0);
        assert_eq!(state.dragon_stats.damage, 2);
    }

    #[test]
    fn test_purchase_debits_and_levels() {
        let mut state = GameState::new(0);
        state.add_currency(CurrencyKey::Steak, 20);

        assert_eq!(state.purchase_upgrade(UpgradeType::Damage), Ok(5));
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 15);
        assert_eq!(state.upgrades.damage, 1);
        assert_eq!(state.dragon_stats.damage, 4);

        // 14 needed for level 2, 15 available
        assert_eq!(state.purchase_upgrade(UpgradeType::Damage), Ok(14));
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 1);
        assert!(state.purchase_upgrade(UpgradeType::Damage).is_err());
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 1);
    }

    #[test]
    fn test_health_upgrade_restores_full_health() {
        let mut state = GameState::new(0);
        state.add_currency(CurrencyKey::Steak, 100);
        state.dragon_stats.current_hp = 3;

        state
            .purchase_upgrade(UpgradeType::Health)
            .expect("affordable");
        assert_eq!(state.dragon_stats.max_hp, 18);
        assert_eq!(state.dragon_stats.current_hp, 18);
    }

    #[test]
    fn test_extra_dragons_increase_count() {
        let mut state = GameState::new(0);
        state.add_currency(CurrencyKey::Steak, 500);
        state
            .purchase_upgrade(UpgradeType::ExtraDragons)
            .expect("affordable");
        assert_eq!(state.dragon_stats.dragon_count, 2);
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 0);
    }

    #[test]
    fn test_earn_skips_missing_currency() {
        let mut currencies = Currencies::empty();
        assert!(!currencies.earn(CurrencyKey::Gold, 10));
        assert_eq!(currencies.balance_of(CurrencyKey::Gold), 0);
        assert!(matches!(
            currencies.spend(CurrencyKey::Gold, 1),
            Err(EconomyError::MissingCurrency(CurrencyKey::Gold))
        ));
    }

    #[test]
    fn test_earn_unlocks_currency() {
        let mut currencies = Currencies::default();
        assert!(!currencies.is_unlocked(CurrencyKey::Gems));
        currencies.earn(CurrencyKey::Gems, 5);
        assert!(currencies.is_unlocked(CurrencyKey::Gems));
    }

    #[test]
    fn test_lenient_amount_parsing() {
        let parsed: Currency =
            serde_json::from_str(r#"{"key":"gold","amount":12.7,"unlocked":false}"#)
                .expect("parse");
        assert_eq!(parsed.amount, 12);

        let negative: Currency =
            serde_json::from_str(r#"{"key":"gold","amount":-4,"unlocked":false}"#)
                .expect("parse");
        assert_eq!(negative.amount, 0);
    }

    #[test]
    fn test_unknown_currency_dropped_on_load() {
        let currencies: Currencies = serde_json::from_str(
            r#"{
                "steak": {"key": "steak", "amount": 40, "unlocked": true},
                "arcana": {"key": "arcana", "amount": 7, "unlocked": true},
                "gold": {"amount": 3}
            }"#,
        )
        .expect("parse");
        assert_eq!(currencies.balance_of(CurrencyKey::Steak), 40);
        assert_eq!(currencies.balance_of(CurrencyKey::Gold), 3);
        assert_eq!(currencies.get(CurrencyKey::Gold).map(|c| c.key), Some(CurrencyKey::Gold));
        assert_eq!(currencies.iter().count(), 2);
    }

    proptest! {
        #[test]
        fn prop_upgrade_cost_strictly_increasing(level in 0u32..5_000) {
            for upgrade in UpgradeType::ALL {
                prop_assert!(upgrade_cost(upgrade, level + 1) > upgrade_cost(upgrade, level));
            }
        }

        #[test]
        fn prop_spend_never_goes_negative(balance in 0u64..10_000, cost in 0u64..20_000) {
            let mut currencies = Currencies::default();
            currencies.earn(CurrencyKey::Steak, balance);
            let result = currencies.spend(CurrencyKey::Steak, cost);
            if cost > balance {
                prop_assert!(result.is_err());
                prop_assert_eq!(currencies.balance_of(CurrencyKey::Steak), balance);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(currencies.balance_of(CurrencyKey::Steak), balance - cost);
            }
        }
    }
}
