//! 能量账本
//!
//! 权威值只来自周期性的 get-energy；成功采集后的本地扣减是乐观估计，
//! 仅用于避免发出注定失败的请求。

use crate::core::GatewayError;
use crate::model::{EnergyReading, Fetch};

/// 刷新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyRefresh {
    Fresh,
    NotModified,
    /// 请求失败，沿用上次已知值
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyLedger {
    current: u32,
    max: u32,
    token: Option<String>,
}

impl Default for EnergyLedger {
    fn default() -> Self {
        Self::new(0, 1500)
    }
}

impl EnergyLedger {
    pub fn new(current: u32, max: u32) -> Self {
        Self {
            current: current.min(max),
            max,
            token: None,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// 上次 get-energy 的再验证令牌
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 用网关结果更新；NotModified 与失败都保持原值
    pub fn refresh(&mut self, result: Result<Fetch<EnergyReading>, GatewayError>) -> EnergyRefresh {
        match result {
            Ok(Fetch::Fresh { value, token }) => {
                self.max = value.max_energy.max(value.energy);
                self.current = value.energy;
                if token.is_some() {
                    self.token = token;
                }
                tracing::info!("Energy: {}/{}", self.current, self.max);
                EnergyRefresh::Fresh
            }
            Ok(Fetch::NotModified) => {
                tracing::info!(
                    "Energy status unchanged, using cached values ({}/{})",
                    self.current,
                    self.max
                );
                EnergyRefresh::NotModified
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch energy ({}), proceeding with last known {}/{}",
                    e,
                    self.current,
                    self.max
                );
                EnergyRefresh::Unknown
            }
        }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.current >= cost
    }

    /// 本地扣减；调用方应先 can_afford，超额时归零而非下溢
    pub fn spend(&mut self, cost: u32) {
        debug_assert!(self.can_afford(cost), "spend without can_afford");
        self.current = self.current.saturating_sub(cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_reading_overwrites_both_fields() {
        let mut ledger = EnergyLedger::default();
        let outcome = ledger.refresh(Ok(Fetch::fresh(
            EnergyReading {
                energy: 300,
                max_energy: 1200,
            },
            Some("W/\"59\"".to_string()),
        )));
        assert_eq!(outcome, EnergyRefresh::Fresh);
        assert_eq!((ledger.current(), ledger.max()), (300, 1200));
        assert_eq!(ledger.token(), Some("W/\"59\""));
    }

    #[test]
    fn test_not_modified_and_failure_keep_values() {
        let mut ledger = EnergyLedger::new(80, 100);
        assert_eq!(ledger.refresh(Ok(Fetch::NotModified)), EnergyRefresh::NotModified);
        assert_eq!(
            ledger.refresh(Err(GatewayError::Transport("timeout".into()))),
            EnergyRefresh::Unknown
        );
        assert_eq!((ledger.current(), ledger.max()), (80, 100));
    }

    #[test]
    fn test_spend_decrements_by_exact_cost() {
        let mut ledger = EnergyLedger::new(30, 100);
        assert!(ledger.can_afford(25));
        ledger.spend(25);
        assert_eq!(ledger.current(), 5);
        assert!(!ledger.can_afford(25));
    }
}
