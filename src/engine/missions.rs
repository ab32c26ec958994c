//! 任务缓存：missionId → (快照, 再验证令牌)
//!
//! 只由任务刷新与完成两个例程修改。条件请求命中（未修改）时直接返回缓存快照；
//! 刷新失败保留旧条目（宁可陈旧，不可丢失）；完成成功后驱逐条目。

use std::collections::BTreeMap;

use crate::core::BotError;
use crate::engine::RetryPolicy;
use crate::gateway::GameGateway;
use crate::model::{Fetch, Mission};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    snapshot: Mission,
    token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MissionCache {
    /// 跟踪的任务 ID，按配置顺序刷新
    tracked: Vec<u64>,
    entries: BTreeMap<u64, CacheEntry>,
}

impl MissionCache {
    pub fn new(tracked: Vec<u64>) -> Self {
        Self {
            tracked,
            entries: BTreeMap::new(),
        }
    }

    pub fn tracked(&self) -> &[u64] {
        &self.tracked
    }

    pub fn get(&self, mission_id: u64) -> Option<&Mission> {
        self.entries.get(&mission_id).map(|e| &e.snapshot)
    }

    pub fn token(&self, mission_id: u64) -> Option<&str> {
        self.entries.get(&mission_id).and_then(|e| e.token.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有缓存快照（按 ID 升序）
    pub fn snapshots(&self) -> Vec<Mission> {
        self.entries.values().map(|e| e.snapshot.clone()).collect()
    }

    /// 应用一次条件请求结果
    ///
    /// NotModified 返回缓存快照且不改令牌；Fresh 替换快照与令牌。
    pub fn revalidate(&mut self, mission_id: u64, fetch: Fetch<Mission>) -> Result<Mission, BotError> {
        match fetch {
            Fetch::NotModified => self
                .get(mission_id)
                .cloned()
                .ok_or(BotError::NotModifiedWithoutCache(mission_id)),
            Fetch::Fresh { value, token } => {
                self.entries.insert(
                    mission_id,
                    CacheEntry {
                        snapshot: value.clone(),
                        token,
                    },
                );
                Ok(value)
            }
        }
    }

    /// 驱逐条目；不存在时为空操作
    pub fn evict(&mut self, mission_id: u64) -> Option<Mission> {
        self.entries.remove(&mission_id).map(|e| e.snapshot)
    }

    /// 条件刷新单个任务；失败时旧条目保持不变
    pub async fn refresh_mission<G>(
        &mut self,
        gateway: &G,
        retry: &RetryPolicy,
        mission_id: u64,
    ) -> Result<Mission, BotError>
    where
        G: GameGateway + ?Sized,
    {
        let token = self.token(mission_id).map(String::from);
        let label = format!("fetch mission {}", mission_id);
        let fetch = retry
            .run(&label, || gateway.mission_progress(mission_id, token.as_deref()))
            .await?;
        if fetch == Fetch::NotModified {
            tracing::info!("Using cached data for mission {} (no changes)", mission_id);
        }
        self.revalidate(mission_id, fetch)
    }

    /// 逐个刷新所有跟踪的任务，单个失败不影响其它
    ///
    /// 若本轮全部失败而缓存非空，返回缓存中的陈旧快照而不是空结果。
    pub async fn refresh_all<G>(&mut self, gateway: &G, retry: &RetryPolicy) -> Vec<Mission>
    where
        G: GameGateway + ?Sized,
    {
        tracing::info!("Fetching all active missions...");
        let mut missions = Vec::new();
        for mission_id in self.tracked.clone() {
            match self.refresh_mission(gateway, retry, mission_id).await {
                Ok(mission) => missions.push(mission),
                Err(e) => tracing::warn!("Failed to fetch mission {}: {}", mission_id, e),
            }
        }

        if missions.is_empty() && !self.is_empty() {
            tracing::warn!("All mission requests failed, falling back to {} cached snapshots", self.len());
            missions = self.snapshots();
        }

        if missions.is_empty() {
            tracing::warn!("No active missions found or all requests failed.");
        } else {
            tracing::info!("Found {} active missions", missions.len());
            for mission in &missions {
                log_mission(mission);
            }
        }
        missions
    }

    /// 提交完成；成功驱逐条目（不在缓存中时仍会发请求），失败保留条目供下一轮重试
    pub async fn complete_mission<G>(
        &mut self,
        gateway: &G,
        retry: &RetryPolicy,
        mission_id: u64,
    ) -> Result<(), BotError>
    where
        G: GameGateway + ?Sized,
    {
        let label = format!("complete mission {}", mission_id);
        match retry.run(&label, || gateway.complete_mission(mission_id)).await {
            Ok(()) => {
                self.evict(mission_id);
                tracing::info!("Mission {} completed successfully!", mission_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to complete mission {}: {}", mission_id, e);
                Err(e.into())
            }
        }
    }
}

fn log_mission(mission: &Mission) {
    let p = &mission.overall_progress;
    tracing::info!("Mission ID: {} - {}", mission.id, mission.description);
    tracing::info!("Progress: {} ({}/{})", p.text, p.met, p.total);
    for req in &mission.requirements {
        tracing::debug!(
            "  - {}: {}{}",
            req.item_name,
            req.progress_text,
            if req.is_met { " (Met)" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::GatewayError;
    use crate::gateway::{Call, MockGateway};
    use crate::model::{OverallProgress, Requirement};

    fn mission(id: u64, met: u32, completable: bool) -> Mission {
        Mission {
            id,
            description: format!("Mission {}", id),
            overall_progress: OverallProgress {
                met,
                total: 2,
                text: format!("{}/2", met),
            },
            requirements: vec![Requirement {
                item_name: "Wood".to_string(),
                progress_text: "1/3".to_string(),
                is_met: false,
            }],
            can_complete_now: completable,
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_not_modified_returns_identical_snapshot_and_keeps_token() {
        let gw = MockGateway::new();
        gw.push_mission(780, Ok(Fetch::fresh(mission(780, 1, false), Some("etag-1".into()))));
        let mut cache = MissionCache::new(vec![780]);

        let first = cache.refresh_mission(&gw, &retry(), 780).await.unwrap();
        let second = cache.refresh_mission(&gw, &retry(), 780).await.unwrap();
        let third = cache.refresh_mission(&gw, &retry(), 780).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(cache.token(780), Some("etag-1"));
        let sent: Vec<_> = gw
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::MissionProgress { token, .. } => Some(token),
                _ => None,
            })
            .collect();
        assert_eq!(sent, vec![None, Some("etag-1".into()), Some("etag-1".into())]);
    }

    #[tokio::test]
    async fn test_fresh_response_replaces_snapshot_and_token() {
        let gw = MockGateway::new();
        gw.push_mission(780, Ok(Fetch::fresh(mission(780, 1, false), Some("a".into()))));
        gw.push_mission(780, Ok(Fetch::fresh(mission(780, 2, true), Some("b".into()))));
        let mut cache = MissionCache::new(vec![780]);

        cache.refresh_mission(&gw, &retry(), 780).await.unwrap();
        let updated = cache.refresh_mission(&gw, &retry(), 780).await.unwrap();
        assert_eq!(updated.overall_progress.met, 2);
        assert_eq!(cache.token(780), Some("b"));
    }

    #[tokio::test]
    async fn test_rejection_keeps_prior_entry() {
        let gw = MockGateway::new();
        gw.push_mission(780, Ok(Fetch::fresh(mission(780, 1, false), Some("a".into()))));
        gw.push_mission(780, Err(GatewayError::rejected("MISSION_LOCKED")));
        let mut cache = MissionCache::new(vec![780]);

        cache.refresh_mission(&gw, &retry(), 780).await.unwrap();
        assert!(cache.refresh_mission(&gw, &retry(), 780).await.is_err());
        assert_eq!(cache.get(780), Some(&mission(780, 1, false)));
        assert_eq!(cache.token(780), Some("a"));
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_failures() {
        let gw = MockGateway::new();
        gw.push_mission(780, Err(GatewayError::rejected("NOPE")));
        gw.push_mission(790, Ok(Fetch::fresh(mission(790, 0, false), None)));
        let mut cache = MissionCache::new(vec![780, 790]);

        let missions = cache.refresh_all(&gw, &retry()).await;
        assert_eq!(missions, vec![mission(790, 0, false)]);
    }

    #[tokio::test]
    async fn test_refresh_all_falls_back_to_stale_entries() {
        let gw = MockGateway::new();
        let mut cache = MissionCache::new(vec![780, 790]);
        cache
            .revalidate(780, Fetch::fresh(mission(780, 1, false), Some("a".into())))
            .unwrap();
        gw.push_mission(780, Err(GatewayError::rejected("DOWN")));
        gw.push_mission(790, Err(GatewayError::rejected("DOWN")));

        let missions = cache.refresh_all(&gw, &retry()).await;
        assert_eq!(missions, vec![mission(780, 1, false)]);
    }

    #[tokio::test]
    async fn test_not_modified_without_cache_is_failure() {
        let gw = MockGateway::new();
        let mut cache = MissionCache::new(vec![780]);
        let err = cache.refresh_mission(&gw, &retry(), 780).await.unwrap_err();
        assert!(matches!(err, BotError::NotModifiedWithoutCache(780)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_complete_evicts_on_success_and_keeps_on_failure() {
        let gw = MockGateway::new();
        let mut cache = MissionCache::new(vec![780]);
        cache.revalidate(780, Fetch::fresh(mission(780, 2, true), None)).unwrap();

        gw.push_complete(Err(GatewayError::rejected("NOT_READY")));
        assert!(cache.complete_mission(&gw, &retry(), 780).await.is_err());
        assert!(cache.get(780).is_some());

        cache.complete_mission(&gw, &retry(), 780).await.unwrap();
        assert!(cache.get(780).is_none());
    }

    #[tokio::test]
    async fn test_complete_on_uncached_mission_still_calls_remote() {
        let gw = MockGateway::new();
        let mut cache = MissionCache::new(vec![780]);
        cache.complete_mission(&gw, &retry(), 780).await.unwrap();
        assert_eq!(gw.calls(), vec![Call::CompleteMission(780)]);
    }
}
