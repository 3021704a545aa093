//! Allocation service tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use ipam_shared_types::*;
use tokio::sync::{Mutex, Notify};

use crate::repository::{MockRepository, RepositoryResult};
use crate::*;

fn asn_range(id: ObjectId, start: u32, end: u32) -> ParentSpace {
    ParentSpace::AsnRange(AsnRange::new(id, format!("range-{}", id), 1, start, end).unwrap())
}

fn service(repository: impl Repository + 'static) -> AllocationService {
    AllocationService::new(Arc::new(repository), AllocatorConfig::default())
}

/// In-memory repository that yields between read and write
struct SlowRepository {
    parents: HashMap<ParentRef, ParentSpace>,
    children: Mutex<Vec<ChildRecord>>,
    write_delay: Duration,
    /// Next write parks until its caller gives up
    stall_next_write: AtomicBool,
    write_started: Notify,
}

impl SlowRepository {
    fn new(parents: Vec<ParentSpace>) -> Self {
        Self {
            parents: parents
                .into_iter()
                .map(|parent| (parent.parent_ref(), parent))
                .collect(),
            children: Mutex::new(Vec::new()),
            write_delay: Duration::from_millis(5),
            stall_next_write: AtomicBool::new(false),
            write_started: Notify::new(),
        }
    }

    fn stalling(self) -> Self {
        self.stall_next_write.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Repository for SlowRepository {
    async fn parent(&self, parent: ParentRef) -> RepositoryResult<Option<ParentSpace>> {
        Ok(self.parents.get(&parent).cloned())
    }

    async fn read_children(
        &self,
        _parent: &ParentSpace,
        kind: ChildKind,
        _scope: &Scope,
    ) -> RepositoryResult<Vec<ChildRecord>> {
        let children = self.children.lock().await;
        Ok(children
            .iter()
            .filter(|child| child.kind() == kind)
            .cloned()
            .collect())
    }

    async fn write_children(
        &self,
        _parent: ParentRef,
        batch: Vec<ChildRecord>,
    ) -> RepositoryResult<Vec<ChildRecord>> {
        self.write_started.notify_one();
        if self.stall_next_write.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        tokio::time::sleep(self.write_delay).await;
        let mut children = self.children.lock().await;

        let taken: HashSet<String> = children.iter().map(unit_key).collect();
        if let Some(duplicate) = batch.iter().map(unit_key).find(|key| taken.contains(key)) {
            return Err(RepositoryError::Constraint {
                message: format!("{} already exists", duplicate),
            });
        }

        let mut created = Vec::with_capacity(batch.len());
        for mut record in batch {
            record.set_id(children.len() as u64 + 100);
            children.push(record.clone());
            created.push(record);
        }
        Ok(created)
    }
}

fn unit_key(record: &ChildRecord) -> String {
    match record {
        ChildRecord::Prefix(prefix) => prefix.prefix.to_string(),
        ChildRecord::IpAddress(ip) => ip.addr().to_string(),
        ChildRecord::Asn(asn) => format!("AS{}", asn.asn),
        ChildRecord::Vlan(vlan) => format!("{}/{}", vlan.group, vlan.vid),
    }
}

#[tokio::test]
async fn test_list_available_applies_limits() {
    let service = service(SlowRepository::new(vec![asn_range(1, 1, 100)]));

    assert_eq!(service.available_asns(1, None).await.unwrap().len(), 50);
    assert_eq!(service.available_asns(1, Some(7)).await.unwrap().len(), 7);
    let all = service.available_asns(1, Some(0)).await.unwrap();
    assert_eq!(all.len(), 100);
    assert_eq!(all[0].asn, 1);
    assert_eq!(all[99].asn, 100);
}

#[tokio::test]
async fn test_missing_parent() {
    let service = service(SlowRepository::new(Vec::new()));
    let result = service.available_prefixes(42, None).await;
    assert!(matches!(
        result,
        Err(AllocationError::ParentNotFound { parent }) if parent == ParentRef::prefix(42)
    ));

    let result = service.allocate_asns(42, &[AsnRequest::default()]).await;
    assert_eq!(result.unwrap_err().class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn test_wrong_parent_kind_never_writes() {
    let mut repository = MockRepository::new();
    repository.expect_parent().returning(|_| {
        Ok(Some(ParentSpace::VlanGroup(VlanGroup::new(1, "group".to_string()))))
    });
    repository.expect_read_children().never();
    repository.expect_write_children().never();

    let result = service(repository)
        .allocate_prefixes(1, &[PrefixRequest::new(24)])
        .await;
    assert!(matches!(
        result,
        Err(AllocationError::UnsupportedParent {
            parent: ParentKind::VlanGroup,
            child: ChildKind::Prefix
        })
    ));
}

#[tokio::test]
async fn test_empty_batch_touches_nothing() {
    let mut repository = MockRepository::new();
    repository.expect_parent().never();
    repository.expect_write_children().never();

    let created = service(repository).allocate_vlans(1, &[]).await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn test_capacity_error_skips_write() {
    let mut repository = MockRepository::new();
    repository
        .expect_parent()
        .returning(|_| Ok(Some(asn_range(1, 101, 102))));
    repository
        .expect_read_children()
        .returning(|_, _, _| Ok(vec![ChildRecord::Asn(Asn::new(7, 101, 1))]));
    repository.expect_write_children().never();

    let result = service(repository)
        .allocate_asns(1, &[AsnRequest::default(), AsnRequest::default()])
        .await;
    assert!(matches!(
        result,
        Err(AllocationError::Capacity {
            requested: 2,
            available: 1
        })
    ));
}

#[tokio::test]
async fn test_rejected_write_is_conflict() {
    let mut repository = MockRepository::new();
    repository
        .expect_parent()
        .returning(|_| Ok(Some(asn_range(1, 101, 110))));
    repository
        .expect_read_children()
        .returning(|_, _, _| Ok(Vec::new()));
    repository
        .expect_write_children()
        .times(1)
        .returning(|_, _| {
            Err(RepositoryError::Constraint {
                message: "AS101 already exists".to_string(),
            })
        });

    let result = service(repository)
        .allocate_asns(1, &[AsnRequest::default()])
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(err.to_string().contains("AS101 already exists"));
}

#[tokio::test]
async fn test_write_receives_drafts_in_request_order() {
    let mut repository = MockRepository::new();
    repository
        .expect_parent()
        .returning(|_| Ok(Some(ParentSpace::Prefix(Prefix::new(1, "10.0.0.0/24".parse().unwrap())))));
    repository
        .expect_read_children()
        .withf(|_, kind, scope| *kind == ChildKind::Prefix && *scope == Scope::Vrf(None))
        .returning(|_, _, _| Ok(Vec::new()));
    repository
        .expect_write_children()
        .withf(|parent, batch| {
            *parent == ParentRef::prefix(1)
                && batch.len() == 2
                && batch.iter().all(|record| record.id() == UNASSIGNED_ID)
        })
        .returning(|_, batch| {
            Ok(batch
                .into_iter()
                .enumerate()
                .map(|(i, mut record)| {
                    record.set_id(i as u64 + 10);
                    record
                })
                .collect())
        });

    let created = service(repository)
        .allocate_prefixes(1, &[PrefixRequest::new(26), PrefixRequest::new(25)])
        .await
        .unwrap();
    assert_eq!(created[0].id, 10);
    assert_eq!(created[0].prefix.to_string(), "10.0.0.0/26");
    assert_eq!(created[1].id, 11);
    assert_eq!(created[1].prefix.to_string(), "10.0.0.128/25");
}

#[tokio::test]
async fn test_busy_parent_times_out() {
    let mut repository = MockRepository::new();
    repository.expect_parent().never();
    repository.expect_write_children().never();

    let config = AllocatorConfig {
        guard_timeout_ms: 50,
        ..AllocatorConfig::default()
    };
    let service = AllocationService::new(Arc::new(repository), config);
    let _lease = service
        .guard()
        .acquire(ParentRef::asn_range(1), Duration::from_secs(5))
        .await
        .unwrap();

    let result = service.allocate_asns(1, &[AsnRequest::default()]).await;
    assert!(matches!(result, Err(AllocationError::Conflict { .. })));
}

#[tokio::test]
async fn test_cancelled_allocation_releases_parent() {
    let repository = Arc::new(SlowRepository::new(vec![asn_range(1, 101, 110)]).stalling());
    let service = AllocationService::new(repository.clone(), AllocatorConfig::default());
    let parent = ParentRef::asn_range(1);
    let requests = vec![AsnRequest::default(); 3];

    // Dropping the pending future mid-write is what a client disconnect does
    tokio::select! {
        result = service.allocate_asns(1, &requests) => panic!("write should stall, got {:?}", result),
        _ = repository.write_started.notified() => {}
    }

    assert_eq!(service.guard().state(&parent), GuardState::Idle);
    assert_eq!(service.guard().tracked(), 0);
    assert!(repository.children.lock().await.is_empty());
    assert_eq!(service.available_asns(1, Some(0)).await.unwrap().len(), 10);

    let created = service.allocate_asns(1, &requests).await.unwrap();
    let asns: Vec<u32> = created.iter().map(|asn| asn.asn).collect();
    assert_eq!(asns, vec![101, 102, 103]);
    assert_eq!(service.guard().tracked(), 0);
}

#[tokio::test]
async fn test_concurrent_batches_never_share_units() {
    let service = service(SlowRepository::new(vec![asn_range(1, 1, 100)]));
    let requests = vec![AsnRequest::default(); 10];

    let results = join_all((0..10).map(|_| service.allocate_asns(1, &requests))).await;

    let mut seen = HashSet::new();
    for result in results {
        for asn in result.unwrap() {
            assert!(seen.insert(asn.asn), "AS{} handed out twice", asn.asn);
        }
    }
    assert_eq!(seen.len(), 100);
    assert!(service.available_asns(1, Some(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversubscribed_batches_fail_whole() {
    let service = service(SlowRepository::new(vec![asn_range(1, 1, 100)]));
    let large = vec![AsnRequest::default(); 60];
    let small = vec![AsnRequest::default(); 50];

    let results = join_all(vec![service.allocate_asns(1, &large), service.allocate_asns(1, &small)]).await;

    let succeeded: Vec<usize> = results
        .iter()
        .filter_map(|result| result.as_ref().ok().map(Vec::len))
        .collect();
    let failed = results
        .iter()
        .filter(|result| matches!(result, Err(AllocationError::Capacity { .. })))
        .count();
    assert_eq!(succeeded.len(), 1);
    assert_eq!(failed, 1);

    let remaining = service.available_asns(1, Some(0)).await.unwrap().len();
    assert_eq!(remaining, 100 - succeeded[0]);
}

#[tokio::test]
async fn test_parents_do_not_block_each_other() {
    let service = service(SlowRepository::new(vec![
        ParentSpace::VlanGroup(VlanGroup::new(1, "a".to_string())),
        ParentSpace::VlanGroup(VlanGroup::new(2, "b".to_string())),
    ]));
    let requests = vec![VlanRequest::new("v"); 3];

    let results = join_all(vec![
        service.allocate_vlans(1, &requests),
        service.allocate_vlans(2, &requests),
    ])
    .await;

    for result in results {
        let vids: Vec<u16> = result.unwrap().into_iter().map(|vlan| vlan.vid).collect();
        assert_eq!(vids, vec![1, 2, 3]);
    }
    assert_eq!(service.guard().tracked(), 0);
}
