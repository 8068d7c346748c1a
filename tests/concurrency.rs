use passwd_exop::directory::{
    BackendError, CommittedChange, Dn, ModifyRequest, Partition, PartitionResolver,
    ReplicationLog, Session, PASSWORD_ATTRIBUTE,
};
use passwd_exop::exop::{ExopConfig, ExtendedRequest, Outcome, PasswdExop};
use passwd_exop::password::{
    HashError, PasswordScheme, PasswordSchemes, SchemeContext, TaggedCredential,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Entries keyed by normalized DN, holding the current password values.
struct MemoryDirectory {
    suffix: Dn,
    entries: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemoryDirectory {
    fn new() -> Self {
        Self {
            suffix: Dn::parse("dc=example,dc=com").unwrap(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn password(&self, dn: &str) -> Vec<TaggedCredential> {
        self.entries
            .lock()
            .unwrap()
            .get(dn)
            .into_iter()
            .flatten()
            .cloned()
            .map(TaggedCredential::from_stored)
            .collect()
    }
}

impl Partition for MemoryDirectory {
    fn suffix(&self) -> &Dn {
        &self.suffix
    }

    fn supports_modify(&self) -> bool {
        true
    }

    fn is_read_only_replica(&self) -> bool {
        false
    }

    fn upstream_providers(&self) -> Vec<String> {
        Vec::new()
    }

    fn update_referrals(&self) -> Vec<String> {
        Vec::new()
    }

    fn modify(&self, request: &ModifyRequest) -> Result<(), BackendError> {
        let values = request
            .modifications
            .iter()
            .find(|m| m.attribute == PASSWORD_ATTRIBUTE)
            .map(|m| m.values.clone())
            .ok_or_else(|| BackendError::new(80, "no password in modify"))?;
        self.entries
            .lock()
            .unwrap()
            .insert(request.target.normalized().to_string(), values);
        Ok(())
    }
}

struct Resolver(Arc<MemoryDirectory>);

impl PartitionResolver for Resolver {
    fn select_partition(&self, dn: &Dn) -> Option<Arc<dyn Partition>> {
        dn.is_within(&self.0.suffix)
            .then(|| Arc::clone(&self.0) as Arc<dyn Partition>)
    }
}

struct User {
    dn: Dn,
    directory: Arc<MemoryDirectory>,
}

impl Session for User {
    fn authenticated_identity(&self) -> Dn {
        self.dn.clone()
    }

    fn authz_partition(&self) -> Option<Arc<dyn Partition>> {
        Some(Arc::clone(&self.directory) as Arc<dyn Partition>)
    }
}

#[derive(Default)]
struct CountingLog(AtomicUsize);

impl ReplicationLog for CountingLog {
    fn enqueue(&self, _change: CommittedChange) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deterministic scheme that records how many calls overlap.
struct Tracked {
    name: &'static str,
    exclusive: bool,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Tracked {
    fn new(name: &'static str, exclusive: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            exclusive,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

struct Shared(Arc<Tracked>);

impl PasswordScheme for Shared {
    fn name(&self) -> &'static str {
        self.0.name
    }

    fn hash(&self, plaintext: &[u8], _ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
        let now = self.0.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(5));
        self.0.active.fetch_sub(1, Ordering::SeqCst);
        Ok(plaintext.iter().rev().copied().collect())
    }

    fn exclusive(&self) -> bool {
        self.0.exclusive
    }
}

fn engine(
    directory: &Arc<MemoryDirectory>,
    schemes: PasswordSchemes,
) -> (PasswdExop, Arc<CountingLog>) {
    let log = Arc::new(CountingLog::default());
    let exop = PasswdExop::new(
        ExopConfig::new(),
        Arc::new(schemes),
        Arc::new(Resolver(Arc::clone(directory))),
    )
    .with_replication_log(Arc::clone(&log) as Arc<dyn ReplicationLog>);
    (exop, log)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_changes_for_distinct_users() {
    let directory = Arc::new(MemoryDirectory::new());
    let schemes = PasswordSchemes::with_builtin(Some("{SSHA256}")).unwrap();
    let (exop, log) = engine(&directory, schemes);

    let mut tasks = Vec::new();
    for n in 0..32 {
        let exop = exop.clone();
        let directory = Arc::clone(&directory);
        tasks.push(tokio::task::spawn_blocking(move || {
            let user = User {
                dn: Dn::parse(&format!("uid=user{n},dc=example,dc=com")).unwrap(),
                directory,
            };
            let outcome = exop
                .handle(&user, ExtendedRequest::password_modify(None))
                .unwrap();
            let Outcome::Success(Some(response)) = outcome else {
                panic!("expected a generated password");
            };
            let generated =
                passwd_exop::exop::codec::decode_response(response.as_bytes())
                    .unwrap()
                    .unwrap();
            (n, generated.to_vec())
        }));
    }

    for task in tasks {
        let (n, generated) = task.await.unwrap();
        let stored = directory.password(&format!("uid=user{n},dc=example,dc=com"));
        assert_eq!(stored.len(), 1);
        assert!(exop.schemes().verify(&stored, &generated, &SchemeContext::default()));
    }

    assert_eq!(log.0.load(Ordering::SeqCst), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exclusive_scheme_never_overlaps() {
    let tracked = Tracked::new("{SERIAL}", true);
    let schemes = PasswordSchemes::builder()
        .register(Shared(Arc::clone(&tracked)))
        .default_scheme("{SERIAL}")
        .build()
        .unwrap();
    let directory = Arc::new(MemoryDirectory::new());
    let (exop, _log) = engine(&directory, schemes);

    let mut tasks = Vec::new();
    for n in 0..16 {
        let exop = exop.clone();
        let directory = Arc::clone(&directory);
        tasks.push(tokio::task::spawn_blocking(move || {
            let user = User {
                dn: Dn::parse(&format!("uid=user{n},dc=example,dc=com")).unwrap(),
                directory,
            };
            if n % 2 == 0 {
                exop.handle(&user, ExtendedRequest::password_modify(None))
                    .unwrap();
            } else {
                let stored = [TaggedCredential::new("{SERIAL}", b"terces")];
                assert!(exop.verify_credentials(&user, &stored, b"secret"));
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(tracked.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_scheme_runs_in_parallel() {
    let tracked = Tracked::new("{PARALLEL}", false);
    let schemes = PasswordSchemes::builder()
        .register(Shared(Arc::clone(&tracked)))
        .default_scheme("{PARALLEL}")
        .build()
        .unwrap();
    let schemes = Arc::new(schemes);

    // both threads keep hashing until their calls have overlapped once
    let barrier = Arc::new(std::sync::Barrier::new(2));
    let mut tasks = Vec::new();
    for _ in 0..2 {
        let schemes = Arc::clone(&schemes);
        let barrier = Arc::clone(&barrier);
        let tracked = Arc::clone(&tracked);
        tasks.push(tokio::task::spawn_blocking(move || {
            barrier.wait();
            for _ in 0..200 {
                if tracked.peak.load(Ordering::SeqCst) >= 2 {
                    break;
                }
                schemes
                    .hash(b"secret", None, &SchemeContext::default())
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(tracked.peak.load(Ordering::SeqCst) >= 2);
}
