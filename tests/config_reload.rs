//! External edits to the persisted config file are picked up by the watcher.

use std::time::Duration;

use relay_control::lifecycle::{self, Shutdown};
use relay_control::pool::PoolPhase;
use relay_control::FeatureFlag;

mod common;
use common::{eventually, test_settings};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_edit_reloads_flags_and_pool() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings(&dir);
    settings.store.watch = true;

    let shutdown = Shutdown::new();
    let started = lifecycle::start(&settings, &shutdown).await.unwrap();
    let svc = started.service.clone();
    assert!(eventually(Duration::from_secs(2), || svc.pool().phase() == PoolPhase::Enabled).await);
    assert_eq!(svc.pool().live_proxies().len(), 2);

    // Our own write must not bounce back as a restart.
    svc.set_feature_flag(FeatureFlag::DirectAccess, false).await.unwrap();
    let generation = svc.pool().status().generation;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(svc.pool().status().generation, generation);

    tokio::fs::write(
        &settings.store.path,
        r#"{
            "public_servers": {"goagent_enabled": false, "ss_enabled": true},
            "tcp_scrambler_enabled": false,
            "dns_bypass_hosts": "intranet.example"
        }"#,
    )
    .await
    .unwrap();

    assert!(eventually(Duration::from_secs(10), || !svc.flags().is_enabled(FeatureFlag::TcpScrambler)).await);
    assert!(svc.flags().is_enabled(FeatureFlag::DirectAccess));
    assert_eq!(svc.flags().dns_bypass_hosts().len(), 1);
    assert!(
        eventually(Duration::from_secs(5), || {
            let live = svc.pool().live_proxies();
            live.len() == 1 && live[0].public_name == "Public Shadowsocks"
        })
        .await
    );

    shutdown.trigger();
    for task in started.tasks {
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
