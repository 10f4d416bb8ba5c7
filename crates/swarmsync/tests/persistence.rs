//! Nodes backed by SQLite and configured from TOML files.

use std::sync::Arc;
use std::time::Duration;

use swarmsync::pushsync::MemoryNetwork;
use swarmsync::{Address, Node, NodeConfig, SyncState};
use swarmsync_testkit::fixtures::{address, fast_config, test_chunk};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

fn sqlite_config(base: Address, dir: &TempDir) -> NodeConfig {
    NodeConfig {
        overlay: base.to_hex(),
        data_dir: Some(dir.path().join("node")),
        pushsync: fast_config(),
    }
}

async fn wait_for_state(node: &Node, address: &Address, want: SyncState) {
    tokio::time::timeout(WAIT, async {
        loop {
            if node.sync_state(address).await.unwrap() == Some(want) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{address} never reached {want:?}"));
}

#[tokio::test]
async fn test_sqlite_node_creates_database() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(address(0x00), &dir);

    let node = Node::new(&config, MemoryNetwork::new()).unwrap();
    node.upload(&test_chunk()).await.unwrap();

    assert!(config.db_path().unwrap().exists());
    node.close().await;
}

#[tokio::test]
async fn test_pending_uploads_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(address(0x00), &dir);
    let chunk = test_chunk();

    {
        // no peers and no worker: the upload just waits
        let node = Node::new(&config, MemoryNetwork::new()).unwrap();
        node.upload(&chunk).await.unwrap();
        node.close().await;
    }

    let network = MemoryNetwork::new();
    let node = Node::new(&config, Arc::clone(&network)).unwrap();
    assert_eq!(node.pending_count().await.unwrap(), 1);
    assert_eq!(
        node.sync_state(chunk.address()).await.unwrap(),
        Some(SyncState::Pending)
    );

    let closest = Node::new(&NodeConfig::for_overlay(&address(0x60)), Arc::clone(&network)).unwrap();
    closest.connect(address(0x00));
    node.connect(address(0x60));
    node.start();

    wait_for_state(&node, chunk.address(), SyncState::Synced).await;
    assert_eq!(node.pending_count().await.unwrap(), 0);
    assert_eq!(closest.get(chunk.address()).await.unwrap(), Some(chunk));

    node.close().await;
    closest.close().await;
}

#[tokio::test]
async fn test_sqlite_node_receives_and_settles() {
    let dir = TempDir::new().unwrap();
    let network = MemoryNetwork::new();

    let uploader = Node::new(
        &NodeConfig {
            pushsync: fast_config(),
            ..NodeConfig::for_overlay(&address(0x00))
        },
        Arc::clone(&network),
    )
    .unwrap();
    let closest = Node::new(&sqlite_config(address(0x60), &dir), Arc::clone(&network)).unwrap();
    uploader.connect(address(0x60));
    closest.connect(address(0x00));

    let chunk = test_chunk();
    uploader.upload_and_push(&chunk).await.unwrap();

    wait_for_state(&closest, chunk.address(), SyncState::Synced).await;
    // received chunks never enter the push index
    assert_eq!(closest.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_node_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swarmsync.toml");
    let data_dir = dir.path().join("data");
    std::fs::write(
        &path,
        format!(
            r#"
overlay = "{}"
data_dir = "{}"

[pushsync]
retry_interval_ms = 100
max_retries = 1
"#,
            address(0x40).to_hex(),
            data_dir.display()
        ),
    )
    .unwrap();

    let config = NodeConfig::load(&path).unwrap();
    assert_eq!(config.overlay_address().unwrap(), address(0x40));
    assert_eq!(config.pushsync.retry_interval, Duration::from_millis(100));
    assert_eq!(config.pushsync.max_retries, 1);

    let node = Node::new(&config, MemoryNetwork::new()).unwrap();
    assert_eq!(node.base(), &address(0x40));
    assert_eq!(node.pushsync().config().max_retries, 1);
    assert!(data_dir.join("chunks.db").exists());
    node.close().await;
}

#[test]
fn test_malformed_config_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "overlay = [").unwrap();

    let err = NodeConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.toml"));
}
