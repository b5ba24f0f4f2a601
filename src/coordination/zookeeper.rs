//! ZooKeeper backend built on `zookeeper-client`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use zookeeper_client as zk;

use super::{Acl, Coordinator, Session};
use crate::errors::CoordinationError;

/// Connects to a ZooKeeper ensemble.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZooKeeperCoordinator;

#[async_trait]
impl Coordinator for ZooKeeperCoordinator {
    async fn connect(
        &self,
        endpoints: &[String],
        timeout: Duration,
    ) -> Result<Arc<dyn Session>, CoordinationError> {
        let cluster = endpoints.join(",");
        tracing::debug!(cluster = %cluster, timeout_ms = timeout.as_millis() as u64, "connecting to zookeeper");

        let client = match tokio::time::timeout(timeout, zk::Client::connect(&cluster)).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(CoordinationError::Backend(Box::new(e))),
            Err(_) => return Err(CoordinationError::ConnectTimeout { timeout }),
        };

        Ok(Arc::new(ZooKeeperSession {
            client: Mutex::new(Some(client)),
        }))
    }
}

/// A session holding one `zk::Client`. Closing drops the client, which ends
/// the ZooKeeper session and with it every ephemeral node it created.
pub struct ZooKeeperSession {
    client: Mutex<Option<zk::Client>>,
}

#[async_trait]
impl Session for ZooKeeperSession {
    async fn create_ephemeral(
        &self,
        path: &str,
        content: &[u8],
        acl: Acl,
    ) -> Result<(), CoordinationError> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(CoordinationError::SessionClosed)?;

        let acls = match acl {
            Acl::Open => zk::Acls::anyone_all(),
        };
        let options = zk::CreateMode::Ephemeral.with_acls(acls);

        match client.create(path, content, &options).await {
            Ok(_) => Ok(()),
            Err(zk::Error::NodeExists) => Err(CoordinationError::NodeExists {
                path: path.to_string(),
            }),
            Err(e) => Err(CoordinationError::Backend(Box::new(e))),
        }
    }

    async fn close(&self) {
        self.client.lock().await.take();
    }
}
