use std::net::SocketAddr;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::registry::ConnectionId;

/// What the admission predicate gets to look at: the provisional connection
/// identity and the peer address of the freshly accepted stream.
#[derive(Debug, Clone, Copy)]
pub struct PeerInfo {
    pub id: ConnectionId,
    pub addr: SocketAddr,
}

/// The admission contract: one future per pending connection, resolving to
/// the decision. A synchronous predicate is simply one whose future resolves
/// immediately. Anything other than a clean `true` rejects.
pub type AdmissionPredicate =
    Arc<dyn Fn(PeerInfo) -> BoxFuture<'static, bool> + Send + Sync>;

/// Terminal outcome of the gate for one pending connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted,
    Rejected,
}

/// Wrap a plain async function or closure into an [`AdmissionPredicate`].
pub fn from_fn<F, Fut>(f: F) -> AdmissionPredicate
where
    F: Fn(PeerInfo) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = bool> + Send + 'static,
{
    Arc::new(move |peer| Box::pin(f(peer)))
}

/// Evaluate the gate for one pending connection.
///
/// The predicate runs on its own task: a suspended predicate never blocks
/// other admissions, and a panic inside it maps to `Rejected` rather than
/// unwinding into the accept path. No predicate configured means
/// unconditional allow.
pub async fn evaluate(predicate: Option<&AdmissionPredicate>, peer: PeerInfo) -> AdmissionDecision {
    let Some(predicate) = predicate else {
        return AdmissionDecision::Admitted;
    };
    let predicate = Arc::clone(predicate);
    let outcome = tokio::spawn(async move { predicate(peer).await }).await;
    match outcome {
        Ok(true) => AdmissionDecision::Admitted,
        Ok(false) => AdmissionDecision::Rejected,
        Err(_) => AdmissionDecision::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn peer() -> PeerInfo {
        PeerInfo {
            id: ConnectionId::new(1),
            addr: "127.0.0.1:9".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn no_predicate_admits() {
        assert_eq!(evaluate(None, peer()).await, AdmissionDecision::Admitted);
    }

    #[tokio::test]
    async fn true_admits_false_rejects() {
        let allow = from_fn(|_| async { true });
        let deny = from_fn(|_| async { false });
        assert_eq!(evaluate(Some(&allow), peer()).await, AdmissionDecision::Admitted);
        assert_eq!(evaluate(Some(&deny), peer()).await, AdmissionDecision::Rejected);
    }

    #[tokio::test]
    async fn deferred_result_is_awaited() {
        let slow_allow = from_fn(|_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            true
        });
        assert_eq!(evaluate(Some(&slow_allow), peer()).await, AdmissionDecision::Admitted);
    }

    #[tokio::test]
    async fn panicking_predicate_rejects() {
        let broken = from_fn(|_| async { panic!("predicate blew up") });
        assert_eq!(evaluate(Some(&broken), peer()).await, AdmissionDecision::Rejected);
    }
}
