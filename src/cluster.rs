//! Cluster dispatcher (§4.8): fans a search request out to peer nodes over
//! UDP and reconciles their replies with the local result. Peers are
//! trusted collaborators reachable by address; there is no discovery or
//! authentication (§1 Non-goals).
//!
//! Wire format is one JSON object per UDP datagram (§6), small enough to
//! fit comfortably under the 1500-byte datagram ceiling the spec calls out.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default port a cluster peer listens on for search requests.
pub const DEFAULT_CLUSTER_PORT: u16 = 5823;

/// A search request fanned out to one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub position: String,
    pub think_time: u64,
    pub depth: i32,
    pub idx: usize,
}

/// A peer's reply to a [`ClusterRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReply {
    pub position: String,
    #[serde(rename = "move")]
    pub mv: String,
    pub depth: u32,
    pub score: i32,
}

/// Fraction of the caller's think-time budget handed to each peer, to leave
/// slack for transport and reply-collection overhead (§4.8).
const PEER_TIME_SCALE: f64 = 0.9;

/// Parse a comma-separated `host[:port]` peer list (the `-n` CLI flag),
/// defaulting bare hosts to [`DEFAULT_CLUSTER_PORT`].
#[must_use]
pub fn parse_peer_list(spec: &str) -> Vec<SocketAddr> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|host| {
            let with_port = if host.contains(':') {
                host.to_string()
            } else {
                format!("{host}:{DEFAULT_CLUSTER_PORT}")
            };
            with_port.to_socket_addrs().ok()?.next()
        })
        .collect()
}

/// Fan a request out to every peer and collect up to `peers.len()` replies.
///
/// Each peer gets its own request tagged with its ordinal `idx` (§4.5's
/// root-move-skip slice); replies whose `position` doesn't match the
/// current FEN are discarded (stale reply from a position the peer was
/// still working on). A peer that never replies, or replies late, simply
/// doesn't contribute — the local result always counts (§4.8: "missing
/// replies are not fatal").
#[must_use]
pub fn dispatch(
    peers: &[SocketAddr],
    position_fen: &str,
    think_time_ms: u64,
    depth: Option<u32>,
) -> Vec<ClusterReply> {
    if peers.is_empty() {
        return Vec::new();
    }

    let Ok(socket) = UdpSocket::bind("0.0.0.0:0") else {
        log::warn!("cluster dispatch: failed to bind UDP socket");
        return Vec::new();
    };

    let scaled_time = (think_time_ms as f64 * PEER_TIME_SCALE) as u64;
    for (idx, peer) in peers.iter().enumerate() {
        let request = ClusterRequest {
            position: position_fen.to_string(),
            think_time: scaled_time,
            depth: depth.map_or(-1, |d| d as i32),
            idx: idx + 1,
        };
        match serde_json::to_vec(&request) {
            Ok(bytes) => {
                if let Err(e) = socket.send_to(&bytes, peer) {
                    log::warn!("cluster dispatch: send to {peer} failed: {e}");
                }
            }
            Err(e) => log::warn!("cluster dispatch: failed to encode request: {e}"),
        }
    }

    // §9's open question: a dropped reply must not wedge the wait. Each
    // recv is individually timeboxed rather than waiting on one deadline
    // for the whole batch, so one silent peer can't stall the others.
    let per_peer_timeout = Duration::from_millis(scaled_time.max(50)).min(Duration::from_secs(5));
    let mut replies = Vec::with_capacity(peers.len());
    let mut buf = [0u8; 1500];

    for _ in 0..peers.len() {
        if socket.set_read_timeout(Some(per_peer_timeout)).is_err() {
            break;
        }
        match socket.recv(&mut buf) {
            Ok(n) => match serde_json::from_slice::<ClusterReply>(&buf[..n]) {
                Ok(reply) if reply.position == position_fen => replies.push(reply),
                Ok(_) => {}
                Err(e) => log::debug!("cluster dispatch: dropping malformed reply: {e}"),
            },
            Err(e) => {
                log::debug!("cluster dispatch: recv timed out or failed: {e}");
                break;
            }
        }
    }

    replies
}

/// Local candidate to merge against cluster replies.
#[derive(Debug, Clone, Copy)]
pub struct LocalCandidate {
    pub depth: u32,
    pub score: i32,
}

/// §4.8 selection rule: maximum depth, ties broken by maximum score. The
/// local result always participates and wins ties against a peer at the
/// same depth and score (it's already the chosen move).
#[must_use]
pub fn select_best<'a>(
    local: &'a str,
    local_candidate: LocalCandidate,
    replies: &'a [ClusterReply],
) -> &'a str {
    let mut best_mv = local;
    let mut best_depth = local_candidate.depth;
    let mut best_score = local_candidate.score;

    for reply in replies {
        if reply.depth > best_depth || (reply.depth == best_depth && reply.score > best_score) {
            best_mv = &reply.mv;
            best_depth = reply.depth;
            best_score = reply.score;
        }
    }

    best_mv
}

/// Run this node as a cluster peer: listen for [`ClusterRequest`]s and hand
/// each one to `search_fn`, which runs a local search and returns the
/// best move in long-algebraic form plus the depth and score reached.
/// Blocks forever; intended to be the entire body of the `-N` CLI mode.
pub fn serve<F>(port: u16, mut search_fn: F) -> std::io::Result<()>
where
    F: FnMut(&str, u64, i32, usize) -> Option<(String, u32, i32)>,
{
    let socket = UdpSocket::bind(("0.0.0.0", port))?;
    log::info!("cluster peer listening on port {port}");
    let mut buf = [0u8; 1500];

    loop {
        let (n, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("cluster peer: recv_from failed: {e}");
                continue;
            }
        };

        let request: ClusterRequest = match serde_json::from_slice(&buf[..n]) {
            Ok(req) => req,
            Err(e) => {
                log::debug!("cluster peer: dropping malformed request from {src}: {e}");
                continue;
            }
        };

        if let Some((mv, depth, score)) =
            search_fn(&request.position, request.think_time, request.depth, request.idx)
        {
            let reply = ClusterReply {
                position: request.position,
                mv,
                depth,
                score,
            };
            if let Ok(bytes) = serde_json::to_vec(&reply) {
                if let Err(e) = socket.send_to(&bytes, src) {
                    log::warn!("cluster peer: reply send to {src} failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_host_with_default_port() {
        let peers = parse_peer_list("127.0.0.1");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].port(), DEFAULT_CLUSTER_PORT);
    }

    #[test]
    fn parses_explicit_port_and_multiple_hosts() {
        let peers = parse_peer_list("127.0.0.1:6000, 127.0.0.1:6001");
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].port(), 6000);
        assert_eq!(peers[1].port(), 6001);
    }

    #[test]
    fn empty_spec_yields_no_peers() {
        assert!(parse_peer_list("").is_empty());
    }

    #[test]
    fn select_best_picks_deepest_reply_on_tiebreak() {
        // §8 scenario 6: (depth 10, score 20) vs (depth 11, score 10) -> depth 11 wins.
        let replies = vec![
            ClusterReply { position: "pos".into(), mv: "e2e4".into(), depth: 10, score: 20 },
            ClusterReply { position: "pos".into(), mv: "d2d4".into(), depth: 11, score: 10 },
        ];
        let local = "g1f3".to_string();
        let best = select_best(&local, LocalCandidate { depth: 9, score: 0 }, &replies);
        assert_eq!(best, "d2d4");
    }

    #[test]
    fn select_best_keeps_local_when_no_replies_beat_it() {
        let local = "g1f3".to_string();
        let best = select_best(&local, LocalCandidate { depth: 20, score: 50 }, &[]);
        assert_eq!(best, "g1f3");
    }

    #[test]
    fn select_best_breaks_ties_on_score() {
        let replies = vec![ClusterReply {
            position: "pos".into(),
            mv: "e2e4".into(),
            depth: 10,
            score: 100,
        }];
        let local = "g1f3".to_string();
        let best = select_best(&local, LocalCandidate { depth: 10, score: 50 }, &replies);
        assert_eq!(best, "e2e4");
    }
}
