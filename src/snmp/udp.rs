// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! SNMPv2c agent access over UDP

use super::ber::{Message, Oid, PduType, SnmpValue, ERROR_NO_SUCH_NAME};
use super::{SnmpAgent, SnmpConfig};
use crate::error::{CollectorError, Result};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::net::UdpSocket;

/// Largest datagram we accept
const MAX_DATAGRAM: usize = 65_507;

/// SNMPv2c GET over UDP
///
/// A socket is opened per request and closed when the request completes or
/// its future is dropped.
#[derive(Debug)]
pub struct UdpAgent {
    community: String,
    port: u16,
    next_request_id: AtomicI32,
}

impl UdpAgent {
    /// Agent access with a community string and port
    pub fn new(community: impl Into<String>, port: u16) -> Self {
        Self {
            community: community.into(),
            port,
            next_request_id: AtomicI32::new(1),
        }
    }

    /// Agent access using the community and port of `config`
    pub fn from_config(config: &SnmpConfig) -> Self {
        Self::new(config.community.clone(), config.port)
    }

    fn request_id(&self) -> i32 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed) & i32::MAX
    }
}

#[async_trait]
impl SnmpAgent for UdpAgent {
    async fn get(&self, target: &str, oids: &[Oid]) -> Result<Vec<(Oid, SnmpValue)>> {
        let addr = tokio::net::lookup_host((target, self.port))
            .await
            .map_err(|e| CollectorError::unreachable(format!("resolve {}: {}", target, e)))?
            .next()
            .ok_or_else(|| CollectorError::unreachable(format!("no address for {}", target)))?;

        let local = match addr.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| CollectorError::unreachable(format!("bind: {}", e)))?;
        socket
            .connect(addr)
            .await
            .map_err(|e| CollectorError::unreachable(format!("connect {}: {}", addr, e)))?;

        let request_id = self.request_id();
        let request = Message::get_request(&self.community, request_id, oids).encode();
        socket
            .send(&request)
            .await
            .map_err(|e| CollectorError::unreachable(format!("send to {}: {}", addr, e)))?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let n = socket
                .recv(&mut buf)
                .await
                .map_err(|e| CollectorError::unreachable(format!("recv from {}: {}", addr, e)))?;
            let response = Message::decode(&buf[..n])?;

            // Late answer to an earlier, timed-out request
            if response.pdu.request_id != request_id {
                continue;
            }
            if response.pdu.pdu_type != PduType::Response {
                return Err(CollectorError::malformed(format!(
                    "unexpected PDU {:?}",
                    response.pdu.pdu_type
                )));
            }

            return match response.pdu.error_status {
                0 => Ok(response.pdu.varbinds),
                ERROR_NO_SUCH_NAME => {
                    let index = response
                        .pdu
                        .error_index
                        .checked_sub(1)
                        .and_then(|i| usize::try_from(i).ok());
                    let oid = index
                        .and_then(|i| oids.get(i))
                        .map(Oid::to_string)
                        .unwrap_or_default();
                    Err(CollectorError::UnsupportedOid { oid })
                }
                status => Err(CollectorError::no_data(format!(
                    "agent returned error-status {} (index {})",
                    status, response.pdu.error_index
                ))),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::{if_speed_oid, sys_up_time_oid};

    /// Spawn a one-shot agent that answers the first request with `reply`
    async fn spawn_agent<F>(reply: F) -> u16
    where
        F: FnOnce(Message) -> Message + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            let (n, peer) = socket.recv_from(&mut buf).await.unwrap();
            let request = Message::decode(&buf[..n]).unwrap();
            let response = reply(request);
            socket.send_to(&response.encode(), peer).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn test_get_over_udp() {
        let port = spawn_agent(|request| {
            assert_eq!(request.community, b"s3cret");
            assert_eq!(request.pdu.pdu_type, PduType::GetRequest);
            let varbinds = request
                .pdu
                .varbinds
                .into_iter()
                .map(|(oid, _)| (oid, SnmpValue::TimeTicks(99)))
                .collect();
            Message::response(&request.community, request.pdu.request_id, varbinds)
        })
        .await;

        let agent = UdpAgent::new("s3cret", port);
        let varbinds = agent
            .get("127.0.0.1", &[sys_up_time_oid()])
            .await
            .unwrap();

        assert_eq!(varbinds, vec![(sys_up_time_oid(), SnmpValue::TimeTicks(99))]);
    }

    #[tokio::test]
    async fn test_no_such_name_status() {
        let port = spawn_agent(|request| {
            let mut response = Message::response(
                &request.community,
                request.pdu.request_id,
                request.pdu.varbinds.clone(),
            );
            response.pdu.error_status = ERROR_NO_SUCH_NAME;
            response.pdu.error_index = 2;
            response
        })
        .await;

        let agent = UdpAgent::new("public", port);
        let err = agent
            .get("127.0.0.1", &[sys_up_time_oid(), if_speed_oid(7)])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CollectorError::UnsupportedOid {
                oid: "1.3.6.1.2.1.2.2.1.5.7".into()
            }
        );
    }

    #[tokio::test]
    async fn test_no_such_name_with_bogus_index() {
        for bogus in [i64::MIN, 0, -5, 3, i64::MAX] {
            let port = spawn_agent(move |request| {
                let mut response = Message::response(
                    &request.community,
                    request.pdu.request_id,
                    request.pdu.varbinds.clone(),
                );
                response.pdu.error_status = ERROR_NO_SUCH_NAME;
                response.pdu.error_index = bogus;
                response
            })
            .await;

            let agent = UdpAgent::new("public", port);
            let err = agent
                .get("127.0.0.1", &[sys_up_time_oid(), if_speed_oid(7)])
                .await
                .unwrap_err();

            assert_eq!(err, CollectorError::UnsupportedOid { oid: String::new() });
        }
    }

    #[test]
    fn test_request_ids_stay_positive() {
        let agent = UdpAgent::new("public", 161);
        agent.next_request_id.store(i32::MAX, Ordering::Relaxed);
        assert_eq!(agent.request_id(), i32::MAX);
        assert!(agent.request_id() >= 0);
    }
}
