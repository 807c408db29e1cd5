//! The `SocksClient` state machine (spec §4.9): owns the transport, the
//! receive buffer, and the current state; drives a handshake to
//! `Established`, `BoundWaitingForConnection`, or an error.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::clients::socks4;
use crate::clients::socks5::{auth, method, reply, request};
use crate::clients::socks5::method::SelectedMethod;
use crate::error::SocksError;
use crate::general::ReceiveBuffer;
use crate::proxy::{Command, SocksClientOptions, SocksRemoteHost, SocksVersion};
use crate::Transport;

/// Protocol states a `SocksClient` passes through. Modeled as a closed
/// sum type per the design note: there is no variant that can represent
/// "errored and also still making progress" — a failed handshake
/// surfaces as `Err(SocksError)` from `connect()`/`wait_for_connection()`
/// instead of a state, so once those calls return an error the
/// `SocksClient` value itself is gone (moved into the failed call) and
/// no further transition can be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksClientState {
    Created,
    Connected,
    SentInitialHandshake,
    SentAuthentication,
    SentFinalHandshake,
    BoundWaitingForConnection,
    Established,
}

/// The byte-stream tunnel returned on successful completion.
///
/// `remote_host` is populated for ASSOCIATE and for a BIND's second
/// response; it is `None` for a plain CONNECT.
pub struct EstablishedConnection<S> {
    /// The now-transparent stream, still owned by the caller from here
    /// on; the handshake's control framing is complete.
    pub stream: S,
    /// Bytes already read from the transport past the last handshake
    /// response. Per the design note on buffered handoff, callers must
    /// treat these as the first bytes of their own read, rather than
    /// this crate replaying them through some emitted read event.
    pub buffered: Vec<u8>,
    pub remote_host: Option<SocksRemoteHost>,
}

/// A BIND's first stage: the proxy is listening and reported
/// `remote_host` as the address it's listening on (with `0.0.0.0`
/// substituted per spec). Call `wait_for_connection` to continue
/// driving the same handshake to its second response.
pub struct BoundConnection<S> {
    pub remote_host: SocksRemoteHost,
    client: SocksClient<S>,
}

impl<S: Transport> BoundConnection<S> {
    /// Waits for the proxy's second response (the inbound peer having
    /// connected) and resolves to the established tunnel. No additional
    /// timeout is applied here: per spec §5, the coarse timer is
    /// disarmed once `BoundWaitingForConnection` is reached, since the
    /// wait for an inbound peer is open-ended and proxy-dependent.
    pub async fn wait_for_connection(mut self) -> Result<EstablishedConnection<S>, SocksError> {
        let stream = self
            .client
            .options
            .stream
            .take()
            .ok_or_else(|| SocksError::Internal("BoundConnection lost its transport".into()))?;

        match self.client.drive_loop(stream).await? {
            SocksConnectOutcome::Established(established) => Ok(established),
            SocksConnectOutcome::Bound(_) => Err(SocksError::Internal(
                "BIND produced a second bound response instead of an established connection".into(),
            )),
        }
    }
}

/// The three observable terminal outcomes of a handshake (spec §6).
pub enum SocksConnectOutcome<S> {
    Established(EstablishedConnection<S>),
    Bound(BoundConnection<S>),
}

/// What a successfully parsed response means for the state machine's
/// next move: either the handshake is done (`Established`), or it has
/// reached BIND's waiting stage (`Bound`).
enum Terminal {
    Established { remote_host: Option<SocksRemoteHost> },
    Bound { remote_host: SocksRemoteHost },
}

/// Owns a transport and drives a single SOCKS handshake over it.
pub struct SocksClient<S> {
    options: SocksClientOptions<S>,
    state: SocksClientState,
    buffer: ReceiveBuffer,
    watermark: usize,
}

impl<S: Transport> SocksClient<S> {
    pub fn new(options: SocksClientOptions<S>) -> SocksClient<S> {
        SocksClient {
            options,
            state: SocksClientState::Created,
            buffer: ReceiveBuffer::new(),
            watermark: 0,
        }
    }

    /// Current protocol state. Mostly useful for tests and diagnostics;
    /// the driving logic itself is internal to `connect`.
    pub fn state(&self) -> SocksClientState {
        self.state
    }

    /// Drives the handshake to completion (or failure), under the
    /// overall timeout configured in `options.timeout`.
    ///
    /// Consumes `self`: once this returns, successfully or not, there is
    /// no `SocksClient` value left to call again — the absorbing `Error`
    /// state from spec §3 falls out of ownership rather than being a
    /// representable variant.
    pub async fn connect(self) -> Result<SocksConnectOutcome<S>, SocksError> {
        let timeout = self.options.timeout;
        match tokio::time::timeout(timeout, self.run()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("SOCKS handshake timed out");
                Err(SocksError::Timeout)
            }
        }
    }

    async fn run(mut self) -> Result<SocksConnectOutcome<S>, SocksError> {
        let mut stream = self
            .options
            .stream
            .take()
            .ok_or_else(|| SocksError::Internal("SocksClientOptions has no transport attached".into()))?;

        // Synthesizes the `connect` event: an existing stream is treated
        // as already connected.
        self.state = SocksClientState::Connected;
        self.send_initial_handshake(&mut stream).await?;
        self.drive_loop(stream).await
    }

    async fn send_initial_handshake(&mut self, stream: &mut S) -> Result<(), SocksError> {
        let request = match self.options.proxy.version {
            SocksVersion::V4 => {
                let user_id = self.options.proxy.user_id.clone().unwrap_or_default();
                socks4::frame_request(self.options.command, &self.options.destination, &user_id)
            }
            SocksVersion::V5 => method::frame_request(
                self.options.proxy.user_id.as_deref(),
                self.options.proxy.password.as_deref(),
            ),
        };

        tracing::debug!(bytes = request.len(), "writing initial SOCKS handshake");
        stream.write_all(&request).await?;

        self.state = SocksClientState::SentInitialHandshake;
        self.watermark = match self.options.proxy.version {
            SocksVersion::V4 => socks4::RESPONSE_LEN,
            SocksVersion::V5 => method::RESPONSE_LEN,
        };
        Ok(())
    }

    /// Reads from `stream` and feeds the receive buffer until a
    /// terminal outcome is reached. Entered both by a fresh `connect()`
    /// and by `BoundConnection::wait_for_connection()` resuming the same
    /// state machine.
    async fn drive_loop(mut self, mut stream: S) -> Result<SocksConnectOutcome<S>, SocksError> {
        let mut read_buf = [0u8; 4096];
        loop {
            while self.buffer.length() >= self.watermark {
                if let Some(terminal) = self.step(&mut stream).await? {
                    return Ok(self.finalize(stream, terminal));
                }
            }

            let n = stream.read(&mut read_buf).await?;
            if n == 0 {
                return Err(SocksError::SocketClosed);
            }
            self.buffer.append(&read_buf[..n]);
        }
    }

    /// Dispatches the current state against the buffered prefix. Returns
    /// `Ok(Some(terminal))` once a terminal outcome is reached, or
    /// `Ok(None)` to keep looping (either a non-terminal response was
    /// parsed and the next request written, or more bytes are still
    /// needed and `self.watermark` was raised accordingly).
    async fn step(&mut self, stream: &mut S) -> Result<Option<Terminal>, SocksError> {
        match self.state {
            SocksClientState::SentInitialHandshake => match self.options.proxy.version {
                SocksVersion::V4 => self.handle_socks4_response(false),
                SocksVersion::V5 => self.handle_method_selection(stream).await,
            },
            SocksClientState::SentAuthentication => self.handle_auth_response(stream).await,
            SocksClientState::SentFinalHandshake => self.handle_socks5_reply(false),
            SocksClientState::BoundWaitingForConnection => match self.options.proxy.version {
                SocksVersion::V4 => self.handle_socks4_response(true),
                SocksVersion::V5 => self.handle_socks5_reply(true),
            },
            other => Err(SocksError::Internal(format!(
                "reached dispatch with no matching parser for state {other:?}"
            ))),
        }
    }

    async fn handle_method_selection(&mut self, stream: &mut S) -> Result<Option<Terminal>, SocksError> {
        let bytes = self.buffer.get(method::RESPONSE_LEN);
        match method::parse_response(&bytes)? {
            SelectedMethod::NoAuth => {
                self.send_command_request(stream).await?;
            }
            SelectedMethod::UserPass => {
                let user_id = self.options.proxy.user_id.clone().unwrap_or_default();
                let password = self.options.proxy.password.clone().unwrap_or_default();
                let request = auth::frame_request(&user_id, &password);
                stream.write_all(&request).await?;
                self.state = SocksClientState::SentAuthentication;
                self.watermark = auth::RESPONSE_LEN;
            }
        }
        Ok(None)
    }

    async fn handle_auth_response(&mut self, stream: &mut S) -> Result<Option<Terminal>, SocksError> {
        let bytes = self.buffer.get(auth::RESPONSE_LEN);
        auth::parse_response(&bytes)?;
        self.send_command_request(stream).await?;
        Ok(None)
    }

    async fn send_command_request(&mut self, stream: &mut S) -> Result<(), SocksError> {
        let request = request::frame_request(self.options.command, &self.options.destination)?;
        tracing::debug!(bytes = request.len(), "writing SOCKS5 command request");
        stream.write_all(&request).await?;
        self.state = SocksClientState::SentFinalHandshake;
        self.watermark = request::RESPONSE_MIN_WATERMARK;
        Ok(())
    }

    fn handle_socks4_response(&mut self, is_bound_second_response: bool) -> Result<Option<Terminal>, SocksError> {
        let bytes = self.buffer.get(socks4::RESPONSE_LEN);
        let response = socks4::parse_response(&bytes, &self.options.proxy, is_bound_second_response)?;
        Ok(Some(self.complete(response.remote_host, is_bound_second_response)))
    }

    fn handle_socks5_reply(&mut self, is_bound_second_response: bool) -> Result<Option<Terminal>, SocksError> {
        let peeked = self.buffer.peek(self.watermark.max(request::RESPONSE_MIN_WATERMARK));
        match reply::try_parse(&peeked, &self.options.proxy, is_bound_second_response)? {
            reply::ParseStep::NeedMoreBytes(required) => {
                self.watermark = required;
                Ok(None)
            }
            reply::ParseStep::Parsed { response, consumed } => {
                self.buffer.get(consumed);
                Ok(Some(self.complete(response.remote_host, is_bound_second_response)))
            }
        }
    }

    /// Turns a parsed response's remote host into the right `Terminal`
    /// for the configured command, and — for a BIND first response —
    /// arms the state machine to keep parsing the second response.
    fn complete(&mut self, remote_host: SocksRemoteHost, is_bound_second_response: bool) -> Terminal {
        if self.options.command == Command::Bind && !is_bound_second_response {
            self.state = SocksClientState::BoundWaitingForConnection;
            self.watermark = match self.options.proxy.version {
                SocksVersion::V4 => socks4::RESPONSE_LEN,
                SocksVersion::V5 => request::RESPONSE_MIN_WATERMARK,
            };
            return Terminal::Bound { remote_host };
        }

        let remote_host = match self.options.command {
            Command::Connect => None,
            Command::Associate | Command::Bind => Some(remote_host),
        };
        Terminal::Established { remote_host }
    }

    fn finalize(mut self, stream: S, terminal: Terminal) -> SocksConnectOutcome<S> {
        match terminal {
            Terminal::Established { remote_host } => {
                self.state = SocksClientState::Established;
                let buffered = self.buffer.drain_all();
                tracing::debug!(residual_bytes = buffered.len(), "SOCKS handshake established");
                SocksConnectOutcome::Established(EstablishedConnection { stream, buffered, remote_host })
            }
            Terminal::Bound { remote_host } => {
                self.options.stream = Some(stream);
                tracing::debug!(?remote_host, "SOCKS BIND first response received, waiting for peer");
                SocksConnectOutcome::Bound(BoundConnection { remote_host, client: self })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    async fn read_exact_n(stream: &mut tokio::io::DuplexStream, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        stream.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn socks5_connect_no_auth_ipv4_establishes_and_hands_back_buffered_bytes() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let proxy = SocksProxy::socks5("proxy.example.com", 1080);
        let destination = SocksRemoteHost::new("93.184.216.34", 80);
        let options = SocksClientOptions::new(proxy, destination, Command::Connect).with_stream(client_side);

        let server = tokio::spawn(async move {
            let method_request = read_exact_n(&mut server_side, 3).await;
            assert_eq!(method_request, vec![0x05, 0x01, 0x00]);
            server_side.write_all(&[0x05, 0x00]).await.unwrap();

            let command_request = read_exact_n(&mut server_side, 10).await;
            assert_eq!(command_request[0..4], [0x05, 0x01, 0x00, 0x01]);

            // Reply plus one extra byte that doesn't belong to the
            // handshake at all: the caller's own protocol data arriving
            // eagerly on the same stream.
            server_side
                .write_all(&[0x05, 0x00, 0x00, 0x01, 93, 184, 216, 34, 0x00, 0x50, 0xAB])
                .await
                .unwrap();
        });

        let outcome = SocksClient::new(options).connect().await.unwrap();
        match outcome {
            SocksConnectOutcome::Established(established) => {
                assert_eq!(established.remote_host, None);
                assert_eq!(established.buffered, vec![0xAB]);
            }
            SocksConnectOutcome::Bound(_) => panic!("expected Established"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn socks5_associate_with_wildcard_substitution_reports_proxy_address() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let proxy = SocksProxy::socks5("203.0.113.9", 1080);
        let destination = SocksRemoteHost::new("0.0.0.0", 0);
        let options = SocksClientOptions::new(proxy, destination, Command::Associate).with_stream(client_side);

        let server = tokio::spawn(async move {
            let _method_request = read_exact_n(&mut server_side, 3).await;
            server_side.write_all(&[0x05, 0x00]).await.unwrap();

            let _command_request = read_exact_n(&mut server_side, 10).await;
            // The relay reports the wildcard address, which must be
            // substituted with the proxy's own host.
            server_side
                .write_all(&[0x05, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x30, 0x39])
                .await
                .unwrap();
        });

        let outcome = SocksClient::new(options).connect().await.unwrap();
        match outcome {
            SocksConnectOutcome::Established(established) => {
                let remote_host = established.remote_host.expect("ASSOCIATE reports a relay address");
                assert_eq!(remote_host.host, "203.0.113.9");
                assert_eq!(remote_host.port, 12345);
            }
            SocksConnectOutcome::Bound(_) => panic!("expected Established"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn socks5_connect_with_username_password_auth() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let proxy = SocksProxy::socks5("proxy.example.com", 1080).with_credentials("tony", "hunter2");
        let destination = SocksRemoteHost::new("10.0.0.1", 443);
        let options = SocksClientOptions::new(proxy, destination, Command::Connect).with_stream(client_side);

        let server = tokio::spawn(async move {
            let method_request = read_exact_n(&mut server_side, 4).await;
            assert_eq!(method_request, vec![0x05, 0x02, 0x00, 0x02]);
            server_side.write_all(&[0x05, 0x02]).await.unwrap();

            let auth_request = read_exact_n(&mut server_side, 3 + 4 + 7).await;
            assert_eq!(auth_request[0], 0x01);
            assert_eq!(auth_request[1], 4);
            server_side.write_all(&[0x01, 0x00]).await.unwrap();

            let _command_request = read_exact_n(&mut server_side, 10).await;
            server_side
                .write_all(&[0x05, 0x00, 0x00, 0x01, 10, 0, 0, 1, 0x01, 0xBB])
                .await
                .unwrap();
        });

        let outcome = SocksClient::new(options).connect().await.unwrap();
        assert!(matches!(outcome, SocksConnectOutcome::Established(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn socks4a_connect_to_hostname_destination() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let proxy = SocksProxy::socks4("proxy.example.com", 1080);
        let destination = SocksRemoteHost::new("example.com", 80);
        let options = SocksClientOptions::new(proxy, destination, Command::Connect).with_stream(client_side);

        let server = tokio::spawn(async move {
            let request = read_exact_n(&mut server_side, 10 + "example.com".len()).await;
            assert_eq!(&request[0..4], &[0x04, 0x01, 0x00, 0x50]);
            assert_eq!(&request[4..8], &[0x00, 0x00, 0x00, 0x01]);
            server_side
                .write_all(&[0x00, 0x5A, 0x00, 0x50, 0x00, 0x00, 0x00, 0x00])
                .await
                .unwrap();
        });

        let outcome = SocksClient::new(options).connect().await.unwrap();
        assert!(matches!(outcome, SocksConnectOutcome::Established(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn socks5_connect_rejected_surfaces_connection_rejected_with_raw_code() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let proxy = SocksProxy::socks5("proxy.example.com", 1080);
        let destination = SocksRemoteHost::new("10.0.0.1", 443);
        let options = SocksClientOptions::new(proxy, destination, Command::Connect).with_stream(client_side);

        let server = tokio::spawn(async move {
            let _method_request = read_exact_n(&mut server_side, 3).await;
            server_side.write_all(&[0x05, 0x00]).await.unwrap();

            let _command_request = read_exact_n(&mut server_side, 10).await;
            server_side
                .write_all(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();
        });

        let err = SocksClient::new(options).connect().await.unwrap_err();
        assert!(matches!(err, SocksError::ConnectionRejected { code: 0x05 }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn socks5_bind_two_stage_future_resolves_to_established_connection() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let proxy = SocksProxy::socks5("proxy.example.com", 1080).with_proxy_address("198.51.100.7");
        let destination = SocksRemoteHost::new("example.com", 80);
        let options = SocksClientOptions::new(proxy, destination, Command::Bind).with_stream(client_side);

        let server = tokio::spawn(async move {
            let _method_request = read_exact_n(&mut server_side, 3).await;
            server_side.write_all(&[0x05, 0x00]).await.unwrap();

            let _command_request = read_exact_n(&mut server_side, 4 + 1 + 11 + 2).await;

            // First response: the proxy is listening, wildcard address
            // substituted with the configured proxy_address.
            server_side
                .write_all(&[0x05, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x1F, 0x90])
                .await
                .unwrap();

            // Second response: the inbound peer has connected.
            server_side
                .write_all(&[0x05, 0x00, 0x00, 0x01, 93, 184, 216, 34, 0x00, 0x50])
                .await
                .unwrap();
        });

        let outcome = SocksClient::new(options).connect().await.unwrap();
        let bound = match outcome {
            SocksConnectOutcome::Bound(bound) => bound,
            SocksConnectOutcome::Established(_) => panic!("expected Bound"),
        };
        assert_eq!(bound.remote_host.host, "198.51.100.7");
        assert_eq!(bound.remote_host.port, 0x1F90);

        let established = bound.wait_for_connection().await.unwrap();
        let remote_host = established.remote_host.expect("BIND reports the connecting peer");
        assert_eq!(remote_host.host, "93.184.216.34");
        assert_eq!(remote_host.port, 80);

        server.await.unwrap();
    }
}
