use std::net::UdpSocket;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use anyhow::{Context, Result};
use rosc::{OscPacket, OscType};
use tokio::runtime::Runtime;

const RECV_BUFFER_SIZE: usize = 4096;
const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// A decoded flash-trigger tuple: (param, val1, val2).
pub type OscTrigger = (i32, i32, i32);

/// Listens for OSC datagrams on a background worker and hands any message
/// whose first three arguments are ints to the render thread as a tuple. The
/// address is not interpreted; the tuple's param value selects the behavior.
pub struct OscListener {
    port: u16,
    triggers: Receiver<OscTrigger>,
}

impl OscListener {
    pub fn bind(runtime: &Runtime, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .with_context(|| format!("binding OSC socket on port {port}"))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("setting OSC socket timeout")?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_blocking(move || receive_loop(socket, tx));

        Ok(Self { port, triggers: rx })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Drain pending triggers from the socket thread (non-blocking).
    pub fn poll(&self) -> Vec<OscTrigger> {
        let mut triggers = Vec::new();
        while let Ok(trigger) = self.triggers.try_recv() {
            triggers.push(trigger);
        }
        triggers
    }
}

fn receive_loop(socket: UdpSocket, tx: Sender<OscTrigger>) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv(&mut buf) {
            Ok(len) => {
                if let Ok((_, packet)) = rosc::decoder::decode_udp(&buf[..len]) {
                    if !forward_packet(&packet, &tx) {
                        break;
                    }
                }
            }
            Err(ref err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(err) => {
                eprintln!("OSC socket error: {err}");
                break;
            }
        }
    }
}

/// Walks bundles recursively and forwards every int-triple message. Returns
/// false once the receiving side has gone away.
fn forward_packet(packet: &OscPacket, tx: &Sender<OscTrigger>) -> bool {
    match packet {
        OscPacket::Message(message) => match int_triple(&message.args) {
            Some(trigger) => tx.send(trigger).is_ok(),
            None => true,
        },
        OscPacket::Bundle(bundle) => bundle
            .content
            .iter()
            .all(|packet| forward_packet(packet, tx)),
    }
}

fn int_triple(args: &[OscType]) -> Option<OscTrigger> {
    match args {
        [OscType::Int(a), OscType::Int(b), OscType::Int(c), ..] => Some((*a, *b, *c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscMessage, OscTime};

    fn message(args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: "/hexpad/flash".to_string(),
            args,
        })
    }

    #[test]
    fn extracts_leading_int_triple() {
        let args = vec![OscType::Int(0), OscType::Int(50), OscType::Int(90)];
        assert_eq!(int_triple(&args), Some((0, 50, 90)));
    }

    #[test]
    fn extra_trailing_args_are_tolerated() {
        let args = vec![
            OscType::Int(0),
            OscType::Int(50),
            OscType::Int(90),
            OscType::String("ignored".to_string()),
        ];
        assert_eq!(int_triple(&args), Some((0, 50, 90)));
    }

    #[test]
    fn short_or_non_int_args_are_rejected() {
        assert_eq!(int_triple(&[OscType::Int(0), OscType::Int(50)]), None);
        assert_eq!(
            int_triple(&[
                OscType::Float(0.0),
                OscType::Int(50),
                OscType::Int(90)
            ]),
            None
        );
        assert_eq!(int_triple(&[]), None);
    }

    #[test]
    fn forwards_messages_nested_in_bundles() {
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                message(vec![OscType::Int(0), OscType::Int(50), OscType::Int(90)]),
                message(vec![OscType::String("noise".to_string())]),
                OscPacket::Bundle(OscBundle {
                    timetag: OscTime {
                        seconds: 0,
                        fractional: 1,
                    },
                    content: vec![message(vec![
                        OscType::Int(1),
                        OscType::Int(2),
                        OscType::Int(3),
                    ])],
                }),
            ],
        });

        let (tx, rx) = mpsc::channel();
        assert!(forward_packet(&bundle, &tx));
        assert_eq!(rx.try_recv(), Ok((0, 50, 90)));
        assert_eq!(rx.try_recv(), Ok((1, 2, 3)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn survives_an_encode_decode_round_trip() {
        let encoded = rosc::encoder::encode(&message(vec![
            OscType::Int(0),
            OscType::Int(75),
            OscType::Int(95),
        ]))
        .unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&encoded).unwrap();

        let (tx, rx) = mpsc::channel();
        assert!(forward_packet(&packet, &tx));
        assert_eq!(rx.try_recv(), Ok((0, 75, 95)));
    }
}
