use std::{
    fmt, io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

use rosc::{encoder, OscMessage, OscPacket, OscType};

/// Typed OSC payload sent for an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscValue {
    Int(i32),
    Bool(bool),
}

#[derive(Debug)]
pub enum OscError {
    Encode(rosc::OscError),
    Io(io::Error),
}

impl fmt::Display for OscError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscError::Encode(e) => write!(f, "OSC encode error: {:?}", e),
            OscError::Io(e) => write!(f, "OSC send error: {}", e),
        }
    }
}

impl std::error::Error for OscError {}

impl From<io::Error> for OscError {
    fn from(error: io::Error) -> Self {
        OscError::Io(error)
    }
}

/// Destination for OSC encoder messages.
pub trait OscSink: Send {
    fn send(&mut self, path: &str, value: OscValue) -> Result<(), OscError>;
}

/// Sends one UDP datagram per message to a fixed target.
pub struct UdpOscSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpOscSink {
    /// Send to `port` on the local host.
    pub fn localhost(port: u16) -> Result<Self, OscError> {
        Self::connect(("127.0.0.1", port))
    }

    pub fn connect<A: ToSocketAddrs>(target: A) -> Result<Self, OscError> {
        let target = target.to_socket_addrs()?.next().ok_or_else(|| {
            OscError::Io(io::Error::new(io::ErrorKind::InvalidInput, "no OSC target address"))
        })?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Encode a single-argument message.
pub fn encode(path: &str, value: OscValue) -> Result<Vec<u8>, OscError> {
    let arg = match value {
        OscValue::Int(v) => OscType::Int(v),
        OscValue::Bool(v) => OscType::Bool(v),
    };
    let packet = OscPacket::Message(OscMessage {
        addr: path.to_string(),
        args: vec![arg],
    });
    encoder::encode(&packet).map_err(OscError::Encode)
}

impl OscSink for UdpOscSink {
    fn send(&mut self, path: &str, value: OscValue) -> Result<(), OscError> {
        let bytes = encode(path, value)?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }
}
