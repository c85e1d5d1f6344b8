use gridvault_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedInteger};

use crate::{
    inventory::{InventoryError, InventoryResult},
    messages::{InventoryMessage, InventoryRequest},
    types::{InventoryId, RequestId},
};

/// Routing part of a packet. Read on its own first so a receiver can still
/// answer a request whose body fails to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketHeader {
    Request {
        request_id: RequestId,
        inventory: InventoryId,
    },
    Response {
        request_id: RequestId,
    },
    Broadcast {
        inventory: InventoryId,
    },
}

impl Serde for PacketHeader {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            PacketHeader::Request {
                request_id,
                inventory,
            } => {
                UnsignedInteger::<2>::new(0).ser(writer);
                request_id.ser(writer);
                inventory.ser(writer);
            }
            PacketHeader::Response { request_id } => {
                UnsignedInteger::<2>::new(1).ser(writer);
                request_id.ser(writer);
            }
            PacketHeader::Broadcast { inventory } => {
                UnsignedInteger::<2>::new(2).ser(writer);
                inventory.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = UnsignedInteger::<2>::de(reader)?.try_to()?;
        match tag {
            0 => Ok(PacketHeader::Request {
                request_id: RequestId::de(reader)?,
                inventory: InventoryId::de(reader)?,
            }),
            1 => Ok(PacketHeader::Response {
                request_id: RequestId::de(reader)?,
            }),
            2 => Ok(PacketHeader::Broadcast {
                inventory: InventoryId::de(reader)?,
            }),
            _ => Err(SerdeErr::InvalidValue {
                type_name: "PacketHeader",
            }),
        }
    }
}

/// One unit of traffic between peers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Request {
        request_id: RequestId,
        inventory: InventoryId,
        request: InventoryRequest,
    },
    Response {
        request_id: RequestId,
        result: InventoryResult<()>,
    },
    Broadcast {
        inventory: InventoryId,
        message: InventoryMessage,
    },
}

impl Packet {
    pub fn header(&self) -> PacketHeader {
        match self {
            Packet::Request {
                request_id,
                inventory,
                ..
            } => PacketHeader::Request {
                request_id: *request_id,
                inventory: *inventory,
            },
            Packet::Response { request_id, .. } => PacketHeader::Response {
                request_id: *request_id,
            },
            Packet::Broadcast { inventory, .. } => PacketHeader::Broadcast {
                inventory: *inventory,
            },
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.header().ser(&mut writer);
        match self {
            Packet::Request { request, .. } => request.ser(&mut writer),
            Packet::Response { result, .. } => {
                let code = match result {
                    Ok(()) => 0,
                    Err(error) => error.code(),
                };
                code.ser(&mut writer);
            }
            Packet::Broadcast { message, .. } => message.ser(&mut writer),
        }
        writer.to_bytes()
    }

    /// Reads the body that follows an already decoded header
    pub fn read_body(header: PacketHeader, reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let packet = match header {
            PacketHeader::Request {
                request_id,
                inventory,
            } => Packet::Request {
                request_id,
                inventory,
                request: InventoryRequest::de(reader)?,
            },
            PacketHeader::Response { request_id } => {
                let code = u8::de(reader)?;
                // Codes this build does not know still fail the request
                let result = match code {
                    0 => Ok(()),
                    code => Err(InventoryError::from_code(code)
                        .unwrap_or(InventoryError::RequestRejected)),
                };
                Packet::Response { request_id, result }
            }
            PacketHeader::Broadcast { inventory } => Packet::Broadcast {
                inventory,
                message: InventoryMessage::de(reader)?,
            },
        };
        Ok(packet)
    }

    pub fn read(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);
        let header = PacketHeader::de(&mut reader)?;
        Self::read_body(header, &mut reader)
    }
}
