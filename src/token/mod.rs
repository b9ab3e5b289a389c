//! Access token engine
//!
//! Layers, leaf-first:
//! - `packer`: positional little-endian packing of integers, strings, maps
//! - `privileges`: service types and privilege kinds with their wire ids
//! - `message`: services and the signed message layout
//! - `signer`: HMAC-SHA256 key schedule (certificate → timestamp → salt)
//! - `codec`: version marker, checksums and URL-safe base64 text form

pub mod codec;
mod message;
mod packer;
mod privileges;
pub mod signer;

pub use codec::{decode, decode_unverified, encode, TokenError, VERSION};
pub use message::{AccessToken, MessageError, RtcService, RtmService, Service};
pub use packer::{PackError, Packer, Unpacker};
pub use privileges::{Privilege, PrivilegeKind, Privileges, RtcPrivilege, RtmPrivilege, ServiceType};
