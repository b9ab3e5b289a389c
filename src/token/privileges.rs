//! Services and the privileges they grant
//!
//! Every kind carries a fixed wire id. The sets are closed: an id the
//! platform does not define is rejected rather than carried through.

use crate::token::message::MessageError;
use crate::token::packer::{PackError, Packer, Unpacker};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Logical service a block of privileges belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Real-time audio/video channel
    Rtc,
    /// Real-time messaging
    Rtm,
}

impl ServiceType {
    pub const fn id(self) -> u16 {
        match self {
            ServiceType::Rtc => 1,
            ServiceType::Rtm => 2,
        }
    }

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(ServiceType::Rtc),
            2 => Some(ServiceType::Rtm),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Rtc => write!(f, "rtc"),
            ServiceType::Rtm => write!(f, "rtm"),
        }
    }
}

/// A privilege kind scoped to one service
pub trait PrivilegeKind: Copy + Ord + fmt::Debug + Serialize {
    const SERVICE: ServiceType;

    fn id(self) -> u16;

    fn from_id(id: u16) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RtcPrivilege {
    JoinChannel,
    PublishAudioStream,
    PublishVideoStream,
    PublishDataStream,
}

impl RtcPrivilege {
    pub const ALL: [RtcPrivilege; 4] = [
        RtcPrivilege::JoinChannel,
        RtcPrivilege::PublishAudioStream,
        RtcPrivilege::PublishVideoStream,
        RtcPrivilege::PublishDataStream,
    ];
}

impl PrivilegeKind for RtcPrivilege {
    const SERVICE: ServiceType = ServiceType::Rtc;

    fn id(self) -> u16 {
        match self {
            RtcPrivilege::JoinChannel => 1,
            RtcPrivilege::PublishAudioStream => 2,
            RtcPrivilege::PublishVideoStream => 3,
            RtcPrivilege::PublishDataStream => 4,
        }
    }

    fn from_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(RtcPrivilege::JoinChannel),
            2 => Some(RtcPrivilege::PublishAudioStream),
            3 => Some(RtcPrivilege::PublishVideoStream),
            4 => Some(RtcPrivilege::PublishDataStream),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RtmPrivilege {
    Login,
}

impl PrivilegeKind for RtmPrivilege {
    const SERVICE: ServiceType = ServiceType::Rtm;

    fn id(self) -> u16 {
        match self {
            RtmPrivilege::Login => 1,
        }
    }

    fn from_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(RtmPrivilege::Login),
            _ => None,
        }
    }
}

/// Any privilege, tagged with its service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    Rtc(RtcPrivilege),
    Rtm(RtmPrivilege),
}

impl Privilege {
    pub fn service_type(self) -> ServiceType {
        match self {
            Privilege::Rtc(_) => ServiceType::Rtc,
            Privilege::Rtm(_) => ServiceType::Rtm,
        }
    }
}

impl From<RtcPrivilege> for Privilege {
    fn from(kind: RtcPrivilege) -> Self {
        Privilege::Rtc(kind)
    }
}

impl From<RtmPrivilege> for Privilege {
    fn from(kind: RtmPrivilege) -> Self {
        Privilege::Rtm(kind)
    }
}

/// Privilege kind → absolute expiration (seconds since epoch)
///
/// Packed in ascending kind id, so the same set always yields the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Privileges<K: PrivilegeKind> {
    entries: BTreeMap<K, u32>,
}

impl<K: PrivilegeKind> Default for Privileges<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PrivilegeKind> Privileges<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Grant `kind` until `expire_at`, replacing any earlier expiration
    pub fn set(&mut self, kind: K, expire_at: u32) {
        self.entries.insert(kind, expire_at);
    }

    pub fn get(&self, kind: K) -> Option<u32> {
        self.entries.get(&kind).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (K, u32)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn pack(&self, packer: &mut Packer) -> Result<(), PackError> {
        packer.put_map(self.iter(), |p, kind, expire_at| {
            p.put_u16(kind.id()).put_u32(expire_at);
            Ok(())
        })?;
        Ok(())
    }

    pub(crate) fn unpack(unpacker: &mut Unpacker<'_>) -> Result<Self, MessageError> {
        let raw = unpacker.get_map(|u| Ok((u.get_u16()?, u.get_u32()?)))?;

        let mut privileges = Self::new();
        for (id, expire_at) in raw {
            let kind = K::from_id(id).ok_or(MessageError::UnknownPrivilege {
                service: K::SERVICE,
                id,
            })?;
            privileges.set(kind, expire_at);
        }
        Ok(privileges)
    }
}

impl<K: PrivilegeKind> FromIterator<(K, u32)> for Privileges<K> {
    fn from_iter<T: IntoIterator<Item = (K, u32)>>(iter: T) -> Self {
        let mut privileges = Privileges::new();
        for (kind, expire_at) in iter {
            privileges.set(kind, expire_at);
        }
        privileges
    }
}
