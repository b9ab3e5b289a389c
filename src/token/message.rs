//! Token message assembly
//!
//! The message is the exact byte sequence the signature covers:
//!
//! ```text
//! str app_id | u32 issued_at | u32 salt | u16 service_count
//!   per service, ascending type id:
//!   u16 type | identity fields | map<u16 kind, u32 expire_at>
//! ```

use crate::token::packer::{PackError, Packer, Unpacker};
use crate::token::privileges::{
    Privilege, PrivilegeKind, Privileges, RtcPrivilege, RtmPrivilege, ServiceType,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("unknown service type id {0}")]
    UnknownService(u16),

    #[error("unknown {service} privilege id {id}")]
    UnknownPrivilege { service: ServiceType, id: u16 },

    #[error("{0} service appears more than once")]
    DuplicateService(ServiceType),

    #[error("{0} service is not attached to this token")]
    ServiceNotAttached(ServiceType),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Channel access, addressed by channel name and user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtcService {
    pub channel_name: String,
    /// Decimal uid for numeric users; empty for uid 0
    pub account: String,
    pub privileges: Privileges<RtcPrivilege>,
}

impl RtcService {
    pub fn with_uid(channel_name: impl Into<String>, uid: u32) -> Self {
        // uid 0 is carried as the empty account
        let account = if uid == 0 { String::new() } else { uid.to_string() };
        Self::with_account(channel_name, account)
    }

    pub fn with_account(channel_name: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            account: account.into(),
            privileges: Privileges::new(),
        }
    }

    /// The account read back as a numeric uid, if it is one
    pub fn uid(&self) -> Option<u32> {
        if self.account.is_empty() {
            return Some(0);
        }
        self.account.parse().ok()
    }
}

/// Messaging login, addressed by user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtmService {
    pub user_id: String,
    pub privileges: Privileges<RtmPrivilege>,
}

impl RtmService {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            privileges: Privileges::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum Service {
    Rtc(RtcService),
    Rtm(RtmService),
}

impl Service {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Service::Rtc(_) => ServiceType::Rtc,
            Service::Rtm(_) => ServiceType::Rtm,
        }
    }

    /// The identifier a verifier checks the token against
    pub fn primary_identifier(&self) -> &str {
        match self {
            Service::Rtc(s) => &s.channel_name,
            Service::Rtm(s) => &s.user_id,
        }
    }

    pub fn set_privilege(&mut self, privilege: Privilege, expire_at: u32) -> Result<(), MessageError> {
        match (self, privilege) {
            (Service::Rtc(s), Privilege::Rtc(kind)) => s.privileges.set(kind, expire_at),
            (Service::Rtm(s), Privilege::Rtm(kind)) => s.privileges.set(kind, expire_at),
            (_, other) => return Err(MessageError::ServiceNotAttached(other.service_type())),
        }
        Ok(())
    }

    pub fn privileges(&self) -> Vec<(Privilege, u32)> {
        match self {
            Service::Rtc(s) => tagged(&s.privileges),
            Service::Rtm(s) => tagged(&s.privileges),
        }
    }

    /// Identity fields and privileges; the type id is written by the caller
    fn pack(&self, packer: &mut Packer) -> Result<(), PackError> {
        match self {
            Service::Rtc(s) => {
                packer.put_str(&s.channel_name)?.put_str(&s.account)?;
                s.privileges.pack(packer)
            }
            Service::Rtm(s) => {
                packer.put_str(&s.user_id)?;
                s.privileges.pack(packer)
            }
        }
    }

    fn unpack(service_type: ServiceType, unpacker: &mut Unpacker<'_>) -> Result<Self, MessageError> {
        match service_type {
            ServiceType::Rtc => {
                let channel_name = unpacker.get_string()?;
                let account = unpacker.get_string()?;
                let privileges = Privileges::unpack(unpacker)?;
                Ok(Service::Rtc(RtcService {
                    channel_name,
                    account,
                    privileges,
                }))
            }
            ServiceType::Rtm => {
                let user_id = unpacker.get_string()?;
                let privileges = Privileges::unpack(unpacker)?;
                Ok(Service::Rtm(RtmService { user_id, privileges }))
            }
        }
    }
}

fn tagged<K>(privileges: &Privileges<K>) -> Vec<(Privilege, u32)>
where
    K: PrivilegeKind + Into<Privilege>,
{
    privileges.iter().map(|(k, v)| (k.into(), v)).collect()
}

impl From<RtcService> for Service {
    fn from(service: RtcService) -> Self {
        Service::Rtc(service)
    }
}

impl From<RtmService> for Service {
    fn from(service: RtmService) -> Self {
        Service::Rtm(service)
    }
}

/// Unsigned token contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub app_id: String,
    pub issued_at: u32,
    pub salt: u32,
    services: BTreeMap<ServiceType, Service>,
}

impl AccessToken {
    pub fn new(app_id: impl Into<String>, issued_at: u32, salt: u32) -> Self {
        Self {
            app_id: app_id.into(),
            issued_at,
            salt,
            services: BTreeMap::new(),
        }
    }

    /// Attach a service, returning the one it replaces
    pub fn add_service(&mut self, service: impl Into<Service>) -> Option<Service> {
        let service = service.into();
        self.services.insert(service.service_type(), service)
    }

    /// Grant a privilege on an already attached service
    pub fn set_privilege(
        &mut self,
        privilege: impl Into<Privilege>,
        expire_at: u32,
    ) -> Result<(), MessageError> {
        let privilege = privilege.into();
        let service_type = privilege.service_type();
        self.services
            .get_mut(&service_type)
            .ok_or(MessageError::ServiceNotAttached(service_type))?
            .set_privilege(privilege, expire_at)
    }

    /// Granted privileges of one service; empty when it is not attached
    pub fn privileges_for(&self, service_type: ServiceType) -> Vec<(Privilege, u32)> {
        self.services
            .get(&service_type)
            .map(Service::privileges)
            .unwrap_or_default()
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> + '_ {
        self.services.values()
    }

    pub fn rtc(&self) -> Option<&RtcService> {
        match self.services.get(&ServiceType::Rtc) {
            Some(Service::Rtc(s)) => Some(s),
            _ => None,
        }
    }

    pub fn rtm(&self) -> Option<&RtmService> {
        match self.services.get(&ServiceType::Rtm) {
            Some(Service::Rtm(s)) => Some(s),
            _ => None,
        }
    }

    /// Identifier of the lowest-numbered service, or "" when there is none
    pub fn primary_identifier(&self) -> &str {
        self.services
            .values()
            .next()
            .map(Service::primary_identifier)
            .unwrap_or("")
    }

    /// Earliest expiration across every granted privilege
    pub fn expires_at(&self) -> Option<u32> {
        self.services
            .values()
            .flat_map(Service::privileges)
            .map(|(_, expire_at)| expire_at)
            .min()
    }

    pub fn pack_message(&self) -> Result<Vec<u8>, PackError> {
        let mut packer = Packer::new();
        packer
            .put_str(&self.app_id)?
            .put_u32(self.issued_at)
            .put_u32(self.salt);
        packer.put_map(self.services.iter(), |p, service_type, service| {
            p.put_u16(service_type.id());
            service.pack(p)
        })?;
        Ok(packer.into_bytes())
    }

    pub fn unpack_message(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut unpacker = Unpacker::new(bytes);
        let app_id = unpacker.get_string()?;
        let issued_at = unpacker.get_u32()?;
        let salt = unpacker.get_u32()?;

        let mut token = AccessToken::new(app_id, issued_at, salt);
        let count = unpacker.get_u16()?;
        for _ in 0..count {
            let id = unpacker.get_u16()?;
            let service_type = ServiceType::from_id(id).ok_or(MessageError::UnknownService(id))?;
            let service = Service::unpack(service_type, &mut unpacker)?;
            if token.add_service(service).is_some() {
                return Err(MessageError::DuplicateService(service_type));
            }
        }

        match unpacker.remaining() {
            0 => Ok(token),
            n => Err(MessageError::TrailingBytes(n)),
        }
    }
}
