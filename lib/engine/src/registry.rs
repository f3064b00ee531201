use crate::error::QueryEvaluationError;
use crate::member::MemberConnectionRef;
use oxrdf::NamedNode;
use rdf_federation_model::{ServiceDescriptor, ServiceDescriptorRef, ServiceMap};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Describes a `SERVICE` IRI that is answered by a registered member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberServiceDescriptor {
    member_id: String,
    service_capable: bool,
}

impl MemberServiceDescriptor {
    pub fn new(member_id: impl Into<String>, service_capable: bool) -> Self {
        Self {
            member_id: member_id.into(),
            service_capable,
        }
    }
}

impl ServiceDescriptor for MemberServiceDescriptor {
    fn member_id(&self) -> &str {
        &self.member_id
    }

    fn is_service_capable(&self) -> bool {
        self.service_capable
    }
}

/// Holds the member connections of a federation and the `SERVICE` IRIs they answer.
///
/// The registry is read-only while queries are planned.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    members: FxHashMap<String, MemberConnectionRef>,
    services: ServiceMap,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member connection. Returns the connection that was previously registered
    /// under the same id.
    pub fn register_member(&mut self, connection: MemberConnectionRef) -> Option<MemberConnectionRef> {
        let id = connection.member_id().to_owned();
        self.members.insert(id, connection)
    }

    /// Routes `SERVICE <iri>` to the member `member_id`.
    ///
    /// Whether the member can evaluate service calls natively is taken from its capabilities at
    /// the time of registration.
    pub fn register_service(
        &mut self,
        iri: NamedNode,
        member_id: &str,
    ) -> Result<(), QueryEvaluationError> {
        let member = self
            .member(member_id)
            .ok_or_else(|| QueryEvaluationError::UnknownMember(member_id.to_owned()))?;
        let descriptor: ServiceDescriptorRef = Arc::new(MemberServiceDescriptor::new(
            member_id,
            member.capabilities().supports_service,
        ));
        tracing::debug!(%iri, member = member_id, "Registered service");
        self.services.insert(iri, descriptor);
        Ok(())
    }

    pub fn member(&self, member_id: &str) -> Option<&MemberConnectionRef> {
        self.members.get(member_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberConnectionRef> {
        self.members.values()
    }

    /// The descriptors of all registered services, keyed by IRI.
    pub fn services(&self) -> &ServiceMap {
        &self.services
    }

    /// Returns the member that answers `SERVICE <iri>`.
    pub fn service_member(&self, iri: &NamedNode) -> Option<&MemberConnectionRef> {
        self.services
            .get(iri)
            .and_then(|descriptor| self.member(descriptor.member_id()))
    }
}
