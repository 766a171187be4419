use svcschema_store::Store;
use svcschema_types::{ActorKind, Operation, PropertySource, ServiceRecord};

/// The service whose properties are being processed.
///
/// On creation this is the record about to be written (its id already
/// assigned, `properties` empty); on update it is the stored record.
pub type ServiceTarget = ServiceRecord;

/// Everything a validator, authorizer or generator may consult.
///
/// Built once per request and passed down by reference; nothing in the
/// engine mutates it.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub store: &'a dyn Store,
    pub actor: ActorKind,
    pub operation: Operation,
    pub service: &'a ServiceTarget,
}

impl<'a> EngineContext<'a> {
    pub fn new(
        store: &'a dyn Store,
        actor: ActorKind,
        operation: Operation,
        service: &'a ServiceTarget,
    ) -> Self {
        Self {
            store,
            actor,
            operation,
            service,
        }
    }

    /// The same request, reading and writing through `store` instead.
    ///
    /// Used to rebind a context to the transaction handle of an atomic unit.
    pub fn with_store<'b>(&self, store: &'b dyn Store) -> EngineContext<'b>
    where
        'a: 'b,
    {
        EngineContext {
            store,
            actor: self.actor,
            operation: self.operation,
            service: self.service,
        }
    }

    pub fn is_update(&self) -> bool {
        self.operation.is_update()
    }

    /// Source kind of the acting actor.
    pub fn source(&self) -> PropertySource {
        self.actor.source()
    }
}
