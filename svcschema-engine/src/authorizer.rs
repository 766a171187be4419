//! Who may attempt a mutation, and when.
//!
//! Authorizers run only for properties that carry a supplied value. The
//! first refusal aborts the whole mutation; nothing is accumulated.
//!
//! Two built-ins:
//! - `actor`: the acting actor kind must be in an allow-list
//! - `state`: on update, the service must be in one of the listed states

use crate::context::EngineContext;
use crate::validator::config_names;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use svcschema_types::ActorKind;

/// A named, configurable gate on a property mutation.
pub trait Authorizer: Send + Sync {
    /// Returns the refusal reason, if the mutation at `path` is not allowed.
    fn authorize(&self, ctx: &EngineContext<'_>, path: &str, config: &Value)
    -> Result<(), String>;

    fn validate_config(&self, config: &Value) -> Result<(), String>;
}

/// Every built-in authorizer, keyed by name.
pub fn builtin() -> Vec<(&'static str, Arc<dyn Authorizer>)> {
    let actor: Arc<dyn Authorizer> = Arc::new(ActorAuthorizer);
    let state: Arc<dyn Authorizer> = Arc::new(StateAuthorizer);
    vec![(ActorAuthorizer::NAME, actor), (StateAuthorizer::NAME, state)]
}

/// Set of actor kinds allowed to set a property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorSet {
    allowed: BTreeSet<ActorKind>,
}

impl ActorSet {
    /// Parses an allow-list such as `["admin", "agent"]`.
    pub fn from_config(config: &Value) -> Result<Self, String> {
        let allowed = config_names(config)?
            .iter()
            .map(|name| name.parse::<ActorKind>().map_err(|e| e.to_string()))
            .collect::<Result<_, _>>()?;
        Ok(Self { allowed })
    }

    pub fn is_allowed(&self, actor: ActorKind) -> bool {
        self.allowed.contains(&actor)
    }

    fn describe(&self) -> String {
        self.allowed
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Config: list of actor kinds (any of them may set the property).
pub struct ActorAuthorizer;

impl ActorAuthorizer {
    pub const NAME: &'static str = "actor";
}

impl Authorizer for ActorAuthorizer {
    fn authorize(
        &self,
        ctx: &EngineContext<'_>,
        _path: &str,
        config: &Value,
    ) -> Result<(), String> {
        let allowed = ActorSet::from_config(config)
            .map_err(|e| format!("invalid {} authorizer config: {e}", Self::NAME))?;
        if allowed.is_allowed(ctx.actor) {
            Ok(())
        } else {
            Err(format!(
                "actor {} may not set this property; allowed actors: {}",
                ctx.actor,
                allowed.describe()
            ))
        }
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        ActorSet::from_config(config).map(drop)
    }
}

/// Config: list of states. Creation is never restricted.
pub struct StateAuthorizer;

impl StateAuthorizer {
    pub const NAME: &'static str = "state";
}

impl Authorizer for StateAuthorizer {
    fn authorize(
        &self,
        ctx: &EngineContext<'_>,
        _path: &str,
        config: &Value,
    ) -> Result<(), String> {
        let states = config_names(config)
            .map_err(|e| format!("invalid {} authorizer config: {e}", Self::NAME))?;
        if !ctx.is_update() {
            return Ok(());
        }
        let current = &ctx.service.current_state;
        if states.iter().any(|s| s == current) {
            Ok(())
        } else {
            Err(format!(
                "cannot change property in state {current}; allowed states: {}",
                states.join(", ")
            ))
        }
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_names(config).map(drop)
    }
}
