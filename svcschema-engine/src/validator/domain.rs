//! Validators that need more than the value: provider options, other
//! services, the acting actor or the service's lifecycle state.

use super::{Validator, bad_config, config_names, wrong_kind};
use crate::context::EngineContext;
use crate::error::ValidatorFailure;
use serde::Deserialize;
use serde_json::Value;
use svcschema_model::StandardValue;
use svcschema_types::ActorKind;
use tracing::debug;

// ── serviceOption ────────────────────────────────────────────────

/// The value must equal one of the provider's enabled options in a
/// category.
///
/// Config: the option category's lookup key, e.g. `"flavor"`.
pub struct ServiceOptionValidator;

impl ServiceOptionValidator {
    pub const NAME: &'static str = "serviceOption";

    fn category(config: &Value) -> Result<&str, String> {
        match config.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(format!("expected an option type name, got {config}")),
        }
    }
}

impl Validator for ServiceOptionValidator {
    fn validate(
        &self,
        ctx: &EngineContext<'_>,
        path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let category = Self::category(config).map_err(|e| bad_config(Self::NAME, e))?;

        let Some(option_type) = ctx.store.find_service_option_type_by_name(category)? else {
            return Err(ValidatorFailure::invalid(format!(
                "unknown service option type: {category}"
            )));
        };

        let options = ctx
            .store
            .list_enabled_service_options(&ctx.service.provider_id, &option_type.id)?;
        if options.is_empty() {
            return Err(ValidatorFailure::invalid(format!(
                "provider has no enabled {category} options"
            )));
        }

        for option in &options {
            // An option value that cannot be represented simply never matches.
            if let Ok(Some(candidate)) = StandardValue::from_json(&option.value) {
                if candidate.deep_eq(value) {
                    debug!("{}: matched {} option {}", path, category, option.name);
                    return Ok(());
                }
            }
        }
        Err(ValidatorFailure::invalid(format!(
            "value does not match any enabled {category} option"
        )))
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::category(config).map(drop)
    }
}

// ── serviceReference ─────────────────────────────────────────────

/// Whose services a reference may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Origin {
    /// Same consumer as the referencing service.
    Consumer,
    /// Same service group as the referencing service.
    Group,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferenceConfig {
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default)]
    origin: Option<Origin>,
}

/// Restricts which services a `reference` property may point at.
///
/// Config: `{"types": ["vm", ...], "origin": "consumer" | "group"}`, both
/// optional; `null` leaves the reference unrestricted.
pub struct ServiceReferenceValidator;

impl ServiceReferenceValidator {
    pub const NAME: &'static str = "serviceReference";

    fn parse(config: &Value) -> Result<ReferenceConfig, String> {
        if config.is_null() {
            return Ok(ReferenceConfig::default());
        }
        let parsed: ReferenceConfig =
            serde_json::from_value(config.clone()).map_err(|e| e.to_string())?;
        if parsed.types.as_ref().is_some_and(Vec::is_empty) {
            return Err("types must not be empty".to_string());
        }
        Ok(parsed)
    }
}

impl Validator for ServiceReferenceValidator {
    fn validate(
        &self,
        ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let StandardValue::Reference(id) = value else {
            return Err(wrong_kind(Self::NAME, "reference"));
        };
        let config = Self::parse(config).map_err(|e| bad_config(Self::NAME, e))?;

        let Some(target) = ctx.store.find_service(id)? else {
            return Err(ValidatorFailure::invalid(format!("service not found: {id}")));
        };

        if let Some(types) = &config.types {
            let kind = ctx.store.find_service_type(&target.service_type_id)?;
            let Some(kind) = kind else {
                return Err(ValidatorFailure::invalid(format!(
                    "service type not found: {}",
                    target.service_type_id
                )));
            };
            if !types.iter().any(|t| *t == kind.name) {
                return Err(ValidatorFailure::invalid(format!(
                    "referenced service must be of type: {}",
                    types.join(", ")
                )));
            }
        }

        match config.origin {
            Some(Origin::Consumer) if target.consumer_id != ctx.service.consumer_id => Err(
                ValidatorFailure::invalid("referenced service must belong to the same consumer"),
            ),
            Some(Origin::Group) if target.group_id != ctx.service.group_id => Err(
                ValidatorFailure::invalid("referenced service must belong to the same group"),
            ),
            _ => Ok(()),
        }
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::parse(config).map(drop)
    }
}

// ── source ───────────────────────────────────────────────────────

/// Restricts who may originate a value.
///
/// Config: `"agent"` (only agents), `"system"` (nobody through this path)
/// or null (anyone).
pub struct SourceValidator;

impl SourceValidator {
    pub const NAME: &'static str = "source";

    fn parse(config: &Value) -> Result<Option<&str>, String> {
        match config {
            Value::Null => Ok(None),
            Value::String(s) if s == "agent" || s == "system" => Ok(Some(s.as_str())),
            other => Err(format!("expected \"agent\" or \"system\", got {other}")),
        }
    }
}

impl Validator for SourceValidator {
    fn validate(
        &self,
        ctx: &EngineContext<'_>,
        _path: &str,
        _value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let source = Self::parse(config).map_err(|e| bad_config(Self::NAME, e))?;
        match source {
            Some("system") => Err(ValidatorFailure::invalid(
                "property can only be set by the system",
            )),
            Some(_) if ctx.actor != ActorKind::Agent => Err(ValidatorFailure::invalid(
                "property can only be set by agent",
            )),
            _ => Ok(()),
        }
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::parse(config).map(drop)
    }
}

// ── mutable ──────────────────────────────────────────────────────

/// On update, the service must be in one of the listed states.
///
/// Config: non-empty list of state names. Creation is never restricted.
pub struct MutableValidator;

impl MutableValidator {
    pub const NAME: &'static str = "mutable";
}

impl Validator for MutableValidator {
    fn validate(
        &self,
        ctx: &EngineContext<'_>,
        _path: &str,
        _value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        if !ctx.is_update() {
            return Ok(());
        }
        let states = config_names(config).map_err(|e| bad_config(Self::NAME, e))?;
        let current = &ctx.service.current_state;
        if states.iter().any(|s| s == current) {
            return Ok(());
        }
        Err(ValidatorFailure::invalid(format!(
            "cannot update property in state {current}; allowed states: {}",
            states.join(", ")
        )))
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_names(config).map(drop)
    }
}
