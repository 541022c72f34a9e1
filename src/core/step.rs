//! Step models - raw (shape) form and decoded form

use crate::core::context::EvalContext;
use crate::core::expr::render_scalar;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

const USE_KEY: &str = "use";
const WORKSPACE_KEY: &str = "workspace";
const LABEL_KEY: &str = "label";

/// Reference to the capability (plugin) a step invokes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Use {
    /// Capability type name, e.g. `docker`
    pub type_: String,

    /// Remaining keys of a mapping form, passed through untouched
    pub options: Mapping,
}

impl Use {
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            options: Mapping::new(),
        }
    }
}

impl TryFrom<Value> for Use {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(type_) if !type_.trim().is_empty() => Ok(Use::new(type_)),
            Value::Mapping(mut options) => {
                let type_ = options
                    .remove("type")
                    .and_then(|t| t.as_str().map(str::to_string))
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| "use requires a non-empty string 'type'".to_string())?;
                Ok(Use { type_, options })
            }
            _ => Err("use must be a capability name or a mapping with 'type'".to_string()),
        }
    }
}

impl From<Use> for Value {
    fn from(use_: Use) -> Self {
        if use_.options.is_empty() {
            return Value::String(use_.type_);
        }
        let mut mapping = Mapping::new();
        mapping.insert(Value::from("type"), Value::String(use_.type_));
        mapping.extend(use_.options);
        Value::Mapping(mapping)
    }
}

/// An undecoded step body plus its shape-level capability reference
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Mapping")]
pub struct StepBody {
    pub use_: Use,
    pub body: Mapping,
}

impl TryFrom<Mapping> for StepBody {
    type Error = String;

    fn try_from(body: Mapping) -> Result<Self, Self::Error> {
        let raw_use = body
            .get(USE_KEY)
            .cloned()
            .ok_or_else(|| "step body is missing 'use'".to_string())?;
        let use_ = Use::try_from(raw_use)?;
        Ok(StepBody { use_, body })
    }
}

/// Override body selected when the active workspace equals `name`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceScope {
    pub name: String,
    pub step: StepBody,
}

/// Override body selected when `selector` matches the active labels
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelScope {
    pub selector: String,
    pub step: StepBody,
}

/// A step as declared in the document, before any evaluation
///
/// The `workspace` and `label` keys are split off into scoping rules; every
/// other key stays in the base body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Mapping")]
pub struct RawStep {
    pub base: StepBody,
    pub workspace_scoped: Vec<WorkspaceScope>,
    pub label_scoped: Vec<LabelScope>,
}

impl RawStep {
    /// Base body, used when no scoping rule matches
    pub fn body(&self) -> &Mapping {
        &self.base.body
    }

    pub fn has_scopes(&self) -> bool {
        !self.workspace_scoped.is_empty() || !self.label_scoped.is_empty()
    }
}

impl TryFrom<Mapping> for RawStep {
    type Error = String;

    fn try_from(mut body: Mapping) -> Result<Self, Self::Error> {
        let workspace_scoped = match body.remove(WORKSPACE_KEY) {
            Some(value) => serde_yaml::from_value(value)
                .map_err(|e| format!("invalid 'workspace' scopes: {}", e))?,
            None => Vec::new(),
        };
        let label_scoped = match body.remove(LABEL_KEY) {
            Some(value) => {
                serde_yaml::from_value(value).map_err(|e| format!("invalid 'label' scopes: {}", e))?
            }
            None => Vec::new(),
        };

        Ok(RawStep {
            base: StepBody::try_from(body)?,
            workspace_scoped,
            label_scoped,
        })
    }
}

/// A fully decoded step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Human-readable step name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Capability this step invokes
    #[serde(rename = "use")]
    pub use_: Use,

    /// Container image to run the capability in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Command override for the capability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Names of steps that must finish first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Labels declared on the step, scalar values rendered as strings
    #[serde(
        default,
        deserialize_with = "deserialize_labels",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,

    /// Context the step was decoded with (not serialized)
    #[serde(skip)]
    pub(crate) context: EvalContext,
}

impl Step {
    /// Capability type name
    pub fn capability(&self) -> &str {
        &self.use_.type_
    }

    /// Context used to decode this step
    pub fn context(&self) -> &EvalContext {
        &self.context
    }
}

fn deserialize_labels<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| {
            render_scalar(&value)
                .map(|value| (key.clone(), value))
                .map_err(|e| D::Error::custom(format!("label '{}': {}", key, e)))
        })
        .collect()
}
