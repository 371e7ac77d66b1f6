//! Schema type definitions
//!
//! - `FieldType`: the capability set of one field kind (convert, validate,
//!   export, mock)
//! - `Field`: a declared field, binding a kind to its metadata
//! - `Role`: named whitelist/blacklist for exports
//! - `Schema`: the immutable, compiled, ordered field set
//! - `SchemaLink`: reference from a field to a (possibly not yet compiled)
//!   sub-schema

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{SchemaError, SchemaResult};
use crate::context::{Context, OutputShape};
use crate::errors::{ErrorTree, MockError};
use crate::model::Model;
use crate::value::{Native, NativeMap};

/// Capability set of a field kind.
///
/// Implementations are pure: they never touch instance state and never
/// raise. Failures come back as values.
pub trait FieldType: fmt::Debug + Send + Sync {
    /// Short name used in diagnostics
    fn type_name(&self) -> &'static str;

    /// Coerces a raw value into the kind's native form.
    fn convert(&self, value: Native, ctx: &Context) -> Result<Native, ErrorTree>;

    /// Checks a converted value against the kind's constraints.
    fn validate(&self, value: &Native, ctx: &Context) -> Result<(), ErrorTree>;

    /// Projects a native value into the context's output shape.
    fn export(&self, value: &Native, ctx: &Context) -> Native {
        match ctx.shape() {
            OutputShape::Native => value.clone(),
            OutputShape::Primitive => value.to_primitive_in(ctx),
        }
    }

    /// Produces a value satisfying the kind's constraints.
    fn mock(&self, ctx: &Context) -> Result<Native, MockError>;

    /// Sub-schema this kind descends into, if any.
    fn model_schema(&self) -> Option<Arc<Schema>> {
        None
    }

    /// Returns true if the kind exports through nested traversals rather than
    /// a per-field converter.
    fn is_compound(&self) -> bool {
        false
    }
}

/// Per-field override of role filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPolicy {
    /// Follow the active role
    #[default]
    Default,
    /// Hidden from every export
    Never,
    /// Included in every export
    Always,
}

/// Factory producing a fresh default value.
pub type DefaultFactory = Arc<dyn Fn() -> Native + Send + Sync>;

/// Declared default of a field. Defaults pass through the field's
/// conversion before use.
#[derive(Clone)]
pub enum DefaultValue {
    /// Primitive value, converted on use
    Value(serde_json::Value),
    /// Called once per use
    Factory(DefaultFactory),
}

impl DefaultValue {
    pub fn produce(&self) -> Native {
        match self {
            DefaultValue::Value(value) => Native::from(value.clone()),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => write!(f, "Value({})", value),
            DefaultValue::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// A declared field
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: Arc<dyn FieldType>,
    required: bool,
    default: Option<DefaultValue>,
    order: usize,
    serialized_name: Option<String>,
    export_policy: ExportPolicy,
}

impl Field {
    /// Create an optional field of the given kind
    pub fn new(kind: impl FieldType + 'static) -> Self {
        Self {
            name: String::new(),
            kind: Arc::new(kind),
            required: false,
            default: None,
            order: 0,
            serialized_name: None,
            export_policy: ExportPolicy::Default,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Default taken from a primitive value
    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    /// Default produced by a factory on every use
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Native + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    /// External key used on export and accepted on input
    pub fn serialized_name(mut self, name: impl Into<String>) -> Self {
        self.serialized_name = Some(name.into());
        self
    }

    pub fn export_policy(mut self, policy: ExportPolicy) -> Self {
        self.export_policy = policy;
        self
    }

    pub(crate) fn bind(mut self, name: &str, order: usize) -> Self {
        self.name = name.to_string();
        self.order = order;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &dyn FieldType {
        self.kind.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Position in the compiled schema
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn serialized_as(&self) -> Option<&str> {
        self.serialized_name.as_deref()
    }

    /// Key this field is exported under
    pub fn output_key(&self) -> &str {
        self.serialized_name.as_deref().unwrap_or(&self.name)
    }

    pub fn policy(&self) -> ExportPolicy {
        self.export_policy
    }
}

/// Role filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMode {
    Whitelist,
    Blacklist,
}

/// Named export filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub mode: RoleMode,
    pub fields: BTreeSet<String>,
}

impl Role {
    /// Include only the named fields
    pub fn whitelist<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: RoleMode::Whitelist,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Include everything except the named fields
    pub fn blacklist<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: RoleMode::Blacklist,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn includes(&self, field: &str) -> bool {
        match self.mode {
            RoleMode::Whitelist => self.fields.contains(field),
            RoleMode::Blacklist => !self.fields.contains(field),
        }
    }
}

/// Data handed to custom validators
pub struct ValidationScope<'a> {
    /// Values accepted so far in this traversal
    pub data: &'a NativeMap,
    pub context: &'a Context,
}

/// Failure raised by a custom field validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    /// Reported under the field's key
    Field(String),
    /// Reported as an instance-level failure
    Instance(String),
}

/// Custom check on one field, run after the field's own validation.
pub type FieldValidator =
    Arc<dyn Fn(&Native, &ValidationScope<'_>) -> Result<(), ValidatorError> + Send + Sync>;

/// Cross-field check, run on the accumulated result.
pub type InstanceValidator = Arc<dyn Fn(&ValidationScope<'_>) -> Result<(), String> + Send + Sync>;

/// Computed export-only member.
pub type Serializer = Arc<dyn Fn(&Model) -> Native + Send + Sync>;

/// Short description of an instance for `Display`.
pub type ReprInfo = Arc<dyn Fn(&Model) -> Option<String> + Send + Sync>;

/// Schema-wide options
#[derive(Clone)]
pub struct SchemaOptions {
    pub roles: BTreeMap<String, Role>,
    /// Role applied when an export names no role, or one this schema lacks
    pub default_role: Option<String>,
    /// Export fields whose value is null
    pub serialize_when_none: bool,
    /// Run instance validators even after field failures
    pub instance_validators_on_error: bool,
    pub repr_info: Option<ReprInfo>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            roles: BTreeMap::new(),
            default_role: None,
            serialize_when_none: true,
            instance_validators_on_error: false,
            repr_info: None,
        }
    }
}

impl fmt::Debug for SchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaOptions")
            .field("roles", &self.roles)
            .field("default_role", &self.default_role)
            .field("serialize_when_none", &self.serialize_when_none)
            .field("instance_validators_on_error", &self.instance_validators_on_error)
            .finish()
    }
}

/// Compiled schema
///
/// Immutable once compiled; share it behind an `Arc`.
pub struct Schema {
    id: Uuid,
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    validators: HashMap<String, FieldValidator>,
    instance_validators: Vec<(String, InstanceValidator)>,
    serializables: Vec<(String, Serializer)>,
    options: SchemaOptions,
}

impl Schema {
    pub(crate) fn assemble(
        name: String,
        fields: Vec<Field>,
        validators: HashMap<String, FieldValidator>,
        instance_validators: Vec<(String, InstanceValidator)>,
        serializables: Vec<(String, Serializer)>,
        options: SchemaOptions,
    ) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name().to_string(), i))
            .collect();
        Self {
            id: Uuid::new_v4(),
            name,
            fields,
            index,
            validators,
            instance_validators,
            serializables,
            options,
        }
    }

    /// Identity used for cycle detection
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> + Clone {
        self.fields.iter()
    }

    pub fn field_at(&self, slot: usize) -> Option<&Field> {
        self.fields.get(slot)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn validator(&self, field: &str) -> Option<&FieldValidator> {
        self.validators.get(field)
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    pub(crate) fn validators_by_field(&self) -> &HashMap<String, FieldValidator> {
        &self.validators
    }

    pub fn instance_validators(&self) -> impl Iterator<Item = (&str, &InstanceValidator)> {
        self.instance_validators.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn serializables(&self) -> impl Iterator<Item = (&str, &Serializer)> {
        self.serializables.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn serializable(&self, name: &str) -> Option<&Serializer> {
        self.serializables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.options.roles.get(name)
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Returns true if `key` may appear in raw input for this schema.
    pub fn accepts_input_key(&self, key: &str, ctx: &Context) -> bool {
        if self.has_field(key) {
            return true;
        }
        self.fields.iter().any(|field| {
            field.serialized_as() == Some(key)
                || ctx.aliases(field.name()).iter().any(|alias| alias == key)
        })
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.field_names())
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Clone)]
enum LinkTarget {
    Bound(Arc<Schema>),
    Deferred(Arc<OnceLock<Weak<Schema>>>),
}

/// Reference from a field to a sub-schema.
///
/// A deferred link is declared before its target exists and bound after
/// compilation, which is how a schema refers to itself or to a schema that
/// refers back to it. Deferred links hold weak references: the target must
/// be kept alive by its owner.
#[derive(Clone)]
pub struct SchemaLink {
    name: String,
    target: LinkTarget,
}

impl SchemaLink {
    /// Link to an already compiled schema
    pub fn to(schema: &Arc<Schema>) -> Self {
        Self {
            name: schema.name().to_string(),
            target: LinkTarget::Bound(Arc::clone(schema)),
        }
    }

    /// Link to be bound later
    pub fn deferred(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: LinkTarget::Deferred(Arc::new(OnceLock::new())),
        }
    }

    /// Binds a deferred link. Every clone of the link observes the binding.
    pub fn bind(&self, schema: &Arc<Schema>) -> SchemaResult<()> {
        match &self.target {
            LinkTarget::Bound(_) => Err(SchemaError::link_already_bound(&self.name)),
            LinkTarget::Deferred(slot) => slot
                .set(Arc::downgrade(schema))
                .map_err(|_| SchemaError::link_already_bound(&self.name)),
        }
    }

    pub fn resolve(&self) -> Option<Arc<Schema>> {
        match &self.target {
            LinkTarget::Bound(schema) => Some(Arc::clone(schema)),
            LinkTarget::Deferred(slot) => slot.get().and_then(Weak::upgrade),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SchemaLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.target {
            LinkTarget::Bound(_) => "bound",
            LinkTarget::Deferred(slot) if slot.get().is_some() => "bound",
            LinkTarget::Deferred(_) => "unbound",
        };
        write!(f, "SchemaLink({}, {})", self.name, state)
    }
}
