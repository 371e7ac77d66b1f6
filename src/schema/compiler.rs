//! Schema compilation
//!
//! A `Declaration` lists the fields, validators, roles and options a schema
//! declares locally, plus the schemas it extends. `compile` merges them into
//! an immutable `Schema`:
//!
//! 1. Parents are merged in the order given, later parents overriding
//!    same-named entries of earlier ones.
//! 2. Local declarations are merged last.
//! 3. An overriding field keeps the slot of the field it replaces.
//!
//! Every inconsistency is reported here, before any instance exists.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::{
    Field, FieldValidator, InstanceValidator, ReprInfo, Role, Schema, SchemaOptions, Serializer,
    ValidationScope, ValidatorError,
};
use crate::model::Model;
use crate::observability::{Event, Logger};
use crate::value::Native;

/// Prefix that marks a custom field validator
pub const VALIDATOR_PREFIX: &str = "validate_";

/// Builder describing one schema declaration
pub struct Declaration {
    name: String,
    parents: Vec<Arc<Schema>>,
    fields: Vec<(String, Field)>,
    validators: Vec<(String, FieldValidator)>,
    instance_validators: Vec<(String, InstanceValidator)>,
    serializables: Vec<(String, Serializer)>,
    roles: Vec<(String, Role)>,
    default_role: Option<String>,
    serialize_when_none: Option<bool>,
    instance_validators_on_error: Option<bool>,
    repr_info: Option<ReprInfo>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            validators: Vec::new(),
            instance_validators: Vec::new(),
            serializables: Vec::new(),
            roles: Vec::new(),
            default_role: None,
            serialize_when_none: None,
            instance_validators_on_error: None,
            repr_info: None,
        }
    }

    /// Inherit from `parent`. Parents listed later override earlier ones.
    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Register a custom validator named `validate_<field>`.
    pub fn validator<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Native, &ValidationScope<'_>) -> Result<(), ValidatorError> + Send + Sync + 'static,
    {
        self.validators.push((name.into(), Arc::new(check)));
        self
    }

    /// Register a cross-field validator.
    pub fn instance_validator<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ValidationScope<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.instance_validators.push((name.into(), Arc::new(check)));
        self
    }

    /// Register a computed, export-only member.
    pub fn serializable<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Model) -> Native + Send + Sync + 'static,
    {
        self.serializables.push((name.into(), Arc::new(compute)));
        self
    }

    pub fn role(mut self, name: impl Into<String>, role: Role) -> Self {
        self.roles.push((name.into(), role));
        self
    }

    pub fn default_role(mut self, name: impl Into<String>) -> Self {
        self.default_role = Some(name.into());
        self
    }

    pub fn serialize_when_none(mut self, enabled: bool) -> Self {
        self.serialize_when_none = Some(enabled);
        self
    }

    pub fn instance_validators_on_error(mut self, enabled: bool) -> Self {
        self.instance_validators_on_error = Some(enabled);
        self
    }

    pub fn repr_info<F>(mut self, info: F) -> Self
    where
        F: Fn(&Model) -> Option<String> + Send + Sync + 'static,
    {
        self.repr_info = Some(Arc::new(info));
        self
    }

    /// Compile into an immutable schema
    pub fn compile(self) -> SchemaResult<Arc<Schema>> {
        compile(self)
    }
}

/// Ordered field accumulator with override-in-place semantics.
#[derive(Default)]
struct FieldSlots {
    fields: Vec<Field>,
    slots: HashMap<String, usize>,
}

impl FieldSlots {
    fn upsert(&mut self, name: &str, field: Field) {
        match self.slots.get(name) {
            Some(&slot) => self.fields[slot] = field.bind(name, slot),
            None => {
                let slot = self.fields.len();
                self.slots.insert(name.to_string(), slot);
                self.fields.push(field.bind(name, slot));
            }
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }
}

/// Replaces a same-named entry in place or appends.
fn upsert_named<T>(entries: &mut Vec<(String, T)>, name: &str, value: T) {
    match entries.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => entry.1 = value,
        None => entries.push((name.to_string(), value)),
    }
}

/// Merges a declaration and its parents into a schema.
pub fn compile(declaration: Declaration) -> SchemaResult<Arc<Schema>> {
    let name = declaration.name.clone();
    match merge(declaration) {
        Ok(schema) => {
            Logger::trace(
                Event::SchemaCompiled,
                &[
                    ("fields", &schema.field_count().to_string()),
                    ("schema", schema.name()),
                ],
            );
            Ok(Arc::new(schema))
        }
        Err(err) => {
            Logger::error(
                Event::SchemaCompileFailed,
                &[("code", err.code().code()), ("schema", &name)],
            );
            Err(err)
        }
    }
}

fn merge(declaration: Declaration) -> SchemaResult<Schema> {
    let Declaration {
        name,
        parents,
        fields: local_fields,
        validators: local_validators,
        instance_validators: local_instance_validators,
        serializables: local_serializables,
        roles: local_roles,
        default_role,
        serialize_when_none,
        instance_validators_on_error,
        repr_info,
    } = declaration;

    if name.is_empty() {
        return Err(SchemaError::empty_name("<anonymous>", "Schema"));
    }

    let mut fields = FieldSlots::default();
    let mut validators: HashMap<String, FieldValidator> = HashMap::new();
    let mut instance_validators: Vec<(String, InstanceValidator)> = Vec::new();
    let mut serializables: Vec<(String, Serializer)> = Vec::new();
    let mut options = SchemaOptions::default();

    for parent in &parents {
        for field in parent.fields() {
            fields.upsert(field.name(), field.clone());
        }
        for (target, validator) in parent.validators_by_field() {
            validators.insert(target.to_string(), Arc::clone(validator));
        }
        for (n, validator) in parent.instance_validators() {
            upsert_named(&mut instance_validators, n, Arc::clone(validator));
        }
        for (n, serializer) in parent.serializables() {
            upsert_named(&mut serializables, n, Arc::clone(serializer));
        }
        let inherited = parent.options();
        options.roles.extend(inherited.roles.clone());
        options.default_role = inherited.default_role.clone().or(options.default_role);
        options.serialize_when_none = inherited.serialize_when_none;
        options.instance_validators_on_error = inherited.instance_validators_on_error;
        options.repr_info = inherited.repr_info.clone().or(options.repr_info);
    }

    let mut seen = HashSet::new();
    for (field_name, field) in local_fields {
        if field_name.is_empty() {
            return Err(SchemaError::empty_name(&name, "Field"));
        }
        if !seen.insert(field_name.clone()) {
            return Err(SchemaError::duplicate_field(&name, &field_name));
        }
        fields.upsert(&field_name, field);
    }

    for (member, serializer) in local_serializables {
        if member.is_empty() {
            return Err(SchemaError::empty_name(&name, "Serializable"));
        }
        if fields.contains(&member) || !seen.insert(member.clone()) {
            return Err(SchemaError::duplicate_field(&name, &member));
        }
        upsert_named(&mut serializables, &member, serializer);
    }

    let mut seen_validators = HashSet::new();
    for (validator_name, validator) in local_validators {
        let target = validator_name
            .strip_prefix(VALIDATOR_PREFIX)
            .filter(|target| !target.is_empty())
            .ok_or_else(|| SchemaError::malformed_validator(&name, &validator_name))?;
        if !seen_validators.insert(validator_name.clone()) {
            return Err(SchemaError::duplicate_validator(&name, &validator_name));
        }
        if !fields.contains(target) {
            return Err(SchemaError::unknown_validator_field(&name, &validator_name, target));
        }
        validators.insert(target.to_string(), validator);
    }

    for (validator_name, validator) in local_instance_validators {
        if !seen_validators.insert(validator_name.clone()) {
            return Err(SchemaError::duplicate_validator(&name, &validator_name));
        }
        upsert_named(&mut instance_validators, &validator_name, validator);
    }

    let mut local_role_names = HashSet::new();
    let mut roles: BTreeMap<String, Role> = options.roles;
    for (role_name, role) in local_roles {
        if role_name.is_empty() {
            return Err(SchemaError::empty_name(&name, "Role"));
        }
        if !local_role_names.insert(role_name.clone()) {
            return Err(SchemaError::duplicate_role(&name, &role_name));
        }
        roles.insert(role_name, role);
    }
    for (role_name, role) in &roles {
        for member in &role.fields {
            let known = fields.contains(member) || serializables.iter().any(|(n, _)| n == member);
            if !known {
                return Err(SchemaError::unknown_role_field(&name, role_name, member));
            }
        }
    }
    options.roles = roles;

    if let Some(role) = default_role {
        options.default_role = Some(role);
    }
    if let Some(role) = &options.default_role {
        if !options.roles.contains_key(role) {
            return Err(SchemaError::unknown_default_role(&name, role));
        }
    }
    if let Some(enabled) = serialize_when_none {
        options.serialize_when_none = enabled;
    }
    if let Some(enabled) = instance_validators_on_error {
        options.instance_validators_on_error = enabled;
    }
    if repr_info.is_some() {
        options.repr_info = repr_info;
    }

    Ok(Schema::assemble(
        name,
        fields.fields,
        validators,
        instance_validators,
        serializables,
        options,
    ))
}
