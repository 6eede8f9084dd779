//! Schema descriptors
//!
//! A [`SchemaDescriptor`] is the static description of one custom resource
//! collection that must exist before a controller may watch it. Descriptors
//! are built explicitly at startup and handed to the bootstrap registrar.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{CustomResourceExt, Resource};
use std::fmt;

/// Static definition of a custom resource collection.
#[derive(Clone)]
pub struct SchemaDescriptor {
    /// Kind name (e.g. `ServiceBroker`)
    pub kind: String,
    /// Collection name (e.g. `servicebrokers`)
    pub plural: String,
    /// API group (e.g. `catalog.microscaler.io`)
    pub group: String,
    /// API version (e.g. `v1alpha1`)
    pub version: String,
    /// Human readable description, stored as an annotation on the definition
    pub description: String,
    definition: fn() -> CustomResourceDefinition,
}

impl SchemaDescriptor {
    /// Describe a derived custom resource type.
    pub fn of<K>(description: impl Into<String>) -> Self
    where
        K: CustomResourceExt + Resource<DynamicType = ()>,
    {
        Self {
            kind: K::kind(&()).into_owned(),
            plural: K::plural(&()).into_owned(),
            group: K::group(&()).into_owned(),
            version: K::version(&()).into_owned(),
            description: description.into(),
            definition: K::crd,
        }
    }

    /// Globally qualified name, `<plural>.<group>`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.plural, self.group)
    }

    /// Annotation key carrying the description on the created definition.
    pub fn description_annotation(&self) -> String {
        format!("{}/description", self.group)
    }

    /// Build the definition object to submit to the API server.
    pub fn definition(&self) -> CustomResourceDefinition {
        let mut crd = (self.definition)();
        crd.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(self.description_annotation(), self.description.clone());
        crd
    }
}

impl fmt::Debug for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("kind", &self.kind)
            .field("plural", &self.plural)
            .field("group", &self.group)
            .field("version", &self.version)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SchemaDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.plural == other.plural
            && self.group == other.group
            && self.version == other.version
            && self.description == other.description
    }
}

impl Eq for SchemaDescriptor {}
