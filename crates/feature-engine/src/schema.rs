//! Feature Vector Schema
//!
//! An ordered table of (group, fields) pairs that fixes the concatenation
//! order of the model input vector and its length.

use crate::error::FeatureError;
use crate::features::{FeatureExtractor, FeatureGroup, FeatureGroups};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::warn;

/// Length of the primary model input vector
pub const FEATURE_DIMENSION: usize = 119;

/// Group order of the primary schema
const PRIMARY_ORDER: [FeatureGroup; 5] = [
    FeatureGroup::Common,
    FeatureGroup::Bearing,
    FeatureGroup::Eccentricity,
    FeatureGroup::Rotor,
    FeatureGroup::Stator,
];

/// Ordered (group, fields) table with a declared target length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    groups: Vec<(FeatureGroup, Vec<String>)>,
    target_len: usize,
}

impl FeatureSchema {
    pub fn new(groups: Vec<(FeatureGroup, Vec<String>)>, target_len: usize) -> Self {
        Self { groups, target_len }
    }

    /// The 119-feature schema: common, bearing, eccentricity, rotor, stator
    pub fn primary() -> Self {
        let groups = PRIMARY_ORDER
            .iter()
            .map(|g| (*g, g.fields().iter().map(|f| f.to_string()).collect()))
            .collect();
        Self::new(groups, FEATURE_DIMENSION)
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn groups(&self) -> &[(FeatureGroup, Vec<String>)] {
        &self.groups
    }

    /// Number of fields the table names
    pub fn field_count(&self) -> usize {
        self.groups.iter().map(|(_, fields)| fields.len()).sum()
    }

    /// Position of a group's fields within the flattened vector
    pub fn group_range(&self, group: FeatureGroup) -> Option<Range<usize>> {
        let mut offset = 0;
        for (g, fields) in &self.groups {
            if *g == group {
                return Some(offset..offset + fields.len());
            }
            offset += fields.len();
        }
        None
    }

    /// Check the table against the extractor's declared output. Run once at
    /// startup; a schema that passes here never names a field the extractor
    /// does not produce.
    pub fn validate_against(&self, extractor: &FeatureExtractor) -> Result<(), FeatureError> {
        let declared = extractor.declared_fields();
        for (group, fields) in &self.groups {
            let produced: BTreeSet<&str> = declared
                .iter()
                .filter(|(g, _)| g == group)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            if let Some(missing) = fields.iter().find(|f| !produced.contains(f.as_str())) {
                return Err(FeatureError::UndeclaredField {
                    group: group.name(),
                    field: missing.clone(),
                });
            }
        }
        if self.field_count() != self.target_len {
            return Err(FeatureError::SchemaMismatch {
                expected: self.target_len,
                actual: self.field_count(),
            });
        }
        Ok(())
    }

    /// Flatten in schema order, skipping absent fields
    pub fn flatten(&self, features: &FeatureGroups) -> Vec<f64> {
        let mut vector = Vec::with_capacity(self.target_len);
        for (group, fields) in &self.groups {
            let values = features.group(*group);
            vector.extend(fields.iter().filter_map(|f| values.get(f).copied()));
        }
        vector
    }

    /// Flatten and enforce the target length
    pub fn assemble(&self, features: &FeatureGroups) -> Result<Vec<f64>, FeatureError> {
        let vector = self.flatten(features);
        if vector.len() != self.target_len {
            warn!(
                "Invalid feature vector length: {}, expected {}",
                vector.len(),
                self.target_len
            );
            return Err(FeatureError::SchemaMismatch {
                expected: self.target_len,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// Inverse of `assemble`
    pub fn split(&self, vector: &[f64]) -> Result<FeatureGroups, FeatureError> {
        if vector.len() != self.field_count() {
            return Err(FeatureError::SchemaMismatch {
                expected: self.field_count(),
                actual: vector.len(),
            });
        }
        let mut groups = FeatureGroups::default();
        let mut values = vector.iter();
        for (group, fields) in &self.groups {
            let target = groups.group_mut(*group);
            for (field, value) in fields.iter().zip(values.by_ref()) {
                target.insert(field.clone(), *value);
            }
        }
        Ok(groups)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::primary()
    }
}
