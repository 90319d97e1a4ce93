//! Per-column feature metadata.

use indexmap::IndexMap;

use crate::error::{Error, ErrorId};
use crate::value::DataType;

/// Statistical kind of a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Real-valued measurement.
    Continuous,
    /// Unordered category code.
    Categorical,
    /// Ordered category code.
    Ordinal,
}

/// Description of one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureInfo {
    /// Storage type of the column.
    pub data_type: DataType,
    /// Statistical kind.
    pub kind: FeatureKind,
    /// Optional name, unique within a dictionary.
    pub name: Option<String>,
}

impl FeatureInfo {
    /// An unnamed continuous feature of the given type.
    pub fn continuous(data_type: DataType) -> Self {
        Self {
            data_type,
            kind: FeatureKind::Continuous,
            name: None,
        }
    }

    /// Set the feature name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the feature kind.
    pub fn with_kind(mut self, kind: FeatureKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Column metadata of a table, with name lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    features: Vec<FeatureInfo>,
    by_name: IndexMap<String, usize>,
}

impl Dictionary {
    /// `n_cols` unnamed continuous features of one type.
    pub fn homogeneous(n_cols: usize, data_type: DataType) -> Self {
        Self {
            features: vec![FeatureInfo::continuous(data_type); n_cols],
            by_name: IndexMap::new(),
        }
    }

    /// Build from explicit features.
    ///
    /// Fails with [`ErrorId::IncorrectParameter`] on a duplicate name.
    pub fn from_features(features: Vec<FeatureInfo>) -> Result<Self, Error> {
        let mut by_name = IndexMap::new();
        for (i, f) in features.iter().enumerate() {
            if let Some(name) = &f.name {
                if by_name.insert(name.clone(), i).is_some() {
                    return Err(Error::new(ErrorId::IncorrectParameter)
                        .with_column(i)
                        .with_message(format!("duplicate feature name '{name}'")));
                }
            }
        }
        Ok(Self { features, by_name })
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Feature at a column index.
    pub fn get(&self, col: usize) -> Option<&FeatureInfo> {
        self.features.get(col)
    }

    /// Column index of a named feature.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// All features in column order.
    pub fn features(&self) -> &[FeatureInfo] {
        &self.features
    }

    /// The shared data type when every column has the same type.
    pub fn common_data_type(&self) -> Option<DataType> {
        let first = self.features.first()?.data_type;
        self.features
            .iter()
            .all(|f| f.data_type == first)
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_has_common_type() {
        let d = Dictionary::homogeneous(3, DataType::F32);
        assert_eq!(d.len(), 3);
        assert_eq!(d.common_data_type(), Some(DataType::F32));
    }

    #[test]
    fn mixed_has_no_common_type() {
        let d = Dictionary::from_features(vec![
            FeatureInfo::continuous(DataType::F64).named("x"),
            FeatureInfo::continuous(DataType::I32)
                .named("label")
                .with_kind(FeatureKind::Categorical),
        ])
        .unwrap();
        assert_eq!(d.common_data_type(), None);
        assert_eq!(d.index_of("label"), Some(1));
        assert_eq!(d.index_of("missing"), None);
        assert_eq!(d.get(1).unwrap().kind, FeatureKind::Categorical);
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = Dictionary::from_features(vec![
            FeatureInfo::continuous(DataType::F64).named("x"),
            FeatureInfo::continuous(DataType::F64).named("x"),
        ])
        .unwrap_err();
        assert_eq!(err.id(), ErrorId::IncorrectParameter);
    }

    #[test]
    fn empty_dictionary() {
        let d = Dictionary::default();
        assert!(d.is_empty());
        assert_eq!(d.common_data_type(), None);
    }
}
