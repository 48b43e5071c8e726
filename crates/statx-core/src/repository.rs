use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::Key;
use crate::refs::ResourceRef;
use crate::temporal::TimeInterval;

/// Requested response granularity for data queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDetail {
    /// Observations and metadata.
    Full,
    /// Observations without series metadata.
    DataOnly,
    /// Series keys only, no observations or metadata.
    SeriesKeysOnly,
    /// Series keys and metadata, no observations.
    NoData,
}

impl DataDetail {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::DataOnly => "dataonly",
            Self::SeriesKeysOnly => "serieskeysonly",
            Self::NoData => "nodata",
        }
    }

    pub const fn wants_observations(self) -> bool {
        matches!(self, Self::Full | Self::DataOnly)
    }

    pub const fn wants_metadata(self) -> bool {
        matches!(self, Self::Full | Self::NoData)
    }
}

/// Key plus detail level: the logical data request a caller hands to a
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuery {
    pub key: Key,
    pub detail: DataDetail,
}

impl DataQuery {
    pub const fn new(key: Key, detail: DataDetail) -> Self {
        Self { key, detail }
    }

    /// Everything, fully detailed.
    pub fn all() -> Self {
        Self::new(Key::all(), DataDetail::Full)
    }
}

/// A named, versioned dataset definition referencing its structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataflow {
    pub ref_: ResourceRef,
    pub structure_ref: ResourceRef,
    pub name: String,
}

impl Dataflow {
    pub const fn new(ref_: ResourceRef, structure_ref: ResourceRef, name: String) -> Self {
        Self {
            ref_,
            structure_ref,
            name,
        }
    }
}

/// One dimension of a structure, ordered by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub position: usize,
    pub name: String,
    /// Code id to label, when the dimension is coded.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub codes: BTreeMap<String, String>,
}

/// A non-dimension component attached to series or observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub name: String,
}

/// The dimension/attribute/measure schema a flow's series conform to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStructure {
    pub ref_: ResourceRef,
    pub name: String,
    pub time_dimension_id: String,
    pub primary_measure_id: String,
    pub dimensions: Vec<Dimension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl DataStructure {
    /// Dimension ids in position order, the input to a
    /// [`KeyBuilder`](crate::key::KeyBuilder).
    pub fn dimension_ids(&self) -> Vec<&str> {
        self.dimensions
            .iter()
            .map(|dimension| dimension.id.as_str())
            .collect()
    }
}

/// A list of codes identified by a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codelist {
    pub ref_: ResourceRef,
    pub codes: BTreeMap<String, String>,
}

/// One observation. A missing value is `None`, never a NaN sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    pub period: TimeInterval,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Obs {
    pub const fn new(period: TimeInterval, value: Option<f64>) -> Self {
        Self {
            period,
            value,
            meta: BTreeMap::new(),
        }
    }
}

/// One series: a fully specified key, series-level metadata, and its
/// observations in the order they were parsed from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub key: Key,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    pub obs: Vec<Obs>,
}

impl Series {
    pub const fn new(key: Key, meta: BTreeMap<String, String>, obs: Vec<Obs>) -> Self {
        Self { key, meta, obs }
    }
}

/// The series fetched for one flow, scoped by the key the fetch used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub flow_ref: ResourceRef,
    /// Scope of the fetch; series outside it were never requested.
    pub key: Key,
    pub series: Vec<Series>,
}

impl DataSet {
    pub const fn new(flow_ref: ResourceRef, key: Key, series: Vec<Series>) -> Self {
        Self {
            flow_ref,
            key,
            series,
        }
    }

    /// Selects series whose key is contained by the query key, shaped to
    /// the query's detail level.
    pub fn query(&self, query: &DataQuery) -> Vec<Series> {
        self.series
            .iter()
            .filter(|series| query.key.contains(&series.key))
            .map(|series| shape(series, query.detail))
            .collect()
    }
}

fn shape(series: &Series, detail: DataDetail) -> Series {
    Series {
        key: series.key.clone(),
        meta: if detail.wants_metadata() {
            series.meta.clone()
        } else {
            BTreeMap::new()
        },
        obs: if detail.wants_observations() {
            series.obs.clone()
        } else {
            Vec::new()
        },
    }
}

/// Immutable snapshot of flows, structures, and per-flow series sets for
/// one source.
///
/// Built once by a driver from a parsed response or loaded from cache, and
/// never mutated afterwards; refinements go through [`DataRepository::to_builder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRepository {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Dataflow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structures: Vec<DataStructure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sets: Vec<DataSet>,
}

impl DataRepository {
    pub fn builder(name: impl Into<String>) -> DataRepositoryBuilder {
        DataRepositoryBuilder {
            name: name.into(),
            flows: Vec::new(),
            structures: Vec::new(),
            data_sets: Vec::new(),
        }
    }

    /// Copies this snapshot into a builder so a dialect fix can produce a
    /// refined repository without mutating the original.
    pub fn to_builder(&self) -> DataRepositoryBuilder {
        DataRepositoryBuilder {
            name: self.name.clone(),
            flows: self.flows.clone(),
            structures: self.structures.clone(),
            data_sets: self.data_sets.clone(),
        }
    }

    /// First flow whose reference is contained by `ref_`; a miss is an
    /// empty result, not an error.
    pub fn flow(&self, ref_: &ResourceRef) -> Option<&Dataflow> {
        self.flows.iter().find(|flow| ref_.contains(&flow.ref_))
    }

    pub fn structure(&self, ref_: &ResourceRef) -> Option<&DataStructure> {
        self.structures
            .iter()
            .find(|structure| ref_.contains(&structure.ref_))
    }

    pub fn data_set(&self, flow_ref: &ResourceRef) -> Option<&DataSet> {
        self.data_sets
            .iter()
            .find(|data_set| flow_ref.contains(&data_set.flow_ref))
    }
}

/// Assembles a [`DataRepository`].
#[derive(Debug, Clone)]
pub struct DataRepositoryBuilder {
    name: String,
    flows: Vec<Dataflow>,
    structures: Vec<DataStructure>,
    data_sets: Vec<DataSet>,
}

impl DataRepositoryBuilder {
    pub fn flow(mut self, flow: Dataflow) -> Self {
        self.flows.push(flow);
        self
    }

    pub fn flows(mut self, flows: impl IntoIterator<Item = Dataflow>) -> Self {
        self.flows.extend(flows);
        self
    }

    pub fn structure(mut self, structure: DataStructure) -> Self {
        self.structures.push(structure);
        self
    }

    pub fn data_set(mut self, data_set: DataSet) -> Self {
        self.data_sets.push(data_set);
        self
    }

    pub fn build(self) -> DataRepository {
        DataRepository {
            name: self.name,
            flows: self.flows,
            structures: self.structures,
            data_sets: self.data_sets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::Duration;
    use time::macros::datetime;

    fn obs(year: i32, value: f64) -> Obs {
        Obs::new(
            TimeInterval::new(
                datetime!(2010-01-01 00:00).replace_year(year).expect("year in range"),
                Duration::parse("P1Y").expect("must parse"),
            ),
            Some(value),
        )
    }

    fn sample_set() -> DataSet {
        let mut meta = BTreeMap::new();
        meta.insert("UNIT".to_owned(), "PC".to_owned());

        DataSet::new(
            ResourceRef::parse("ECB,EXR,1.0").expect("must parse"),
            Key::all(),
            vec![
                Series::new(Key::of(["A", "USD"]), meta.clone(), vec![obs(2010, 1.32)]),
                Series::new(Key::of(["A", "JPY"]), meta, vec![obs(2010, 116.5)]),
            ],
        )
    }

    #[test]
    fn query_filters_by_key_containment() {
        let set = sample_set();
        let query = DataQuery::new(Key::parse("A.USD"), DataDetail::Full);
        let selected = set.query(&query);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key.to_string(), "A.USD");
        assert_eq!(selected[0].obs.len(), 1);
    }

    #[test]
    fn series_keys_only_strips_obs_and_meta() {
        let set = sample_set();
        let query = DataQuery::new(Key::all(), DataDetail::SeriesKeysOnly);
        let selected = set.query(&query);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|series| series.obs.is_empty()));
        assert!(selected.iter().all(|series| series.meta.is_empty()));
    }

    #[test]
    fn no_data_keeps_meta_and_drops_obs() {
        let set = sample_set();
        let selected = set.query(&DataQuery::new(Key::all(), DataDetail::NoData));
        assert!(selected.iter().all(|series| series.obs.is_empty()));
        assert!(selected.iter().all(|series| !series.meta.is_empty()));

        let selected = set.query(&DataQuery::new(Key::all(), DataDetail::DataOnly));
        assert!(selected.iter().all(|series| !series.obs.is_empty()));
        assert!(selected.iter().all(|series| series.meta.is_empty()));
    }

    #[test]
    fn repository_lookup_uses_ref_containment() {
        let flow = Dataflow::new(
            ResourceRef::parse("ECB,EXR,1.0").expect("must parse"),
            ResourceRef::parse("ECB,ECB_EXR1,1.0").expect("must parse"),
            "Exchange rates".to_owned(),
        );
        let repository = DataRepository::builder("test").flow(flow).build();

        let wildcard = ResourceRef::parse("EXR").expect("must parse");
        assert!(repository.flow(&wildcard).is_some());
        let other = ResourceRef::parse("ICP").expect("must parse");
        assert!(repository.flow(&other).is_none());
    }

    #[test]
    fn refinement_copies_instead_of_mutating() {
        let original = DataRepository::builder("snapshot").build();
        let refined = original
            .to_builder()
            .data_set(sample_set())
            .build();

        assert!(original.data_sets.is_empty());
        assert_eq!(refined.data_sets.len(), 1);
        assert_eq!(refined.name, original.name);
    }
}
