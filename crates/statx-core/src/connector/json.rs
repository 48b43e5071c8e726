//! The two SDMX-JSON message layouts understood by the built-in dialects.
//!
//! The current family wraps every payload in a `data` object; the legacy
//! DotStat family serves the same payloads at the top level. Both share the
//! inner shapes, so decoding is implemented once over the payload structs
//! and the two [`ResponseParser`] impls differ only in the wrapper.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::connector::ResponseParser;
use crate::error::DecodeError;
use crate::key::Key;
use crate::language::LangPriority;
use crate::refs::ResourceRef;
use crate::repository::{
    Attribute, Codelist, DataSet, DataStructure, Dataflow, Dimension, Obs, Series,
};
use crate::temporal::TimeInterval;
use crate::transport::media;

/// Parser for the current SDMX-JSON layout (`data`-wrapped payloads).
#[derive(Debug, Default, Clone, Copy)]
pub struct SdmxJsonParser;

/// Parser for the legacy DotStat layout (top-level payloads).
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyJsonParser;

const MODERN_MEDIA_TYPES: [&str; 2] = [media::SDMX_JSON, media::JSON];
const LEGACY_MEDIA_TYPES: [&str; 1] = [media::JSON];

impl ResponseParser for SdmxJsonParser {
    fn accepted_media_types(&self) -> &[&'static str] {
        &MODERN_MEDIA_TYPES
    }

    fn parse_flows(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Vec<Dataflow>, DecodeError> {
        let message: Wrapped<FlowsPayload> = serde_json::from_slice(body)?;
        decode_flows(message.data, languages)
    }

    fn parse_flow(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<Dataflow>, DecodeError> {
        Ok(self.parse_flows(body, languages)?.into_iter().next())
    }

    fn parse_structure(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<DataStructure>, DecodeError> {
        let message: Wrapped<StructuresPayload> = serde_json::from_slice(body)?;
        decode_structure(message.data, languages)
    }

    fn parse_data(&self, body: &[u8], languages: &LangPriority) -> Result<DataSet, DecodeError> {
        let message: Wrapped<DataPayload> = serde_json::from_slice(body)?;
        decode_data(message.data, languages)
    }

    fn parse_codelist(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<Codelist>, DecodeError> {
        let message: Wrapped<StructuresPayload> = serde_json::from_slice(body)?;
        decode_codelist(message.data, languages)
    }
}

impl ResponseParser for LegacyJsonParser {
    fn accepted_media_types(&self) -> &[&'static str] {
        &LEGACY_MEDIA_TYPES
    }

    fn parse_flows(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Vec<Dataflow>, DecodeError> {
        let payload: FlowsPayload = serde_json::from_slice(body)?;
        decode_flows(payload, languages)
    }

    fn parse_flow(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<Dataflow>, DecodeError> {
        Ok(self.parse_flows(body, languages)?.into_iter().next())
    }

    fn parse_structure(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<DataStructure>, DecodeError> {
        let payload: StructuresPayload = serde_json::from_slice(body)?;
        decode_structure(payload, languages)
    }

    fn parse_data(&self, body: &[u8], languages: &LangPriority) -> Result<DataSet, DecodeError> {
        let payload: DataPayload = serde_json::from_slice(body)?;
        decode_data(payload, languages)
    }

    fn parse_codelist(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<Codelist>, DecodeError> {
        let payload: StructuresPayload = serde_json::from_slice(body)?;
        decode_codelist(payload, languages)
    }
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct FlowsPayload {
    #[serde(default)]
    dataflows: Vec<RawDataflow>,
}

#[derive(Debug, Default, Deserialize)]
struct StructuresPayload {
    #[serde(default, rename = "dataStructures")]
    data_structures: Vec<RawDataStructure>,
    #[serde(default)]
    codelists: Vec<RawCodelist>,
}

#[derive(Debug, Deserialize)]
struct RawDataflow {
    id: String,
    #[serde(rename = "agencyID")]
    agency: Option<String>,
    version: Option<String>,
    #[serde(flatten)]
    text: LocalizedText,
    structure: Option<RawRef>,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    id: String,
    #[serde(rename = "agencyID")]
    agency: Option<String>,
    version: Option<String>,
}

impl RawRef {
    fn to_ref(&self) -> Result<ResourceRef, DecodeError> {
        ResourceRef::new(self.agency.as_deref(), &self.id, self.version.as_deref())
            .map_err(|error| DecodeError::new(error.to_string()))
    }
}

/// `name`/`names` pair carried by most artefacts; `names` wins when a
/// preferred language matches.
#[derive(Debug, Default, Deserialize)]
struct LocalizedText {
    name: Option<String>,
    #[serde(default)]
    names: BTreeMap<String, String>,
}

impl LocalizedText {
    fn resolve(&self, languages: &LangPriority) -> String {
        if !self.names.is_empty() {
            if let Some(text) = languages.select(&self.names) {
                return text.to_owned();
            }
        }
        self.name.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct RawDataStructure {
    id: String,
    #[serde(rename = "agencyID")]
    agency: Option<String>,
    version: Option<String>,
    #[serde(flatten)]
    text: LocalizedText,
    #[serde(rename = "dataStructureComponents")]
    components: RawComponents,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(rename = "dimensionList")]
    dimension_list: RawDimensionList,
    #[serde(default, rename = "attributeList")]
    attribute_list: RawAttributeList,
    #[serde(default, rename = "measureList")]
    measure_list: RawMeasureList,
}

#[derive(Debug, Default, Deserialize)]
struct RawDimensionList {
    #[serde(default)]
    dimensions: Vec<RawDimension>,
    #[serde(default, rename = "timeDimensions")]
    time_dimensions: Vec<RawComponentId>,
}

#[derive(Debug, Deserialize)]
struct RawDimension {
    id: String,
    position: Option<usize>,
    #[serde(flatten)]
    text: LocalizedText,
    #[serde(rename = "localRepresentation")]
    local_representation: Option<RawLocalRepresentation>,
}

#[derive(Debug, Deserialize)]
struct RawLocalRepresentation {
    enumeration: Option<RawRef>,
}

#[derive(Debug, Deserialize)]
struct RawComponentId {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttributeList {
    #[serde(default)]
    attributes: Vec<RawNamedComponent>,
}

#[derive(Debug, Deserialize)]
struct RawNamedComponent {
    id: String,
    #[serde(flatten)]
    text: LocalizedText,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeasureList {
    #[serde(rename = "primaryMeasure")]
    primary_measure: Option<RawComponentId>,
}

#[derive(Debug, Deserialize)]
struct RawCodelist {
    id: String,
    #[serde(rename = "agencyID")]
    agency: Option<String>,
    version: Option<String>,
    #[serde(default)]
    codes: Vec<RawNamedComponent>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPayload {
    structure: Option<RawDataStructureInfo>,
    #[serde(default, rename = "dataSets")]
    data_sets: Vec<RawDataSet>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDataStructureInfo {
    #[serde(default, rename = "dataflowRef")]
    dataflow_ref: Option<RawRef>,
    #[serde(default)]
    dimensions: RawDimensionValues,
    #[serde(default)]
    attributes: RawAttributeValues,
}

#[derive(Debug, Default, Deserialize)]
struct RawDimensionValues {
    #[serde(default)]
    series: Vec<RawComponentValues>,
    #[serde(default)]
    observation: Vec<RawComponentValues>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttributeValues {
    #[serde(default)]
    series: Vec<RawComponentValues>,
}

#[derive(Debug, Deserialize)]
struct RawComponentValues {
    id: String,
    #[serde(default)]
    values: Vec<RawComponentValue>,
}

#[derive(Debug, Deserialize)]
struct RawComponentValue {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDataSet {
    #[serde(default)]
    series: BTreeMap<String, RawSeries>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    attributes: Vec<Option<usize>>,
    #[serde(default)]
    observations: BTreeMap<String, Vec<serde_json::Value>>,
}

fn decode_flows(
    payload: FlowsPayload,
    languages: &LangPriority,
) -> Result<Vec<Dataflow>, DecodeError> {
    payload
        .dataflows
        .into_iter()
        .map(|raw| {
            let ref_ = ResourceRef::new(raw.agency.as_deref(), &raw.id, raw.version.as_deref())
                .map_err(|error| DecodeError::new(error.to_string()))?;
            let structure_ref = match &raw.structure {
                Some(structure) => structure.to_ref()?,
                // Self-describing flows reference a structure of the same id.
                None => ref_.clone(),
            };
            Ok(Dataflow::new(ref_, structure_ref, raw.text.resolve(languages)))
        })
        .collect()
}

fn decode_structure(
    payload: StructuresPayload,
    languages: &LangPriority,
) -> Result<Option<DataStructure>, DecodeError> {
    let Some(raw) = payload.data_structures.into_iter().next() else {
        return Ok(None);
    };

    let codelists = payload
        .codelists
        .iter()
        .map(|codelist| {
            let ref_ = ResourceRef::new(
                codelist.agency.as_deref(),
                &codelist.id,
                codelist.version.as_deref(),
            )
            .map_err(|error| DecodeError::new(error.to_string()))?;
            Ok((ref_, codelist))
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    let mut dimensions = Vec::with_capacity(raw.components.dimension_list.dimensions.len());
    for (fallback_position, dimension) in
        raw.components.dimension_list.dimensions.iter().enumerate()
    {
        let codes = dimension
            .local_representation
            .as_ref()
            .and_then(|representation| representation.enumeration.as_ref())
            .and_then(|enumeration| {
                let wanted = enumeration.to_ref().ok()?;
                codelists
                    .iter()
                    .find(|(candidate, _)| wanted.contains(candidate))
                    .map(|(_, codelist)| codelist)
            })
            .map(|codelist| {
                codelist
                    .codes
                    .iter()
                    .map(|code| (code.id.clone(), code.text.resolve(languages)))
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();

        dimensions.push(Dimension {
            id: dimension.id.clone(),
            position: dimension.position.unwrap_or(fallback_position),
            name: dimension.text.resolve(languages),
            codes,
        });
    }
    dimensions.sort_by_key(|dimension| dimension.position);

    let attributes = raw
        .components
        .attribute_list
        .attributes
        .iter()
        .map(|attribute| Attribute {
            id: attribute.id.clone(),
            name: attribute.text.resolve(languages),
        })
        .collect();

    Ok(Some(DataStructure {
        ref_: ResourceRef::new(raw.agency.as_deref(), &raw.id, raw.version.as_deref())
            .map_err(|error| DecodeError::new(error.to_string()))?,
        name: raw.text.resolve(languages),
        time_dimension_id: raw
            .components
            .dimension_list
            .time_dimensions
            .first()
            .map_or_else(|| String::from("TIME_PERIOD"), |dim| dim.id.clone()),
        primary_measure_id: raw
            .components
            .measure_list
            .primary_measure
            .as_ref()
            .map_or_else(|| String::from("OBS_VALUE"), |measure| measure.id.clone()),
        dimensions,
        attributes,
    }))
}

fn decode_codelist(
    payload: StructuresPayload,
    languages: &LangPriority,
) -> Result<Option<Codelist>, DecodeError> {
    let Some(raw) = payload.codelists.into_iter().next() else {
        return Ok(None);
    };

    Ok(Some(Codelist {
        ref_: ResourceRef::new(raw.agency.as_deref(), &raw.id, raw.version.as_deref())
            .map_err(|error| DecodeError::new(error.to_string()))?,
        codes: raw
            .codes
            .iter()
            .map(|code| (code.id.clone(), code.text.resolve(languages)))
            .collect(),
    }))
}

fn decode_data(payload: DataPayload, languages: &LangPriority) -> Result<DataSet, DecodeError> {
    let _ = languages;
    let structure = payload
        .structure
        .ok_or_else(|| DecodeError::new("data message carries no structure section"))?;

    let flow_ref = match &structure.dataflow_ref {
        Some(raw) => raw.to_ref()?,
        None => ResourceRef::new(None, "DATA", None)
            .map_err(|error| DecodeError::new(error.to_string()))?,
    };

    let time_values = structure
        .dimensions
        .observation
        .first()
        .map(|component| component.values.as_slice())
        .unwrap_or_default();

    let mut series = Vec::new();
    for data_set in &payload.data_sets {
        for (series_key, raw_series) in &data_set.series {
            series.push(decode_series(
                series_key,
                raw_series,
                &structure,
                time_values,
            )?);
        }
    }

    Ok(DataSet::new(flow_ref, Key::all(), series))
}

fn decode_series(
    series_key: &str,
    raw: &RawSeries,
    structure: &RawDataStructureInfo,
    time_values: &[RawComponentValue],
) -> Result<Series, DecodeError> {
    let dimensions = &structure.dimensions.series;
    let mut codes = Vec::with_capacity(dimensions.len());
    for (position, index_text) in series_key.split(':').enumerate() {
        let index = index_text
            .parse::<usize>()
            .map_err(|_| DecodeError::new(format!("malformed series key '{series_key}'")))?;
        let component = dimensions.get(position).ok_or_else(|| {
            DecodeError::new(format!(
                "series key '{series_key}' has more positions than declared dimensions"
            ))
        })?;
        let value = component.values.get(index).ok_or_else(|| {
            DecodeError::new(format!(
                "series key '{series_key}' points outside dimension '{}'",
                component.id
            ))
        })?;
        codes.push(value.id.clone().unwrap_or_default());
    }

    let mut meta = BTreeMap::new();
    for (position, value_index) in raw.attributes.iter().enumerate() {
        let Some(value_index) = value_index else {
            continue;
        };
        let Some(attribute) = structure.attributes.series.get(position) else {
            continue;
        };
        if let Some(value) = attribute.values.get(*value_index) {
            meta.insert(
                attribute.id.clone(),
                value.id.clone().unwrap_or_default(),
            );
        }
    }

    // Observation keys index the time value list; numeric order is wire
    // order, which lexicographic map order is not.
    let mut indexed = raw
        .observations
        .iter()
        .map(|(index_text, values)| {
            index_text
                .parse::<usize>()
                .map_err(|_| DecodeError::new(format!("malformed observation key '{index_text}'")))
                .map(|index| (index, values))
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;
    indexed.sort_by_key(|(index, _)| *index);

    let mut obs = Vec::with_capacity(indexed.len());
    for (index, values) in indexed {
        let period_id = time_values
            .get(index)
            .and_then(|value| value.id.as_deref())
            .ok_or_else(|| {
                DecodeError::new(format!("observation index {index} outside the time dimension"))
            })?;
        obs.push(Obs::new(
            period_to_interval(period_id)?,
            decode_obs_value(values.first()),
        ));
    }

    Ok(Series::new(Key::of(codes), meta, obs))
}

/// Decodes a whole-table data message into a data set plus a structure
/// synthesized from the message's own dimension section. Whole-table
/// dialects have no separate structure endpoint, so the table is the only
/// source of dimensional truth.
pub(crate) fn decode_table(
    body: &[u8],
    languages: &LangPriority,
) -> Result<(DataStructure, DataSet), DecodeError> {
    let payload: DataPayload = serde_json::from_slice(body)?;

    let structure_info = payload
        .structure
        .as_ref()
        .ok_or_else(|| DecodeError::new("table message carries no structure section"))?;

    let dimensions = structure_info
        .dimensions
        .series
        .iter()
        .enumerate()
        .map(|(position, component)| Dimension {
            id: component.id.clone(),
            position,
            name: component.id.clone(),
            codes: component
                .values
                .iter()
                .filter_map(|value| value.id.clone())
                .map(|id| (id.clone(), id))
                .collect(),
        })
        .collect::<Vec<_>>();

    let structure_ref = match &structure_info.dataflow_ref {
        Some(raw) => raw.to_ref()?,
        None => ResourceRef::new(None, "TABLE", None)
            .map_err(|error| DecodeError::new(error.to_string()))?,
    };

    let structure = DataStructure {
        ref_: structure_ref,
        name: String::new(),
        time_dimension_id: structure_info
            .dimensions
            .observation
            .first()
            .map_or_else(|| String::from("TIME_PERIOD"), |dim| dim.id.clone()),
        primary_measure_id: String::from("OBS_VALUE"),
        dimensions,
        attributes: structure_info
            .attributes
            .series
            .iter()
            .map(|attribute| Attribute {
                id: attribute.id.clone(),
                name: attribute.id.clone(),
            })
            .collect(),
    };

    let data_set = decode_data(payload, languages)?;
    Ok((structure, data_set))
}

fn decode_obs_value(value: Option<&serde_json::Value>) -> Option<f64> {
    match value {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(text)) => text.parse().ok(),
        _ => None,
    }
}

/// Maps an SDMX reporting period id onto a dated interval, inferring the
/// duration from the period's precision: `2010` is a year, `2010-05` a
/// month, `2010-Q2`/`2010-S1` the usual multi-month spans, and date/time
/// forms carry day/hour/minute/second durations.
pub(crate) fn period_to_interval(period: &str) -> Result<TimeInterval, DecodeError> {
    let malformed = || DecodeError::new(format!("unrecognized observation period '{period}'"));

    if let Some((year, tail)) = period.split_at_checked(4) {
        if let Some(quarter) = tail.strip_prefix("-Q") {
            let quarter: u8 = quarter.parse().map_err(|_| malformed())?;
            if !(1..=4).contains(&quarter) {
                return Err(malformed());
            }
            let month = (quarter - 1) * 3 + 1;
            return TimeInterval::parse(&format!("{year}-{month:02}/P3M"))
                .map_err(|_| malformed());
        }
        if let Some(semester) = tail.strip_prefix("-S") {
            let semester: u8 = semester.parse().map_err(|_| malformed())?;
            if !(1..=2).contains(&semester) {
                return Err(malformed());
            }
            let month = (semester - 1) * 6 + 1;
            return TimeInterval::parse(&format!("{year}-{month:02}/P6M"))
                .map_err(|_| malformed());
        }
    }

    let duration = match period.split_once('T') {
        None => match period.split('-').count() {
            1 => "P1Y",
            2 => "P1M",
            3 => "P1D",
            _ => return Err(malformed()),
        },
        Some((_, time)) => match time.split(':').count() {
            1 => "PT1H",
            2 => "PT1M",
            3 => "PT1S",
            _ => return Err(malformed()),
        },
    };

    TimeInterval::parse(&format!("{period}/{duration}")).map_err(|_| malformed())
}
