//! Declarative description of the iris features for an external feature
//! store. Nothing here reads or writes features; these records only describe
//! the schema the store is expected to serve.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
	Int64,
	Float32,
	String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
	pub name: String,
	pub join_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
	pub name: String,
	pub dtype: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigQuerySource {
	pub table: String,
	pub timestamp_field: String,
	/// Type of the entity join key in the source table.
	pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureView {
	pub name: String,
	#[serde(with = "ttl_days")]
	pub ttl: Duration,
	pub online: bool,
	pub entities: Vec<Entity>,
	pub source: BigQuerySource,
	pub schema: Vec<Field>,
}

impl FeatureView {
	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.schema.iter().map(|f| f.name.as_str())
	}

	pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
		toml::to_string_pretty(self)
	}
}

fn field(name: &str, dtype: ValueType) -> Field {
	Field { name: name.to_owned(), dtype }
}

pub fn iris_entity() -> Entity {
	Entity {
		name: "iris_entity".to_owned(),
		join_keys: vec!["iris_entity_id".to_owned()],
	}
}

pub fn iris_feature_view() -> FeatureView {
	FeatureView {
		name: "iris_features".to_owned(),
		ttl: Duration::from_secs(365 * SECONDS_PER_DAY),
		online: true,
		entities: vec![iris_entity()],
		source: BigQuerySource {
			table: "citric-aleph-461515-j9.iris_dataset.iris_table".to_owned(),
			timestamp_field: "event_timestamp".to_owned(),
			value_type: ValueType::Int64,
		},
		schema: vec![
			field("sepal_length", ValueType::Float32),
			field("sepal_width", ValueType::Float32),
			field("petal_length", ValueType::Float32),
			field("petal_width", ValueType::Float32),
			field("species", ValueType::String),
		],
	}
}

mod ttl_days {
	use super::SECONDS_PER_DAY;
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(ttl.as_secs() / SECONDS_PER_DAY)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let days = u64::deserialize(deserializer)?;
		Ok(Duration::from_secs(days * SECONDS_PER_DAY))
	}
}
