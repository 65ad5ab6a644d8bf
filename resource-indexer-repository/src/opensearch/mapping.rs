//! Mapping builder for resource indices.
//!
//! Turns a dynamic per-resource `Schema` into OpenSearch field definitions.
//! Columns are stored under `col<N>` keys, each as a `{repr, val}` object,
//! and the `col<N>` to header map is kept in the mapping `_meta` block.

use resource_indexer_shared::{column_alias, Field, FieldType, HeaderAliasMap, Schema};
use serde_json::{json, Map, Value};

/// Key of the header alias map inside the mapping `_meta` block.
pub const META_HEADERS_KEY: &str = "headers";

/// Longest keyword value kept in the keyword sub-fields.
const KEYWORD_IGNORE_ABOVE: u32 = 8191;

/// Catalog-level format patterns and numeric settings for the mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingOptions {
    pub date_formats: Vec<String>,
    pub datetime_formats: Vec<String>,
    pub time_formats: Vec<String>,
    /// Scaling factor of `number` columns.
    pub scaling_factor: f64,
}

impl Default for MappingOptions {
    fn default() -> Self {
        let owned = |formats: &[&str]| formats.iter().map(|f| f.to_string()).collect();
        Self {
            date_formats: owned(&["yyyy-MM-dd", "dd.MM.yyyy", "dd/MM/yyyy", "yyyy.MM.dd"]),
            datetime_formats: owned(&[
                "strict_date_optional_time",
                "yyyy-MM-dd HH:mm:ss",
                "yyyy-MM-dd HH:mm",
                "dd.MM.yyyy HH:mm:ss",
                "dd.MM.yyyy HH:mm",
            ]),
            time_formats: owned(&["HH:mm:ss", "HH:mm"]),
            scaling_factor: 100.0,
        }
    }
}

/// Field definitions for one resource index, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMapping {
    pub fields: Vec<(String, Value)>,
    pub aliases: HeaderAliasMap,
}

impl IndexMapping {
    /// The `mappings` body sent to the search engine.
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self.fields.iter().cloned().collect();
        json!({
            "_meta": {
                META_HEADERS_KEY: self.aliases
            },
            "properties": properties
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, definition)| definition)
    }
}

/// Build the index mapping of a schema.
///
/// The field at position N (1-based) is stored as `col<N>`. Building twice
/// from the same schema yields identical output.
pub fn build_mapping(schema: &Schema, options: &MappingOptions) -> IndexMapping {
    let mut fields = Vec::with_capacity(schema.len() + 7);
    let mut aliases = HeaderAliasMap::new();

    for (index, field) in schema.fields.iter().enumerate() {
        let alias = column_alias(index + 1);
        aliases.insert(alias.clone(), field.name.clone());
        fields.push((alias, column_definition(field, options)));
    }

    if schema.complete_geo().is_some() {
        fields.push(("shape".to_string(), json!({"type": "geo_shape"})));
        fields.push(("point".to_string(), json!({"type": "geo_point"})));
        fields.push(("label".to_string(), text_with_keyword()));
        fields.push(("shape_type".to_string(), json!({"type": "integer"})));
    }

    fields.push((
        "resource".to_string(),
        json!({
            "properties": {
                "id": {"type": "keyword"},
                "title": text_with_keyword()
            }
        }),
    ));
    fields.push(("updated_at".to_string(), json!({"type": "date"})));
    fields.push(("row_no".to_string(), json!({"type": "long"})));

    IndexMapping { fields, aliases }
}

fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "fields": {
            "keyword": {"type": "keyword", "ignore_above": KEYWORD_IGNORE_ABOVE}
        }
    })
}

fn column_definition(field: &Field, options: &MappingOptions) -> Value {
    json!({
        "properties": {
            "repr": {"type": "keyword", "ignore_above": KEYWORD_IGNORE_ABOVE},
            "val": value_definition(field, options)
        }
    })
}

fn value_definition(field: &Field, options: &MappingOptions) -> Value {
    match field.field_type {
        FieldType::String | FieldType::Any => json!({
            "type": "text",
            "fields": {
                "raw": {"type": "text", "analyzer": "whitespace"},
                "keyword": {"type": "keyword", "ignore_above": KEYWORD_IGNORE_ABOVE}
            }
        }),
        FieldType::Integer => json!({"type": "long"}),
        FieldType::Number => json!({
            "type": "scaled_float",
            "scaling_factor": options.scaling_factor
        }),
        FieldType::Boolean => json!({"type": "boolean"}),
        FieldType::Date => temporal_definition("date", &field.format, &options.date_formats),
        FieldType::DateTime => {
            temporal_definition("datetime", &field.format, &options.datetime_formats)
        }
        FieldType::Time => temporal_definition("time", &field.format, &options.time_formats),
    }
}

/// Text field with the literal value plus a parsed date sub-field.
fn temporal_definition(sub_field: &str, field_format: &str, catalog: &[String]) -> Value {
    let mut formats: Vec<String> = Vec::with_capacity(catalog.len() + 1);
    if let Some(own) = strftime_to_java(field_format) {
        formats.push(own);
    }
    for format in catalog {
        if !formats.contains(format) {
            formats.push(format.clone());
        }
    }

    let mut sub_fields = Map::new();
    sub_fields.insert(
        sub_field.to_string(),
        json!({
            "type": "date",
            "format": formats.join("||"),
            "ignore_malformed": true
        }),
    );
    sub_fields.insert(
        "keyword".to_string(),
        json!({"type": "keyword", "ignore_above": KEYWORD_IGNORE_ABOVE}),
    );

    json!({
        "type": "text",
        "fields": sub_fields
    })
}

/// Convert a strftime pattern (`%d.%m.%Y`) into a search-engine date pattern.
///
/// Returns `None` for `default`, `any` and patterns with unsupported directives.
pub fn strftime_to_java(pattern: &str) -> Option<String> {
    if pattern.is_empty() || pattern == "default" || pattern == "any" || !pattern.contains('%') {
        return None;
    }
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            if c.is_ascii_alphabetic() {
                out.push('\'');
                out.push(c);
                out.push('\'');
            } else {
                out.push(c);
            }
            continue;
        }
        let token = match chars.next()? {
            'Y' => "yyyy",
            'y' => "yy",
            'm' => "MM",
            'd' => "dd",
            'H' => "HH",
            'M' => "mm",
            'S' => "ss",
            'f' => "SSSSSS",
            '%' => "%",
            _ => return None,
        };
        out.push_str(token);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_indexer_shared::GeoRole;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Field::new("Nazwa", FieldType::String),
            Field::new("Liczba", FieldType::Integer),
            Field::new("Kwota", FieldType::Number),
            Field::new("Aktywny", FieldType::Boolean),
            Field::new("Data", FieldType::Date).with_format("%d.%m.%Y"),
            Field::new("Uwagi", FieldType::Any),
        ])
    }

    #[test]
    fn test_columns_are_aliased_in_order() {
        let mapping = build_mapping(&sample_schema(), &MappingOptions::default());

        let names: Vec<&str> = mapping.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "col1",
                "col2",
                "col3",
                "col4",
                "col5",
                "col6",
                "resource",
                "updated_at",
                "row_no"
            ]
        );
        assert_eq!(mapping.aliases.header_for("col5"), Some("Data"));
        assert_eq!(mapping.aliases.alias_for("Nazwa"), Some("col1"));
    }

    #[test]
    fn test_value_types() {
        let mapping = build_mapping(&sample_schema(), &MappingOptions::default());
        let val = |name: &str| mapping.field(name).unwrap()["properties"]["val"].clone();

        assert_eq!(val("col1")["type"], "text");
        assert_eq!(val("col1")["fields"]["keyword"]["type"], "keyword");
        assert_eq!(val("col1")["fields"]["raw"]["type"], "text");
        assert_eq!(val("col2")["type"], "long");
        assert_eq!(val("col3")["type"], "scaled_float");
        assert_eq!(val("col3")["scaling_factor"], 100.0);
        assert_eq!(val("col4")["type"], "boolean");
        assert_eq!(val("col5")["type"], "text");
        assert_eq!(val("col5")["fields"]["date"]["type"], "date");
        assert_eq!(val("col6"), val("col1"));

        let repr = &mapping.field("col2").unwrap()["properties"]["repr"];
        assert_eq!(repr["type"], "keyword");
    }

    #[test]
    fn test_field_format_comes_first() {
        let mapping = build_mapping(&sample_schema(), &MappingOptions::default());
        let format = mapping.field("col5").unwrap()["properties"]["val"]["fields"]["date"]["format"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(format.starts_with("dd.MM.yyyy||yyyy-MM-dd"));
        assert_eq!(format.matches("dd.MM.yyyy").count(), 1);
    }

    #[test]
    fn test_geo_fields_only_for_complete_role() {
        let role = GeoRole {
            b: Some("lat".to_string()),
            l: Some("lon".to_string()),
            label: Some("Nazwa".to_string()),
            ..Default::default()
        };
        let schema = sample_schema().with_geo(role.clone());
        let mapping = build_mapping(&schema, &MappingOptions::default());
        assert_eq!(mapping.field("shape").unwrap()["type"], "geo_shape");
        assert_eq!(mapping.field("point").unwrap()["type"], "geo_point");
        assert_eq!(mapping.field("shape_type").unwrap()["type"], "integer");
        assert!(mapping.field("label").is_some());

        let incomplete = GeoRole {
            label: None,
            ..role
        };
        let mapping = build_mapping(
            &sample_schema().with_geo(incomplete),
            &MappingOptions::default(),
        );
        assert!(mapping.field("shape").is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let schema = sample_schema();
        let first = build_mapping(&schema, &MappingOptions::default());
        let second = build_mapping(&schema, &MappingOptions::default());

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.to_json()).unwrap(),
            serde_json::to_string(&second.to_json()).unwrap()
        );
    }

    #[test]
    fn test_meta_carries_headers() {
        let json = build_mapping(&sample_schema(), &MappingOptions::default()).to_json();
        assert_eq!(json["_meta"][META_HEADERS_KEY]["col1"], "Nazwa");
        assert_eq!(json["properties"]["row_no"]["type"], "long");
        assert_eq!(json["properties"]["resource"]["properties"]["id"]["type"], "keyword");
    }

    #[test]
    fn test_strftime_to_java() {
        assert_eq!(strftime_to_java("%Y-%m-%d").as_deref(), Some("yyyy-MM-dd"));
        assert_eq!(strftime_to_java("%d.%m.%Y %H:%M").as_deref(), Some("dd.MM.yyyy HH:mm"));
        assert_eq!(
            strftime_to_java("%Y-%m-%dT%H:%M:%S").as_deref(),
            Some("yyyy-MM-dd'T'HH:mm:ss")
        );
        assert_eq!(strftime_to_java("default"), None);
        assert_eq!(strftime_to_java("%Q"), None);
    }
}
